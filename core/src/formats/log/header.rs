//! The textual header of a simulator log.
//!
//! A log starts with free-form lines. Some of them carry the independent
//! variables of the run as ` name = value` assignments, and the last one
//! before the data names the columns:
//!
//! ```text
//! # Algorithm = ff_linpro, HumansCamerasRatio = 0.5, Seed = 3.0
//! #
//! # time 1-coverage 2-coverage 3-coverage
//! 0 0.0 0.0 0.0
//! ```

use winnow::{
    branch::alt,
    bytes::{one_of, tag, take_while0, take_while1},
    character::{digit0, digit1},
    combinator::opt,
    IResult, Parser,
};

use crate::common::coord::{CoordValue, Coordinates};

/// Whether `line` is a data row rather than part of the header.
pub fn begins_with_digit(line: &str) -> bool {
    line.chars().next().is_some_and(|c| c.is_ascii_digit())
}

fn identifier(i: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphabetic()).parse_next(i)
}

fn float_literal(i: &str) -> IResult<&str, &str> {
    (
        opt(one_of("+-")),
        alt(((digit0, tag("."), digit1).recognize(), digit1)),
        opt((one_of("eE"), opt(one_of("+-")), digit1)),
    )
        .recognize()
        .parse_next(i)
}

fn bare_word(i: &str) -> IResult<&str, &str> {
    take_while0(|c: char| c.is_ascii_alphabetic() || c == '_' || c == '-').parse_next(i)
}

/// ` name = value`, where the value may be empty.
fn assignment(i: &str) -> IResult<&str, (&str, &str)> {
    (tag(" "), identifier, tag(" = "), alt((float_literal, bare_word)))
        .map(|(_, name, _, value)| (name, value))
        .parse_next(i)
}

/// Every non-overlapping assignment in `line`, left to right.
pub fn assignments(line: &str) -> Vec<(&str, &str)> {
    let mut found = Vec::new();
    let mut rest = line;
    while !rest.is_empty() {
        match assignment(rest) {
            Ok((remaining, pair)) => {
                found.push(pair);
                rest = remaining;
            }
            Err(_) => {
                let mut chars = rest.chars();
                chars.next();
                rest = chars.as_str();
            }
        }
    }
    found
}

/// Reads the coordinates of a run from the first header line that has any.
///
/// Scanning stops at the first data row: a log without assignments before
/// its data yields no coordinates at all.
pub fn extract_coordinates(text: &str) -> Coordinates {
    for line in text.lines() {
        let found = assignments(line);
        if !found.is_empty() {
            return found
                .into_iter()
                .map(|(name, value)| (name.to_string(), CoordValue::coerce(value)))
                .collect();
        }
        if begins_with_digit(line) {
            break;
        }
    }
    Coordinates::new()
}

/// Splits the column header line into names.
///
/// Only tokens preceded by a space count, which drops a leading comment
/// marker such as `#`.
fn column_tokens(line: &str) -> Vec<String> {
    line.split(' ')
        .skip(1)
        .filter_map(|piece| {
            let token = piece.split(char::is_whitespace).next().unwrap_or_default();
            (!token.is_empty()).then(|| token.to_string())
        })
        .collect()
}

/// Reads the column names from the last header line before the data.
pub fn extract_variable_names(text: &str) -> Vec<String> {
    let mut last_header_line = None;
    for line in text.lines() {
        if begins_with_digit(line) {
            break;
        }
        last_header_line = Some(line);
    }
    last_header_line.map(column_tokens).unwrap_or_default()
}
