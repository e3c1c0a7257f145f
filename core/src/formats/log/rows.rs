use ndarray::Array2;

use super::{header::begins_with_digit, Error};
use crate::formats::util::InputLocator;

/// Recorded samples of one run: one row per time point, one column per
/// logged variable.
pub type SampleMatrix = Array2<f64>;

/// Parses every data row of a log into a rectangular matrix.
///
/// Lines that don't start with a digit are header lines and are skipped.
pub fn extract_rows(text: &str) -> Result<SampleMatrix, Error> {
    let locator = InputLocator::new(text);

    let mut values = Vec::new();
    let mut width = None;
    let mut rows = 0;

    for (i, line) in text.lines().enumerate() {
        if !begins_with_digit(line) {
            continue;
        }
        let line_number = i + 1;

        let mut found = 0;
        for (column, token) in line.split_ascii_whitespace().enumerate() {
            let value = token.parse::<f64>().map_err(|err| Error::BadNumber {
                token: token.to_string(),
                line: line_number,
                column,
                span: locator.span_from_substr(token),
                err,
            })?;
            values.push(value);
            found += 1;
        }

        let expected = *width.get_or_insert(found);
        if found != expected {
            return Err(Error::WrongValueCount {
                line: line_number,
                found,
                expected,
                span: locator.span_from_substr(line),
            });
        }
        rows += 1;
    }

    Ok(Array2::from_shape_vec((rows, width.unwrap_or(0)), values)?)
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn basic_parsing() {
        let matrix = extract_rows(
            "# time value\n0 1.2E+3\n5 -2.3e-2\n\n10   4.1E-12\n# trailing comment\n",
        )
        .unwrap();
        assert_eq!(matrix, array![[0.0, 1.2e3], [5.0, -2.3e-2], [10.0, 4.1e-12]]);
    }

    #[test]
    fn header_only() {
        let matrix = extract_rows("# time value\n").unwrap();
        assert_eq!(matrix.nrows(), 0);
    }

    #[test]
    fn invalid_number() {
        let text = "# time value\n0 1\n1 one\n";
        match extract_rows(text) {
            Err(Error::BadNumber {
                token,
                line,
                column,
                span,
                ..
            }) => {
                assert_eq!(token, "one");
                assert_eq!(line, 3);
                assert_eq!(column, 1);
                assert_eq!(&text[span.offset()..span.offset() + span.len()], "one");
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn ragged_rows() {
        match extract_rows("0 1 2\n1 2\n") {
            Err(Error::WrongValueCount {
                line,
                found,
                expected,
                ..
            }) => {
                assert_eq!((line, found, expected), (2, 2, 3));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }
}
