use std::num::ParseFloatError;

use miette::{Diagnostic, SourceSpan};
use ndarray::ShapeError;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Invalid number '{token}' (line {line}, column {column}): {err}")]
    #[diagnostic(code(simlog::log::bad_number))]
    BadNumber {
        token: String,
        line: usize,
        column: usize,
        #[label("not a number")]
        span: SourceSpan,
        #[source]
        err: ParseFloatError,
    },

    #[error("Wrong number of values (line {line}: {found} values, expected {expected})")]
    #[diagnostic(
        code(simlog::log::wrong_value_count),
        help("every data row must have as many values as the first one")
    )]
    WrongValueCount {
        line: usize,
        found: usize,
        expected: usize,
        #[label("this row")]
        span: SourceSpan,
    },

    #[error("Assembling the sample matrix resulted in shape error: {0}")]
    #[diagnostic(code(simlog::log::shape))]
    Shape(#[from] ShapeError),

    #[error("I/O error: {0}")]
    #[diagnostic(code(simlog::log::io))]
    Io(#[from] std::io::Error),
}
