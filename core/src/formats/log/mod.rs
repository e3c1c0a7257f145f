//! Simulator log files: a textual header followed by whitespace separated
//! numeric rows.

mod err;
pub mod header;
pub mod rows;

use std::io::Read;

use serde::{Deserialize, Serialize};
use tracing::instrument;

pub use err::Error;
pub use header::{extract_coordinates, extract_variable_names};
pub use rows::{extract_rows, SampleMatrix};

use crate::common::coord::Coordinates;

/// Everything read from a single log file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogFile {
    /// The independent variables of this run.
    pub coordinates: Coordinates,
    /// Column names, in column order of `samples`.
    pub column_names: Vec<String>,
    pub samples: SampleMatrix,
}

impl LogFile {
    #[instrument(skip(rdr))]
    pub fn from_reader(mut rdr: impl Read) -> Result<Self, Error> {
        let mut text = String::new();
        rdr.read_to_string(&mut text)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, Error> {
        Ok(Self {
            coordinates: extract_coordinates(text),
            column_names: extract_variable_names(text),
            samples: extract_rows(text)?,
        })
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.column_names.iter().position(|x| x == name)
    }
}
