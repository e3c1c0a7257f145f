// #![warn(clippy::pedantic)]
// #![warn(clippy::nursery)]
// #![warn(clippy::cargo)]
#![warn(clippy::complexity)]
#![warn(clippy::correctness)]
#![warn(clippy::perf)]
#![warn(clippy::style)]
#![warn(clippy::suspicious)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
// #![warn(clippy::unwrap_used)]
// #![warn(clippy::expect_used)]

pub mod common;
pub mod dataset;
pub mod experiment;
pub mod file;
pub mod formats;
pub mod resample;

pub use common::coord::{CoordValue, Coordinates, Dimensions};
pub use dataset::{Coordinate, Dataset, Experiments, Reduction, Variable};
pub use experiment::{AssemblyOptions, Experiment};
pub use file::{FileSystem, OsFs};
pub use formats::log::LogFile;
pub use resample::{TimeGrid, TimeScale};
