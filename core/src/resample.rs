//! Nearest-sample resampling of recorded runs onto a shared time grid.
//!
//! Runs are recorded at irregular times. To compare them cell by cell every
//! run is evaluated at the same target times: each target picks the recorded
//! row whose time is closest and keeps that row's values verbatim, with the
//! time column replaced by the target itself.

use std::{fmt::Display, str::FromStr};

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::common::range::Range;

/// A sample matrix evaluated at target times, one row per target.
pub type ResampledMatrix = Array2<f64>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Cannot resample a run without samples")]
    NoSamples,
    #[error("Time column {column} is out of bounds ({columns} columns)")]
    TimeColumnOutOfBounds { column: usize, columns: usize },
    #[error("Samples are not sorted by time (row {row} goes back in time)")]
    UnsortedTime { row: usize },

    #[error("A time grid needs at least one sample")]
    EmptyGrid,
    #[error("Invalid time range [{min}, {max}] for {samples} samples")]
    InvalidTimeRange { min: f64, max: f64, samples: usize },
    #[error("A logarithmic time grid needs a positive start time, got {min}")]
    NonPositiveLogStart { min: f64 },
}

/// Spacing of the target times.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeScale {
    /// Constant step between neighbouring times.
    #[default]
    Linear,
    /// Constant ratio between neighbouring times.
    Logarithmic,
}

impl FromStr for TimeScale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" | "lin" => Ok(TimeScale::Linear),
            "logarithmic" | "log" => Ok(TimeScale::Logarithmic),
            _ => Err(format!("unknown time scale '{s}', expected linear or logarithmic")),
        }
    }
}

impl Display for TimeScale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeScale::Linear => f.write_str("linear"),
            TimeScale::Logarithmic => f.write_str("logarithmic"),
        }
    }
}

/// Target times shared by every run of an experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeGrid {
    pub scale: TimeScale,
    values: Array1<f64>,
}

impl TimeGrid {
    pub fn new(scale: TimeScale, range: Range<f64>, samples: usize) -> Result<Self, Error> {
        let Range { min, max } = range;
        if samples == 0 {
            return Err(Error::EmptyGrid);
        }
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(Error::InvalidTimeRange { min, max, samples });
        }

        let last = samples - 1;
        let values = match scale {
            TimeScale::Linear => {
                let step = if last > 0 { range.width() / last as f64 } else { 0.0 };
                Array1::from_shape_fn(samples, |i| {
                    if i == last && last > 0 {
                        max
                    } else {
                        min + step * i as f64
                    }
                })
            }
            TimeScale::Logarithmic => {
                if min <= 0.0 {
                    return Err(Error::NonPositiveLogStart { min });
                }
                let (log_min, log_max) = (min.ln(), max.ln());
                let step = if last > 0 {
                    (log_max - log_min) / last as f64
                } else {
                    0.0
                };
                Array1::from_shape_fn(samples, |i| match i {
                    0 => min,
                    i if i == last => max,
                    i => (log_min + step * i as f64).exp(),
                })
            }
        };

        Ok(Self { scale, values })
    }

    pub fn linear(min: f64, max: f64, samples: usize) -> Result<Self, Error> {
        Self::new(TimeScale::Linear, Range::new(min, max), samples)
    }

    pub fn logarithmic(min: f64, max: f64, samples: usize) -> Result<Self, Error> {
        Self::new(TimeScale::Logarithmic, Range::new(min, max), samples)
    }

    pub fn values(&self) -> ArrayView1<'_, f64> {
        self.values.view()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Array1<f64> {
        self.values
    }
}

/// The span from the earliest first sample to the latest last sample.
///
/// `None` if there are no matrices or none of them has samples.
pub fn time_range<'a>(
    matrices: impl IntoIterator<Item = ArrayView2<'a, f64>>,
    time_column: usize,
) -> Option<Range<f64>> {
    Range::from_iter_range(matrices.into_iter().filter_map(|m| {
        let times = m.column(time_column);
        let first = *times.first()?;
        let last = *times.last()?;
        Some(Range::new(first, last))
    }))
}

/// Checks that `matrix` can be searched by time in `time_column`.
pub fn check_sorted(matrix: ArrayView2<f64>, time_column: usize) -> Result<(), Error> {
    if time_column >= matrix.ncols() {
        return Err(Error::TimeColumnOutOfBounds {
            column: time_column,
            columns: matrix.ncols(),
        });
    }
    if matrix.nrows() == 0 {
        return Err(Error::NoSamples);
    }
    let times = matrix.column(time_column);
    match times
        .iter()
        .zip(times.iter().skip(1))
        .position(|(a, b)| b < a)
    {
        Some(i) => Err(Error::UnsortedTime { row: i + 1 }),
        None => Ok(()),
    }
}

/// Index of the time closest to `target` in ascending `times`.
///
/// Narrows `lo..hi` by halves that overlap in the pivot row until at most
/// three candidates remain; among those the first minimum distance wins.
pub fn closest_index(times: ArrayView1<f64>, target: f64) -> Option<usize> {
    let (mut lo, mut hi) = (0, times.len());
    if hi == 0 {
        return None;
    }

    while hi - lo > 3 {
        let half = (hi - lo) / 2;
        if times[lo + half] < target {
            lo = hi - half - 1;
        } else {
            hi = lo + half + 1;
        }
    }

    let mut best = lo;
    let mut best_distance = (times[lo] - target).abs();
    for i in lo + 1..hi {
        let distance = (times[i] - target).abs();
        if distance < best_distance {
            best = i;
            best_distance = distance;
        }
    }
    Some(best)
}

/// The row of `matrix` closest in time to `target`, with its time replaced
/// by `target`.
///
/// `None` if the matrix is empty or has no `time_column`.
pub fn closest_row(matrix: ArrayView2<f64>, time_column: usize, target: f64) -> Option<Array1<f64>> {
    if time_column >= matrix.ncols() {
        return None;
    }
    let idx = closest_index(matrix.column(time_column), target)?;
    let mut row = matrix.row(idx).to_owned();
    row[time_column] = target;
    Some(row)
}

/// Evaluates `matrix` at every target time, keeping the targets' order.
pub fn convert(
    time_column: usize,
    targets: ArrayView1<f64>,
    matrix: ArrayView2<f64>,
) -> Result<ResampledMatrix, Error> {
    check_sorted(matrix, time_column)?;

    let times = matrix.column(time_column);
    let mut resampled = Array2::zeros((targets.len(), matrix.ncols()));
    for (mut row, &target) in resampled.rows_mut().into_iter().zip(targets.iter()) {
        let idx = closest_index(times, target).ok_or(Error::NoSamples)?;
        row.assign(&matrix.row(idx));
        row[time_column] = target;
    }
    Ok(resampled)
}
