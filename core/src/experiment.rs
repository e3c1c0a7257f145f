//! Turns all log files of one experiment into a single [`Dataset`].

use std::{borrow::Borrow, collections::HashSet, fmt::Debug};

use derive_more::Constructor;
use futures::future::join_all;
use glob::Pattern;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    common::{
        coord::{fold_coordinates, CoordValue, Dimensions},
        range::Range,
    },
    dataset::{self, Coordinate, Dataset, Experiments},
    file::FileSystem,
    formats::log::{self, LogFile},
    resample::{self, check_sorted, convert, time_range, TimeGrid, TimeScale},
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No input files for experiment '{experiment}' (looked for {pattern})")]
    NoInputFiles { experiment: String, pattern: String },
    #[error("Experiment name '{experiment}' is not usable as a file pattern: {source}")]
    Pattern {
        experiment: String,
        #[source]
        source: glob::PatternError,
    },
    #[error("Failed to access {file} of experiment '{experiment}': {source}")]
    Fs {
        experiment: String,
        file: String,
        #[source]
        source: BoxError,
    },
    #[error("Failed to parse {file} of experiment '{experiment}': {source}")]
    Parse {
        experiment: String,
        file: String,
        #[source]
        source: log::Error,
    },
    #[error("Time column '{column}' not found in {file} of experiment '{experiment}' (columns: {found:?})")]
    MissingTimeColumn {
        experiment: String,
        file: String,
        column: String,
        found: Vec<String>,
    },
    #[error("{file} of experiment '{experiment}' has {columns} columns, but {names} column names")]
    ColumnMismatch {
        experiment: String,
        file: String,
        names: usize,
        columns: usize,
    },
    #[error("Cannot resample {file} of experiment '{experiment}': {source}")]
    Resample {
        experiment: String,
        file: String,
        #[source]
        source: resample::Error,
    },
    #[error("Invalid time grid for experiment '{experiment}': {source}")]
    TimeGrid {
        experiment: String,
        #[source]
        source: resample::Error,
    },
    #[error("{file} of experiment '{experiment}' does not set coordinate '{name}'")]
    MissingCoordinate {
        experiment: String,
        file: String,
        name: String,
    },
    #[error("{file} of experiment '{experiment}' sets '{name}' to {value}, which is not on the axis")]
    Placement {
        experiment: String,
        file: String,
        name: String,
        value: CoordValue,
    },
    #[error("Failed to build dataset for experiment '{experiment}': {source}")]
    Dataset {
        experiment: String,
        #[source]
        source: dataset::Error,
    },
}

/// Settings shared by every experiment of one processing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyOptions {
    pub time_column: String,
    /// Number of points on the common time axis.
    pub samples: usize,
    /// Falls back to the earliest first sample of the experiment.
    pub min_time: Option<f64>,
    /// Falls back to the latest last sample of the experiment.
    pub max_time: Option<f64>,
    pub scale: TimeScale,
    /// Reject files that don't set every coordinate another file sets.
    /// Otherwise such a file is written across the whole axis.
    pub strict_headers: bool,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            time_column: "time".to_string(),
            samples: 2000,
            min_time: None,
            max_time: None,
            scale: TimeScale::Linear,
            strict_headers: true,
        }
    }
}

/// One parsed log file.
#[derive(Debug, Clone, Constructor)]
pub struct Run<P> {
    pub path: P,
    pub log: LogFile,
}

/// All runs sharing an experiment name, ordered by path.
#[derive(Debug, Clone)]
pub struct Experiment<P> {
    pub name: String,
    pub runs: Vec<Run<P>>,
}

fn file_pattern(name: &str) -> String {
    format!("{}_*.txt", Pattern::escape(name))
}

impl<P: Debug + Ord> Experiment<P> {
    pub fn new(name: impl Into<String>, mut runs: Vec<Run<P>>) -> Self {
        runs.sort_by(|a, b| a.path.cmp(&b.path));
        Self {
            name: name.into(),
            runs,
        }
    }

    /// Paths of the files named `<name>_*.txt` in `directory`, sorted.
    pub async fn discover<Fs: FileSystem<Path = P>>(
        fs: &Fs,
        directory: &Fs::PathRef,
        name: &str,
    ) -> Result<Vec<P>, Error> {
        let pattern = file_pattern(name);
        let matcher = Pattern::new(&pattern).map_err(|source| Error::Pattern {
            experiment: name.to_string(),
            source,
        })?;

        let entries = fs.list(directory).await.map_err(|e| Error::Fs {
            experiment: name.to_string(),
            file: format!("{directory:?}"),
            source: Box::new(e),
        })?;

        let mut paths: Vec<P> = entries
            .iter()
            .filter(|entry| matcher.matches(entry))
            .map(|entry| fs.file_path(directory, entry))
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(Error::NoInputFiles {
                experiment: name.to_string(),
                pattern,
            });
        }
        debug!("Found {} files for {}", paths.len(), name);
        Ok(paths)
    }

    /// Reads and parses every file of the experiment.
    pub async fn load<Fs>(fs: &Fs, directory: &Fs::PathRef, name: &str) -> Result<Self, Error>
    where
        Fs: FileSystem<Path = P>,
        P: Borrow<Fs::PathRef>,
    {
        let paths = Self::discover(fs, directory, name).await?;

        let futures = paths.into_iter().map(|path| async move {
            let file = fs.read(path.borrow()).await.map_err(|e| Error::Fs {
                experiment: name.to_string(),
                file: format!("{path:?}"),
                source: Box::new(e),
            })?;
            match LogFile::from_reader(file) {
                Ok(log) => Ok(Run::new(path, log)),
                Err(source) => Err(Error::Parse {
                    experiment: name.to_string(),
                    file: format!("{path:?}"),
                    source,
                }),
            }
        });

        let runs = join_all(futures)
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(name, runs))
    }

    pub fn dimensions(&self) -> Dimensions {
        fold_coordinates(self.runs.iter().map(|run| &run.log.coordinates))
    }

    /// Builds the dataset: one axis per coordinate (ascending by name) and
    /// the time axis last, labelled with the grid. Cells no run lands on stay NaN.
    pub fn assemble(&self, options: &AssemblyOptions) -> Result<Dataset, Error> {
        let experiment = || self.name.clone();
        let file = |run: &Run<P>| format!("{:?}", run.path);

        let first = self.runs.first().ok_or_else(|| Error::NoInputFiles {
            experiment: experiment(),
            pattern: file_pattern(&self.name),
        })?;
        let names = &first.log.column_names;
        let time_column = first
            .log
            .column_index(&options.time_column)
            .ok_or_else(|| Error::MissingTimeColumn {
                experiment: experiment(),
                file: file(first),
                column: options.time_column.clone(),
                found: names.clone(),
            })?;

        for run in &self.runs {
            if run.log.samples.nrows() == 0 {
                return Err(Error::Resample {
                    experiment: experiment(),
                    file: file(run),
                    source: resample::Error::NoSamples,
                });
            }
            if run.log.samples.ncols() != names.len() {
                return Err(Error::ColumnMismatch {
                    experiment: experiment(),
                    file: file(run),
                    names: names.len(),
                    columns: run.log.samples.ncols(),
                });
            }
            check_sorted(run.log.samples.view(), time_column).map_err(|source| {
                Error::Resample {
                    experiment: experiment(),
                    file: file(run),
                    source,
                }
            })?;
        }

        let grid = self.time_grid(options, time_column)?;
        let dimensions = self.dimensions();
        info!(
            "Assembling {} from {} files over {} coordinates and {} time samples",
            self.name,
            self.runs.len(),
            dimensions.len(),
            grid.len()
        );

        let mut coords: Vec<Coordinate> = dimensions
            .into_iter()
            .map(|(name, values)| Coordinate::new(name, values.into_iter().collect()))
            .collect();
        coords.push(Coordinate::new(
            options.time_column.clone(),
            grid.values().iter().map(|&t| CoordValue::Numeric(t)).collect(),
        ));

        let variables: Vec<(usize, &String)> = names
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != time_column)
            .collect();
        let mut dataset = Dataset::filled(coords, variables.iter().map(|(_, n)| n.as_str()))
            .map_err(|source| Error::Dataset {
                experiment: experiment(),
                source,
            })?;

        let mut seen = HashSet::new();
        for run in &self.runs {
            let index = self.placement(&dataset, run, options.strict_headers)?;
            if !seen.insert(index.clone()) {
                warn!(
                    "{} lands on the same coordinates as an earlier file of {} and overwrites it",
                    file(run),
                    self.name
                );
            }

            let resampled = convert(time_column, grid.values(), run.log.samples.view())
                .map_err(|source| Error::Resample {
                    experiment: experiment(),
                    file: file(run),
                    source,
                })?;
            for (var, (column, _)) in variables.iter().enumerate() {
                dataset
                    .assign_lane(var, &index, resampled.column(*column))
                    .map_err(|source| Error::Dataset {
                        experiment: experiment(),
                        source,
                    })?;
            }
            debug!("Placed {} at {:?}", file(run), index);
        }

        Ok(dataset)
    }

    fn time_grid(&self, options: &AssemblyOptions, time_column: usize) -> Result<TimeGrid, Error> {
        let Some(span) = time_range(
            self.runs.iter().map(|run| run.log.samples.view()),
            time_column,
        ) else {
            return Err(Error::TimeGrid {
                experiment: self.name.clone(),
                source: resample::Error::NoSamples,
            });
        };
        let min = options.min_time.unwrap_or(span.min);
        let max = options.max_time.unwrap_or(span.max);
        if !span.contains(min) || !span.contains(max) {
            debug!(
                "Time grid [{}, {}] of {} reaches past the samples [{}, {}], edge rows repeat",
                min, max, self.name, span.min, span.max
            );
        }

        TimeGrid::new(options.scale, Range::new(min, max), options.samples).map_err(|source| {
            Error::TimeGrid {
                experiment: self.name.clone(),
                source,
            }
        })
    }

    /// Position of `run` on every axis; `None` spans the axis.
    fn placement(
        &self,
        dataset: &Dataset,
        run: &Run<P>,
        strict: bool,
    ) -> Result<Vec<Option<usize>>, Error> {
        let coords = dataset.coords();
        let (time, others) = coords.split_last().map_or((None, coords), |(t, o)| (Some(t), o));

        let mut index = Vec::with_capacity(coords.len());
        for coord in others {
            match run.log.coordinates.get(&coord.name) {
                Some(value) => {
                    let i = coord.index_of(value).ok_or_else(|| Error::Placement {
                        experiment: self.name.clone(),
                        file: format!("{:?}", run.path),
                        name: coord.name.clone(),
                        value: value.clone(),
                    })?;
                    index.push(Some(i));
                }
                None if strict => {
                    return Err(Error::MissingCoordinate {
                        experiment: self.name.clone(),
                        file: format!("{:?}", run.path),
                        name: coord.name.clone(),
                    })
                }
                None => {
                    warn!(
                        "{:?} does not set {}, writing it across the whole axis",
                        run.path, coord.name
                    );
                    index.push(None);
                }
            }
        }
        if time.is_some() {
            index.push(None);
        }
        Ok(index)
    }
}

/// Loads and assembles each named experiment from `directory`.
pub async fn assemble_experiments<Fs: FileSystem>(
    fs: &Fs,
    directory: &Fs::PathRef,
    names: &[String],
    options: &AssemblyOptions,
) -> Result<Experiments, Error> {
    let mut experiments = Experiments::new();
    for name in names {
        let experiment = Experiment::load(fs, directory, name).await?;
        experiments.insert(name.clone(), experiment.assemble(options)?);
    }
    Ok(experiments)
}

#[cfg(test)]
mod tests {
    use crate::file::mem::MemFs;

    use super::*;

    fn log(header: &str, rows: &[(f64, f64)]) -> String {
        let mut text = format!("# {header}\n# time value\n");
        for (t, v) in rows {
            text.push_str(&format!("{t} {v}\n"));
        }
        text
    }

    fn labels(times: &[f64]) -> Vec<CoordValue> {
        times.iter().map(|&t| CoordValue::Numeric(t)).collect()
    }

    fn ramp(offset: f64) -> Vec<(f64, f64)> {
        (0..5).map(|i| (i as f64 * 5.0, offset + i as f64)).collect()
    }

    fn options(samples: usize) -> AssemblyOptions {
        AssemblyOptions {
            samples,
            min_time: Some(0.0),
            max_time: Some(20.0),
            ..Default::default()
        }
    }

    fn two_algorithms() -> MemFs {
        MemFs::new()
            .with_file("data", "run_a1.txt", &log("Algorithm = a, Seed = 1", &ramp(0.0)))
            .with_file("data", "run_a2.txt", &log("Algorithm = a, Seed = 2", &ramp(10.0)))
            .with_file("data", "run_b1.txt", &log("Algorithm = b, Seed = 1", &ramp(100.0)))
            .with_file("data", "other_1.txt", &log("Algorithm = c, Seed = 1", &ramp(0.0)))
            .with_file("data", "run.txt", "garbage")
    }

    #[tokio::test]
    async fn discovers_only_matching_files() {
        let paths = Experiment::discover(&two_algorithms(), "data", "run")
            .await
            .unwrap();
        assert_eq!(paths, ["data/run_a1.txt", "data/run_a2.txt", "data/run_b1.txt"]);
    }

    #[tokio::test]
    async fn no_input_files() {
        let err = Experiment::discover(&two_algorithms(), "data", "missing")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoInputFiles { experiment, .. } if experiment == "missing"));
    }

    #[tokio::test]
    async fn assembles_missing_combinations_as_nan() {
        let experiment = Experiment::load(&two_algorithms(), "data", "run")
            .await
            .unwrap();
        let dataset = experiment.assemble(&options(3)).unwrap();

        let names: Vec<_> = dataset.coords().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Algorithm", "Seed", "time"]);
        assert_eq!(dataset.shape(), [2, 2, 3]);
        assert_eq!(
            dataset.coord("time").unwrap().values,
            labels(&[0.0, 10.0, 20.0])
        );

        let value = dataset.variable("value").unwrap();
        assert!(dataset.variable("time").is_none());
        assert_eq!(value.get(&[0, 0, 1]), Some(2.0));
        assert_eq!(value.get(&[0, 1, 2]), Some(14.0));
        assert_eq!(value.get(&[1, 0, 0]), Some(100.0));
        assert_eq!(dataset.is_missing("value", &[1, 1, 0]), Some(true));
    }

    #[tokio::test]
    async fn computes_time_bounds_from_files() {
        let fs = MemFs::new()
            .with_file("d", "e_1.txt", &log("Seed = 1", &[(2.0, 1.0), (4.0, 2.0)]))
            .with_file("d", "e_2.txt", &log("Seed = 2", &[(1.0, 3.0), (3.0, 4.0)]));
        let experiment = Experiment::load(&fs, "d", "e").await.unwrap();
        let dataset = experiment
            .assemble(&AssemblyOptions {
                samples: 4,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(
            dataset.coord("time").unwrap().values,
            labels(&[1.0, 2.0, 3.0, 4.0])
        );

        let only_max = experiment
            .assemble(&AssemblyOptions {
                samples: 2,
                max_time: Some(11.0),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(
            only_max.coord("time").unwrap().values,
            labels(&[1.0, 11.0])
        );
    }

    fn lane(dataset: &Dataset, index: [usize; 2]) -> Vec<f64> {
        let value = dataset.variable("value").unwrap();
        (0..dataset.shape()[2])
            .map(|t| value.get(&[index[0], index[1], t]).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn lenient_headers_span_the_missing_axis() {
        let fs = MemFs::new()
            .with_file("d", "e_1.txt", &log("Algorithm = a, Seed = 1", &ramp(0.0)))
            .with_file("d", "e_2.txt", &log("Algorithm = a, Seed = 2", &ramp(10.0)))
            .with_file("d", "e_3.txt", &log("Algorithm = b", &ramp(50.0)));
        let experiment = Experiment::load(&fs, "d", "e").await.unwrap();

        let err = experiment.assemble(&options(3)).unwrap_err();
        assert!(matches!(err, Error::MissingCoordinate { name, file, .. }
            if name == "Seed" && file.contains("e_3.txt")));

        let dataset = experiment
            .assemble(&AssemblyOptions {
                strict_headers: false,
                ..options(3)
            })
            .unwrap();
        assert_eq!(dataset.shape(), [2, 2, 3]);
        assert_eq!(lane(&dataset, [0, 0]), [0.0, 2.0, 4.0]);
        assert_eq!(lane(&dataset, [0, 1]), [10.0, 12.0, 14.0]);
        for seed in 0..2 {
            assert_eq!(lane(&dataset, [1, seed]), [50.0, 52.0, 54.0]);
        }
    }

    #[tokio::test]
    async fn header_without_coordinates_among_others() {
        let fs = MemFs::new()
            .with_file("d", "e_0.txt", &log("no assignments here", &ramp(90.0)))
            .with_file("d", "e_1.txt", &log("Algorithm = a, Seed = 1", &ramp(0.0)))
            .with_file("d", "e_2.txt", &log("Algorithm = b, Seed = 2", &ramp(20.0)));
        let experiment = Experiment::load(&fs, "d", "e").await.unwrap();
        assert!(experiment.runs[0].log.coordinates.is_empty());

        let err = experiment.assemble(&options(3)).unwrap_err();
        assert!(matches!(err, Error::MissingCoordinate { name, file, .. }
            if name == "Algorithm" && file.contains("e_0.txt")));

        let dataset = experiment
            .assemble(&AssemblyOptions {
                strict_headers: false,
                ..options(3)
            })
            .unwrap();
        assert_eq!(lane(&dataset, [0, 0]), [0.0, 2.0, 4.0]);
        assert_eq!(lane(&dataset, [1, 1]), [20.0, 22.0, 24.0]);
        assert_eq!(lane(&dataset, [0, 1]), [90.0, 92.0, 94.0]);
        assert_eq!(lane(&dataset, [1, 0]), [90.0, 92.0, 94.0]);
    }

    #[tokio::test]
    async fn runs_covering_one_instant() {
        let fs = MemFs::new()
            .with_file("d", "e_1.txt", "# Seed = 1\n# time value\n3 7\n")
            .with_file("d", "e_2.txt", "# Seed = 2\n# time value\n3 8\n");
        let experiment = Experiment::load(&fs, "d", "e").await.unwrap();
        let dataset = experiment
            .assemble(&AssemblyOptions {
                samples: 3,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(dataset.coord("time").unwrap().values, labels(&[3.0, 3.0, 3.0]));
        assert_eq!(dataset.variable("value").unwrap().get(&[1, 2]), Some(8.0));
    }

    #[tokio::test]
    async fn later_file_wins_on_duplicate_tuple() {
        let fs = MemFs::new()
            .with_file("d", "e_1.txt", &log("Seed = 1", &ramp(0.0)))
            .with_file("d", "e_2.txt", &log("Seed = 1", &ramp(7.0)));
        let experiment = Experiment::load(&fs, "d", "e").await.unwrap();
        let dataset = experiment.assemble(&options(3)).unwrap();
        assert_eq!(dataset.shape(), [1, 3]);
        assert_eq!(dataset.variable("value").unwrap().get(&[0, 0]), Some(7.0));
    }

    #[tokio::test]
    async fn missing_time_column() {
        let fs = MemFs::new().with_file("d", "e_1.txt", "# Seed = 1\n# t value\n0 1\n");
        let experiment = Experiment::load(&fs, "d", "e").await.unwrap();
        assert!(matches!(
            experiment.assemble(&options(3)),
            Err(Error::MissingTimeColumn { .. })
        ));
    }

    #[tokio::test]
    async fn column_mismatch_and_unsorted() {
        let fs = MemFs::new()
            .with_file("d", "e_1.txt", "# Seed = 1\n# time value\n0 1\n")
            .with_file("d", "e_2.txt", "# Seed = 2\n# time value extra\n0 1 2\n");
        let experiment = Experiment::load(&fs, "d", "e").await.unwrap();
        assert!(matches!(
            experiment.assemble(&options(3)),
            Err(Error::ColumnMismatch { names: 2, columns: 3, .. })
        ));

        let fs = MemFs::new().with_file("d", "e_1.txt", "# Seed = 1\n# time value\n5 1\n1 2\n");
        let experiment = Experiment::load(&fs, "d", "e").await.unwrap();
        assert!(matches!(
            experiment.assemble(&options(3)),
            Err(Error::Resample {
                source: resample::Error::UnsortedTime { row: 1 },
                ..
            })
        ));
    }

    #[tokio::test]
    async fn parse_errors_name_the_file() {
        let fs = MemFs::new().with_file("d", "e_1.txt", "# time value\n0 x\n");
        let err = Experiment::load(&fs, "d", "e").await.unwrap_err();
        assert!(matches!(&err, Error::Parse { file, .. } if file.contains("e_1.txt")));
    }

    #[tokio::test]
    async fn several_experiments() {
        let experiments = assemble_experiments(
            &two_algorithms(),
            "data",
            &["run".to_string(), "other".to_string()],
            &options(5),
        )
        .await
        .unwrap();
        assert_eq!(experiments.keys().collect::<Vec<_>>(), ["other", "run"]);
        assert_eq!(experiments["other"].shape(), [1, 1, 5]);
    }
}
