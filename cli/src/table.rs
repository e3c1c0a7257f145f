//! Per-combination summary statistics as CSV.

use std::{collections::BTreeMap, io::Write};

use color_eyre::eyre::{eyre, Result};
use ndarray::{Dimension, IxDyn};
use simlog_toolbox_core::{CoordValue, Dataset, Reduction};

/// Mean and standard deviation across seeds.
#[derive(Debug)]
pub struct SeedStatistics {
    pub mean: Dataset,
    pub std: Dataset,
}

/// Averages `dataset` over time, then folds the seed coordinates.
///
/// Seed coordinates the dataset doesn't have are ignored.
pub fn seed_statistics(
    dataset: &Dataset,
    time_column: &str,
    seeds: &[String],
    select: &BTreeMap<String, CoordValue>,
) -> Result<SeedStatistics> {
    let over_time = dataset
        .select(select)?
        .reduce(&[time_column], Reduction::Mean)?;
    let seeds: Vec<&str> = seeds
        .iter()
        .map(String::as_str)
        .filter(|name| over_time.axis(name).is_some())
        .collect();
    Ok(SeedStatistics {
        mean: over_time.reduce(&seeds, Reduction::Mean)?,
        std: over_time.reduce(&seeds, Reduction::Std)?,
    })
}

/// One row per coordinate combination with `<var>_mean` and `<var>_std` columns.
pub fn write_table(stats: &SeedStatistics, out: impl Write) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);

    let coords = stats.mean.coords();
    let variables = stats.mean.variables();
    let header = coords.iter().map(|c| c.name.clone()).chain(
        variables
            .iter()
            .flat_map(|v| [format!("{}_mean", v.name), format!("{}_std", v.name)]),
    );
    wtr.write_record(header)?;

    for index in ndarray::indices(IxDyn(&stats.mean.shape())) {
        let index = index.slice();
        let mut record: Vec<String> = coords
            .iter()
            .zip(index)
            .map(|(c, &i)| c.values[i].to_string())
            .collect();
        for var in variables {
            let std = stats
                .std
                .variable(&var.name)
                .ok_or_else(|| eyre!("No deviation computed for {}", var.name))?;
            for v in [var, std] {
                let value = v.get(index).unwrap_or(f64::NAN);
                record.push(value.to_string());
            }
        }
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}
