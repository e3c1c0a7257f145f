use std::{collections::BTreeMap, fs::File, io::BufWriter, path::PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{self, eyre, WrapErr};
use simlog_toolbox_cache::{load_or_compute, FileStore, FreshnessKey};
use simlog_toolbox_core::{
    experiment::assemble_experiments, CoordValue, Dataset, Experiments, OsFs, TimeScale,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

mod config;
mod plot;
mod table;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML file with processing settings
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory holding the log files
    #[arg(short, long, value_name = "DIR")]
    directory: Option<PathBuf>,

    /// Experiment names, files are matched as `<NAME>_*.txt`
    #[arg(short, long, value_name = "NAME", value_delimiter = ',')]
    experiments: Vec<String>,

    #[arg(long, value_name = "FILE")]
    cache_file: Option<PathBuf>,

    /// Always reassemble, neither reading nor writing the cache
    #[arg(long)]
    no_cache: bool,

    #[arg(long)]
    samples: Option<usize>,

    #[arg(long)]
    min_time: Option<f64>,

    #[arg(long)]
    max_time: Option<f64>,

    #[arg(long)]
    scale: Option<TimeScale>,

    /// Spread files missing a coordinate across that whole axis
    #[arg(long)]
    lenient_headers: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Assemble (or load cached) datasets and print their layout
    Assemble,
    /// Write seed mean and std, averaged over time, as CSV
    Table {
        #[arg(short = 'x', long)]
        experiment: String,
        #[arg(short, long, value_name = "FILE")]
        out: PathBuf,
        /// Fix a coordinate before aggregating, as NAME=VALUE
        #[arg(short, long, value_parser = plot::parse_selection)]
        select: Vec<(String, CoordValue)>,
    },
    /// Draw the seed mean of a variable over time
    Plot {
        #[arg(short = 'x', long)]
        experiment: String,
        #[arg(short, long)]
        variable: String,
        /// Coordinate with one line per value
        #[arg(long)]
        series: String,
        #[arg(short, long, value_name = "FILE")]
        out: PathBuf,
        #[arg(short, long, value_parser = plot::parse_selection)]
        select: Vec<(String, CoordValue)>,
    },
}

impl Cli {
    fn settings(&self) -> eyre::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        if let Some(directory) = &self.directory {
            config.directory = directory.clone();
        }
        if !self.experiments.is_empty() {
            config.experiments = self.experiments.clone();
        }
        if let Some(cache_file) = &self.cache_file {
            config.cache_file = cache_file.clone();
        }
        if let Some(samples) = self.samples {
            config.time.samples = samples;
        }
        if let Some(min) = self.min_time {
            config.time.min = Some(min);
        }
        if let Some(max) = self.max_time {
            config.time.max = Some(max);
        }
        if let Some(scale) = self.scale {
            config.time.scale = scale;
        }
        if self.lenient_headers {
            config.strict_headers = false;
        }
        Ok(config)
    }
}

async fn experiments(config: &Config, use_cache: bool) -> eyre::Result<Experiments> {
    if config.experiments.is_empty() {
        return Err(eyre!(
            "No experiments configured, pass --experiments or set them in the config file"
        ));
    }

    let options = &config.assembly_options();
    let directory = config.directory.as_path();
    let compute = move || async move {
        assemble_experiments(&OsFs, directory, &config.experiments, options)
            .await
            .wrap_err_with(|| format!("Failed to assemble datasets from {:?}", config.directory))
    };
    if !use_cache {
        return compute().await;
    }

    let key = FreshnessKey::newest_modification(&OsFs, directory)
        .await
        .wrap_err_with(|| format!("Failed to scan {:?}", config.directory))?
        .scoped(&(&config.experiments, options))?;
    let store = FileStore::new(&config.cache_file);
    load_or_compute(&store, &key, compute).await
}

fn dataset<'a>(experiments: &'a Experiments, name: &str) -> eyre::Result<&'a Dataset> {
    experiments.get(name).ok_or_else(|| {
        eyre!(
            "Unknown experiment {name}, have {:?}",
            experiments.keys().collect::<Vec<_>>()
        )
    })
}

fn describe(name: &str, dataset: &Dataset) {
    let axes: Vec<String> = dataset
        .coords()
        .iter()
        .map(|c| format!("{} ({})", c.name, c.len()))
        .collect();
    let variables: Vec<&str> = dataset.variables().iter().map(|v| v.name.as_str()).collect();
    info!(
        "{}: axes [{}], variables [{}]",
        name,
        axes.join(", "),
        variables.join(", ")
    );
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Cli::parse();
    let config = args.settings()?;
    let experiments = experiments(&config, !args.no_cache).await?;

    match args.command {
        Command::Assemble => {
            for (name, dataset) in &experiments {
                describe(name, dataset);
            }
        }
        Command::Table {
            experiment,
            out,
            select,
        } => {
            let dataset = dataset(&experiments, &experiment)?;
            let select: BTreeMap<_, _> = select.into_iter().collect();
            let stats = table::seed_statistics(
                dataset,
                &config.time.column,
                &config.seed_coordinates,
                &select,
            )?;
            let file = File::create(&out)
                .wrap_err_with(|| format!("Failed to create {}", out.display()))?;
            table::write_table(&stats, BufWriter::new(file))?;
            info!("Wrote {}", out.display());
        }
        Command::Plot {
            experiment,
            variable,
            series,
            out,
            select,
        } => {
            let dataset = dataset(&experiments, &experiment)?;
            let select: BTreeMap<_, _> = select.into_iter().collect();
            let lines = plot::series_lines(
                &dataset.select(&select)?,
                &variable,
                &series,
                &config.time.column,
                &config.seed_coordinates,
            )?;
            plot::render(&lines, &format!("{experiment}: {variable}"), &variable, &out)?;
            info!("Wrote {}", out.display());
        }
    }

    Ok(())
}
