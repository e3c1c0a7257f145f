//! Processing settings, read from an optional TOML file.
//!
//! ```toml
//! directory = "data"
//! experiments = ["fully_connected", "limited_connection_range"]
//! cache_file = "data_summary.cache"
//! seed_coordinates = ["Seed"]
//! strict_headers = true
//!
//! [time]
//! column = "time"
//! samples = 2000
//! min = 0.0
//! max = 2000.1
//! scale = "linear"
//! ```

use std::path::{Path, PathBuf};

use color_eyre::eyre::{Result, WrapErr};
use serde::Deserialize;
use simlog_toolbox_core::{AssemblyOptions, TimeScale};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Where the log files live.
    pub directory: PathBuf,
    pub experiments: Vec<String>,
    pub cache_file: PathBuf,
    /// Coordinates that only repeat a run, folded into mean and std.
    pub seed_coordinates: Vec<String>,
    pub strict_headers: bool,
    pub time: TimeConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeConfig {
    pub column: String,
    pub samples: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub scale: TimeScale,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("data"),
            experiments: Vec::new(),
            cache_file: PathBuf::from("data_summary.cache"),
            seed_coordinates: vec!["Seed".to_string()],
            strict_headers: true,
            time: TimeConfig::default(),
        }
    }
}

impl Default for TimeConfig {
    fn default() -> Self {
        let options = AssemblyOptions::default();
        Self {
            column: options.time_column,
            samples: options.samples,
            min: options.min_time,
            max: options.max_time,
            scale: options.scale,
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content)
            .wrap_err_with(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn assembly_options(&self) -> AssemblyOptions {
        AssemblyOptions {
            time_column: self.time.column.clone(),
            samples: self.time.samples,
            min_time: self.time.min,
            max_time: self.time.max,
            scale: self.time.scale,
            strict_headers: self.strict_headers,
        }
    }
}
