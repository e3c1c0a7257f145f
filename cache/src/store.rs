use std::{future::Future, path::PathBuf};

use simlog_toolbox_core::Experiments;
use thiserror::Error;
use tracing::{info, warn};

use crate::FreshnessKey;

/// Why a store couldn't provide datasets. Never fatal: the caller recomputes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheMiss {
    #[error("nothing cached")]
    Absent,
    #[error("cached under a different key")]
    Stale,
    #[error("unreadable cache: {0}")]
    Corrupt(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to create cache file next to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to encode datasets: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("Failed to replace cache file {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: tempfile::PersistError,
    },
}

pub trait DatasetStore {
    fn load(&self, key: &FreshnessKey) -> Result<Experiments, CacheMiss>;
    fn save(&self, experiments: &Experiments, key: &FreshnessKey) -> Result<(), Error>;
}

/// Returns the datasets stored under `key`, or computes and stores them.
///
/// Failing to store is only logged. Nothing is stored if `compute` fails.
pub async fn load_or_compute<S, F, Fut, E>(
    store: &S,
    key: &FreshnessKey,
    compute: F,
) -> Result<Experiments, E>
where
    S: DatasetStore + ?Sized,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Experiments, E>>,
{
    match store.load(key) {
        Ok(experiments) => {
            info!("Using cached datasets ({})", key);
            return Ok(experiments);
        }
        Err(CacheMiss::Absent) => info!("No cached datasets, assembling"),
        Err(CacheMiss::Stale) => info!("Cached datasets are out of date, reassembling"),
        Err(CacheMiss::Corrupt(reason)) => warn!("Ignoring cache: {}", reason),
    }

    let experiments = compute().await?;
    if let Err(err) = store.save(&experiments, key) {
        warn!("Failed to save cache: {}", err);
    }
    Ok(experiments)
}
