use std::{
    io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use simlog_toolbox_core::Experiments;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::{
    store::{CacheMiss, DatasetStore, Error},
    FreshnessKey,
};

#[derive(Serialize)]
struct EntryRef<'a> {
    key: &'a FreshnessKey,
    experiments: &'a Experiments,
}

#[derive(Deserialize)]
struct Entry {
    key: FreshnessKey,
    experiments: Experiments,
}

/// A single MessagePack file holding the key and all datasets.
///
/// Saving writes a temporary file next to the target and renames it over,
/// so readers never see a partial file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }
}

impl DatasetStore for FileStore {
    fn load(&self, key: &FreshnessKey) -> Result<Experiments, CacheMiss> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Err(CacheMiss::Absent),
            Err(err) => return Err(CacheMiss::Corrupt(err.to_string())),
        };
        let entry: Entry =
            rmp_serde::from_slice(&bytes).map_err(|e| CacheMiss::Corrupt(e.to_string()))?;
        if &entry.key != key {
            debug!(
                "Cache {:?} was written for {}, wanted {}",
                self.path, entry.key, key
            );
            return Err(CacheMiss::Stale);
        }
        Ok(entry.experiments)
    }

    fn save(&self, experiments: &Experiments, key: &FreshnessKey) -> Result<(), Error> {
        let mut tmp = NamedTempFile::new_in(self.directory()).map_err(|source| Error::Io {
            path: self.path.clone(),
            source,
        })?;
        rmp_serde::encode::write_named(&mut tmp, &EntryRef { key, experiments })?;
        tmp.persist(&self.path).map_err(|source| Error::Persist {
            path: self.path.clone(),
            source,
        })?;
        debug!("Saved {} datasets to {:?}", experiments.len(), self.path);
        Ok(())
    }
}
