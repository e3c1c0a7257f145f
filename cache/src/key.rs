use std::{borrow::Borrow, fmt, time::SystemTime};

use serde::{Deserialize, Serialize};
use simlog_toolbox_core::FileSystem;

/// Identifies the state of the inputs a cache entry was computed from.
///
/// Entries are only reused under an equal key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FreshnessKey {
    /// Nanoseconds since the Unix epoch.
    Timestamp(u64),
    /// Any other identity of the inputs, e.g. a content hash.
    Tag(String),
    /// `inputs` together with the encoded settings the datasets were
    /// assembled with.
    Scoped {
        inputs: Box<FreshnessKey>,
        settings: Vec<u8>,
    },
}

impl FreshnessKey {
    pub fn tag(tag: impl Into<String>) -> Self {
        Self::Tag(tag.into())
    }

    pub fn timestamp(time: SystemTime) -> Self {
        let nanos = time
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        Self::Timestamp(nanos)
    }

    /// Narrows the key to datasets assembled with `settings`, so changed
    /// settings miss even when the inputs are unchanged.
    pub fn scoped<S: Serialize + ?Sized>(
        self,
        settings: &S,
    ) -> Result<Self, rmp_serde::encode::Error> {
        Ok(Self::Scoped {
            inputs: Box::new(self),
            settings: rmp_serde::to_vec(settings)?,
        })
    }

    /// The latest modification time of any entry in `directory`, log or not.
    pub async fn newest_modification<Fs: FileSystem>(
        fs: &Fs,
        directory: &Fs::PathRef,
    ) -> Result<Self, Fs::Error> {
        let mut newest = SystemTime::UNIX_EPOCH;
        for name in fs.list(directory).await? {
            let path = fs.file_path(directory, &name);
            newest = newest.max(fs.modified(path.borrow()).await?);
        }
        Ok(Self::timestamp(newest))
    }
}

impl fmt::Display for FreshnessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FreshnessKey::Timestamp(nanos) => write!(f, "modified@{nanos}"),
            FreshnessKey::Tag(tag) => write!(f, "tag:{tag}"),
            FreshnessKey::Scoped { inputs, settings } => {
                write!(f, "{inputs} with {} bytes of settings", settings.len())
            }
        }
    }
}
