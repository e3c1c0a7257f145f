use std::{borrow::Borrow, error::Error, fmt::Debug, hash::Hash, io::Read, time::SystemTime};

use async_trait::async_trait;

/// Read-only access to the directory holding simulation logs.
///
/// Production code reads from the local disk through [`OsFs`]; tests and
/// embedders can swap in any other store.
#[async_trait]
pub trait FileSystem: Send + Sync + 'static {
    type Path: Borrow<Self::PathRef> + Send + Sync + Debug + Clone + Ord + Hash;
    type PathRef: ?Sized + Send + Sync + Debug + Eq + Hash;
    type Error: Error + Send + Sync + 'static;
    type File: Read + Send;

    async fn read(&self, path: &Self::PathRef) -> Result<Self::File, Self::Error>;
    async fn exists(&self, path: &Self::PathRef) -> Result<bool, Self::Error>;

    /// Lists the plain file names of every entry in `directory`.
    async fn list(&self, directory: &Self::PathRef) -> Result<Vec<String>, Self::Error>;

    /// Last modification time of the entry at `path`.
    async fn modified(&self, path: &Self::PathRef) -> Result<SystemTime, Self::Error>;

    fn file_path(&self, directory: &Self::PathRef, file_name: &str) -> Self::Path;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct OsFs;

#[async_trait]
impl FileSystem for OsFs {
    type Path = std::path::PathBuf;
    type PathRef = std::path::Path;
    type Error = std::io::Error;
    type File = std::fs::File;

    async fn read(&self, path: &Self::PathRef) -> Result<Self::File, Self::Error> {
        std::fs::File::open(path)
    }

    async fn exists(&self, path: &Self::PathRef) -> Result<bool, Self::Error> {
        Ok(path.exists())
    }

    async fn list(&self, directory: &Self::PathRef) -> Result<Vec<String>, Self::Error> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(directory)? {
            let entry = entry?;
            // Log files always have UTF-8 names, anything else can't match a pattern anyway
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    async fn modified(&self, path: &Self::PathRef) -> Result<SystemTime, Self::Error> {
        std::fs::metadata(path)?.modified()
    }

    fn file_path(&self, directory: &Self::PathRef, file_name: &str) -> Self::Path {
        directory.join(file_name)
    }
}

#[cfg(test)]
pub(crate) mod mem {
    use std::{collections::BTreeMap, io::Cursor, time::SystemTime};

    use async_trait::async_trait;

    use super::FileSystem;

    /// Flat in-memory directory tree keyed by `"<dir>/<name>"`.
    #[derive(Debug, Default)]
    pub struct MemFs {
        files: BTreeMap<String, (String, SystemTime)>,
    }

    impl MemFs {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_file(mut self, directory: &str, name: &str, content: &str) -> Self {
            self.files.insert(
                format!("{directory}/{name}"),
                (content.to_string(), SystemTime::UNIX_EPOCH),
            );
            self
        }
    }

    #[async_trait]
    impl FileSystem for MemFs {
        type Path = String;
        type PathRef = str;
        type Error = std::io::Error;
        type File = Cursor<Vec<u8>>;

        async fn read(&self, path: &str) -> Result<Self::File, Self::Error> {
            self.files
                .get(path)
                .map(|(content, _)| Cursor::new(content.clone().into_bytes()))
                .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))
        }

        async fn exists(&self, path: &str) -> Result<bool, Self::Error> {
            Ok(self.files.contains_key(path))
        }

        async fn list(&self, directory: &str) -> Result<Vec<String>, Self::Error> {
            let prefix = format!("{directory}/");
            Ok(self
                .files
                .keys()
                .filter_map(|k| k.strip_prefix(&prefix))
                .map(str::to_string)
                .collect())
        }

        async fn modified(&self, path: &str) -> Result<SystemTime, Self::Error> {
            self.files
                .get(path)
                .map(|(_, t)| *t)
                .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))
        }

        fn file_path(&self, directory: &str, file_name: &str) -> Self::Path {
            format!("{directory}/{file_name}")
        }
    }
}
