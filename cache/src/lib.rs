//! Persisted results of dataset assembly, reused while the log directory
//! hasn't changed.

mod file;
mod key;
mod memory;
mod store;

pub use file::FileStore;
pub use key::FreshnessKey;
pub use memory::MemoryStore;
pub use store::{load_or_compute, CacheMiss, DatasetStore, Error};
