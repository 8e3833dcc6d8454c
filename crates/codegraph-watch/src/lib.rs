//! Filesystem watch and debounced re-index (C10, §4.10).

pub mod reindex;
pub mod watcher;

pub use reindex::{FlushSummary, PublishedIndex, ReindexLoop};
pub use watcher::{FileWatcher, WatchEvent};
