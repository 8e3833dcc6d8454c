//! Low-level filesystem watcher (§4.10): wraps `notify`'s recursive watch
//! and turns its raw events into the three kinds the re-index loop cares
//! about, filtering out paths outside the workspace root, ignored
//! directories, and non-source extensions up front.

use anyhow::Result;
use codegraph_core::Language;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

#[derive(Debug, Clone)]
pub enum WatchEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Removed(PathBuf),
}

impl WatchEvent {
    pub fn path(&self) -> &Path {
        match self {
            WatchEvent::Created(p) | WatchEvent::Modified(p) | WatchEvent::Removed(p) => p,
        }
    }
}

pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    event_rx: mpsc::UnboundedReceiver<WatchEvent>,
    root: PathBuf,
}

impl FileWatcher {
    /// Starts watching `root` recursively. The underlying `notify` watcher
    /// runs on its own OS thread and hands events to the async side over an
    /// unbounded channel (§5 "two exceptions introduce parallelism").
    pub fn start(root: impl AsRef<Path>) -> Result<FileWatcher> {
        let root = root.as_ref().to_path_buf();
        let root_for_filter = root.clone();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| match res {
            Ok(event) => handle_notify_event(event, &root_for_filter, &event_tx),
            Err(err) => error!(error = %err, "filesystem watch error"),
        })?;
        watcher.watch(&root, RecursiveMode::Recursive)?;

        Ok(FileWatcher { _watcher: watcher, event_rx, root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn recv(&mut self) -> Option<WatchEvent> {
        self.event_rx.recv().await
    }
}

fn handle_notify_event(event: notify::Event, root: &Path, tx: &mpsc::UnboundedSender<WatchEvent>) {
    debug!(?event, "filesystem event");
    let wrap: fn(PathBuf) -> WatchEvent = match event.kind {
        notify::EventKind::Create(_) => WatchEvent::Created,
        notify::EventKind::Modify(_) => WatchEvent::Modified,
        notify::EventKind::Remove(_) => WatchEvent::Removed,
        _ => return,
    };

    for path in event.paths {
        if !is_relevant(&path, root) {
            continue;
        }
        if tx.send(wrap(path)).is_err() {
            warn!("watch event receiver dropped, stopping delivery");
        }
    }
}

/// A path is relevant if it's inside the workspace root, not under an
/// ignored directory, and has a recognized source extension.
fn is_relevant(path: &Path, root: &Path) -> bool {
    path.starts_with(root) && !is_ignored(path) && Language::from_path(path).is_some()
}

fn is_ignored(path: &Path) -> bool {
    path.components().any(|c| matches!(c.as_os_str().to_str(), Some("target" | ".git" | "node_modules" | ".codegraph-index")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignored_directories_are_filtered_regardless_of_extension() {
        let root = Path::new("/workspace");
        assert!(!is_relevant(Path::new("/workspace/target/a.py"), root));
        assert!(!is_relevant(Path::new("/workspace/.git/a.py"), root));
    }

    #[test]
    fn non_source_extensions_are_filtered() {
        let root = Path::new("/workspace");
        assert!(!is_relevant(Path::new("/workspace/README.md"), root));
        assert!(is_relevant(Path::new("/workspace/src/a.py"), root));
        assert!(is_relevant(Path::new("/workspace/src/a.c"), root));
    }

    #[test]
    fn paths_outside_the_root_are_filtered() {
        assert!(!is_relevant(Path::new("/elsewhere/a.py"), Path::new("/workspace")));
    }
}
