//! Debounced re-index loop (C10). Accumulates watcher events into a pending
//! set; once 10 seconds pass with no further events, deleted paths are
//! purged from the store and a full workspace re-parse refreshes the
//! published graph and the store (§4.10). A new event arriving mid-window
//! cancels and restarts the debounce timer rather than queuing a second
//! flush, so re-index runs never overlap (§5).

use crate::watcher::FileWatcher;
use codegraph_core::{CodegraphError, Graph, SymbolTable};
use codegraph_indexer::WorkspaceIndex;
use codegraph_store::{HashCache, StoreClient};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

const DEBOUNCE_WINDOW: Duration = Duration::from_secs(10);

/// What one flush did, for the caller's logs/metrics.
#[derive(Debug, Default)]
pub struct FlushSummary {
    pub deleted_files: usize,
    pub rescanned: bool,
    pub inserted: usize,
    pub skipped_unchanged: usize,
}

/// The graph + symbol table the rest of the system (tool host) reads;
/// swapped in whole after each successful re-parse.
pub struct PublishedIndex {
    pub graph: Graph,
    pub symbols: SymbolTable,
}

pub struct ReindexLoop {
    watcher: FileWatcher,
    pending: HashSet<PathBuf>,
    workspace: WorkspaceIndex,
    published: Arc<RwLock<PublishedIndex>>,
    store: Arc<StoreClient>,
    hash_cache: Arc<Mutex<HashCache>>,
    strict: bool,
}

impl ReindexLoop {
    /// Refuses to start unless this workspace is the registered one and the
    /// store already holds content from a prior cold index (§4.10, §4.12).
    pub async fn start(
        root: &Path,
        published: Arc<RwLock<PublishedIndex>>,
        store: Arc<StoreClient>,
        hash_cache: Arc<Mutex<HashCache>>,
        strict: bool,
    ) -> Result<ReindexLoop, CodegraphError> {
        let registered = codegraph_core::active_workspace().map_err(|err| CodegraphError::TransportError(err.to_string()))?;
        if registered.as_deref() != Some(root) {
            return Err(CodegraphError::NotIndexed(format!("{} is not the registered workspace", root.display())));
        }

        let has_content = store.has_indexed_content().await.map_err(|err| CodegraphError::TransportError(err.to_string()))?;
        if !has_content {
            return Err(CodegraphError::NotIndexed("store has no indexed content yet".into()));
        }

        let watcher = FileWatcher::start(root).map_err(|err| CodegraphError::TransportError(err.to_string()))?;
        let (workspace, _outcome) =
            WorkspaceIndex::scan_and_build(root, strict).map_err(|err| CodegraphError::ValidationFailure(err.to_string()))?;

        Ok(ReindexLoop { watcher, pending: HashSet::new(), workspace, published, store, hash_cache, strict })
    }

    /// Runs until the watcher's event channel closes.
    pub async fn run(mut self) -> anyhow::Result<()> {
        loop {
            let Some(first) = self.watcher.recv().await else { return Ok(()) };
            self.pending.insert(first.path().to_path_buf());

            loop {
                tokio::select! {
                    event = self.watcher.recv() => {
                        match event {
                            Some(event) => {
                                self.pending.insert(event.path().to_path_buf());
                            }
                            None => break,
                        }
                    }
                    _ = tokio::time::sleep(DEBOUNCE_WINDOW) => break,
                }
            }

            if let Err(err) = self.flush().await {
                warn!(error = %err, "re-index flush failed");
            }
        }
    }

    async fn flush(&mut self) -> anyhow::Result<FlushSummary> {
        let pending: Vec<PathBuf> = self.pending.drain().collect();
        if pending.is_empty() {
            return Ok(FlushSummary::default());
        }

        let deleted: Vec<PathBuf> = pending.into_iter().filter(|p| !p.exists()).collect();

        let mut summary = FlushSummary { deleted_files: deleted.len(), ..Default::default() };
        for path in &deleted {
            let file_path = path.to_string_lossy().to_string();
            if let Err(err) = self.store.delete_file(&file_path).await {
                warn!(path = %file_path, error = %err, "failed to delete file from store");
            }
        }

        // A full workspace re-parse, not per-file reindex_file calls: cheap under
        // tree-sitter and avoids N redundant rebuilds when several files changed
        // within one debounce window. The hash cache suppresses unchanged writes.
        let root = self.watcher.root().to_path_buf();
        let (workspace, outcome) = WorkspaceIndex::scan_and_build(&root, self.strict)?;
        self.workspace = workspace;
        summary.rescanned = true;

        let mut hash_cache = self.hash_cache.lock().await;
        let insert_summary = self.store.insert_graph(&outcome.graph, &outcome.shaped_nodes, Some(&mut *hash_cache)).await?;
        hash_cache.save()?;
        summary.inserted = insert_summary.inserted;
        summary.skipped_unchanged = insert_summary.skipped_unchanged;

        let mut published = self.published.write().await;
        published.graph = outcome.graph;
        published.symbols = outcome.symbols;

        info!(
            deleted = summary.deleted_files,
            inserted = summary.inserted,
            skipped = summary.skipped_unchanged,
            "re-index flush complete"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn refuses_to_start_against_an_unregistered_workspace() {
        let dir = tempdir().unwrap();
        let store = Arc::new(StoreClient::connect_lazy("http://127.0.0.1:9080", "http://127.0.0.1:8080", None).unwrap());
        let published = Arc::new(RwLock::new(PublishedIndex { graph: Graph::new(), symbols: SymbolTable::new() }));
        let hash_cache = Arc::new(Mutex::new(HashCache::open(dir.path().join("hashes.json"))));

        let result = ReindexLoop::start(dir.path(), published, store, hash_cache, false).await;

        assert!(matches!(result, Err(CodegraphError::NotIndexed(_))));
    }
}
