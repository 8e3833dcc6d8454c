//! Library facade wiring the pipeline crates together (§0, §2). Two entry
//! points, matching the original's `index_directory`/`update_file` pair:
//! [`index_workspace`] (cold index, C1→…→C8) and [`reindex_file`] (the
//! update-single-file path). No binary target — the CLI, the stdio tool
//! wrapper, the container-lifecycle commands, and the web visualizer are
//! external adapters (§1 Non-goals) that would depend on this crate.

mod embed_attach;

pub use codegraph_core as core;
pub use codegraph_embed as embed;
pub use codegraph_indexer as indexer;
pub use codegraph_query as query;
pub use codegraph_store as store;
pub use codegraph_tools as tools;
pub use codegraph_watch as watch;

use codegraph_core::{Graph, SymbolTable};
use codegraph_embed::EmbeddingService;
use codegraph_indexer::pipeline::BuildOutcome;
use codegraph_indexer::validator::validate_and_shape;
use codegraph_indexer::WorkspaceIndex;
use codegraph_store::{HashCache, StoreClient};
use codegraph_tools::ToolHost;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// The store's two endpoints (§4.8): a native channel for scalar+edge
/// batches, an HTTP GraphQL endpoint for embeddings and reads.
pub struct StoreEndpoints {
    pub native: String,
    pub http: String,
}

/// A live, indexed workspace: the shared graph and tool surface an
/// external adapter holds for the process lifetime.
pub struct Session {
    pub graph: Arc<RwLock<Graph>>,
    pub symbols: SymbolTable,
    pub store: Arc<StoreClient>,
    pub embed: Arc<EmbeddingService>,
    pub tools: ToolHost,
    workspace: WorkspaceIndex,
    root: PathBuf,
}

impl Session {
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Cold index: scans `root`, builds the graph (C1→C4), attaches
/// embeddings (C6), shapes and validates every node (C5), registers the
/// workspace (C12), then uploads the schema and inserts the whole graph
/// (C8). `strict` aborts on the first validation failure rather than
/// skipping and continuing (§3 invariant 5).
pub async fn index_workspace(
    root: impl AsRef<Path>,
    endpoints: StoreEndpoints,
    strict: bool,
    debug_dump_dir: Option<PathBuf>,
) -> anyhow::Result<Session> {
    let root = root.as_ref().to_path_buf();
    codegraph_core::register_workspace(&root)?;

    let (workspace, outcome) = WorkspaceIndex::scan_and_build(&root, strict)?;
    let embed = EmbeddingService::new();
    let mut graph = outcome.graph;
    embed_attach::attach_embeddings(&mut graph, &embed).await;
    let shaped_nodes = reshape(&graph, strict)?;

    let store = StoreClient::connect(&endpoints.native, &endpoints.http, debug_dump_dir).await?;
    let mut hash_cache = HashCache::open_user_scoped()?;
    let summary = store.insert_graph(&graph, &shaped_nodes, Some(&mut hash_cache)).await?;
    hash_cache.save()?;

    tracing::info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        inserted = summary.inserted,
        skipped = summary.skipped_unchanged,
        "indexed workspace"
    );

    let embed = Arc::new(embed);
    let store = Arc::new(store);
    let graph = Arc::new(RwLock::new(graph));
    let tools = ToolHost::new(Arc::clone(&graph), Arc::clone(&store), Arc::clone(&embed));

    Ok(Session { graph, symbols: outcome.symbols, store, embed, tools, workspace, root })
}

/// Single-file update (§4.8 "Update-single-file algorithm", §5 "File
/// update is serialized against itself per file"): re-extracts `path`,
/// rebuilds the whole graph from the cached parse results, re-attaches
/// embeddings, then deletes the file's previous contents from the store
/// and re-inserts, publishing the refreshed graph into the session.
pub async fn reindex_file(session: &mut Session, path: impl AsRef<Path>, strict: bool) -> anyhow::Result<()> {
    let path = path.as_ref();
    let BuildOutcome { mut graph, symbols, .. } = session.workspace.reindex_file(path, strict)?;
    embed_attach::attach_embeddings(&mut graph, &session.embed).await;
    let shaped_nodes = reshape(&graph, strict)?;

    let file_path = path.to_string_lossy().to_string();
    let mut hash_cache = HashCache::open_user_scoped()?;
    let summary = session.store.update_single_file(&file_path, &graph, &shaped_nodes, Some(&mut hash_cache)).await?;
    hash_cache.save()?;

    let mut published = session.graph.write().await;
    *published = graph;
    drop(published);
    session.symbols = symbols;

    tracing::info!(
        path = %path.display(),
        inserted = summary.inserted,
        skipped = summary.skipped_unchanged,
        "reindexed file"
    );
    Ok(())
}

/// Re-runs C5's validator/shaper over every node. Done here rather than
/// reused from `WorkspaceIndex::scan_and_build`'s own shaping pass because
/// that pass runs before embeddings (C6) are attached; the store payload
/// needs the embedding-bearing nodes.
fn reshape(graph: &Graph, strict: bool) -> anyhow::Result<Vec<Value>> {
    let mut shaped_nodes = Vec::new();
    for node in graph.all_nodes() {
        match validate_and_shape(node) {
            Ok(shaped) => shaped_nodes.push(shaped),
            Err(err) if strict => return Err(err.into()),
            Err(err) => tracing::warn!(%err, "skipping node that failed validation"),
        }
    }
    Ok(shaped_nodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_endpoints_are_plain_data() {
        let endpoints = StoreEndpoints { native: "http://127.0.0.1:9080".into(), http: "http://127.0.0.1:8080".into() };
        assert_eq!(endpoints.native, "http://127.0.0.1:9080");
    }
}
