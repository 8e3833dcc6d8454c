//! End-to-end tests across the pipeline crates: scanning and building a
//! small workspace (codegraph-indexer), then querying it (codegraph-query)
//! and dispatching through the tool host (codegraph-tools). None of these
//! touch a live store — that's covered by each crate's own store-facing
//! unit tests against mocked payload shapes.

use codegraph_core::NodeKind;
use codegraph_indexer::WorkspaceIndex;
use codegraph_query::{find_symbol_usages, get_function_callers, SymbolKind};
use codegraph_tools::ToolHost;
use serde_json::json;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::RwLock;

fn two_file_workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("app.py"), "from helpers import helper\n\ndef main():\n    helper()\n").unwrap();
    fs::write(dir.path().join("helpers.py"), "def helper():\n    pass\n").unwrap();
    dir
}

#[test]
fn a_small_python_workspace_builds_a_consistent_graph() {
    let dir = two_file_workspace();

    let (_workspace, outcome) = WorkspaceIndex::scan_and_build(dir.path(), true).unwrap();

    assert!(outcome.validation_errors.is_empty());
    assert_eq!(outcome.graph.nodes_of_kind(NodeKind::File).count(), 2);
    assert_eq!(outcome.graph.nodes_of_kind(NodeKind::Function).count(), 2);
    assert_eq!(outcome.graph.nodes_of_kind(NodeKind::Import).count(), 1);
}

#[test]
fn get_function_callers_follows_the_inverse_calledby_edge_across_files() {
    let dir = two_file_workspace();

    let (_workspace, outcome) = WorkspaceIndex::scan_and_build(dir.path(), true).unwrap();

    let result = get_function_callers(&outcome.graph, "helper", false).unwrap();
    let direct = result["direct"].as_array().unwrap();
    assert_eq!(direct.len(), 1);
    assert_eq!(direct[0]["name"], json!("main"));
}

#[test]
fn find_symbol_usages_reports_definition_and_usage_for_a_function() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("only.py"), "def lonely():\n    pass\n").unwrap();

    let (_workspace, outcome) = WorkspaceIndex::scan_and_build(dir.path(), true).unwrap();

    let result = find_symbol_usages(&outcome.graph, "lonely", SymbolKind::Function).unwrap();
    assert_eq!(result["definitions"].as_array().unwrap().len(), 1);
    assert!(result["usages"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn tool_host_dispatches_get_function_callers_over_the_shared_graph() {
    use codegraph_embed::EmbeddingService;
    use codegraph_store::StoreClient;

    let dir = two_file_workspace();
    let (_workspace, outcome) = WorkspaceIndex::scan_and_build(dir.path(), true).unwrap();

    let graph = Arc::new(RwLock::new(outcome.graph));
    let store = Arc::new(StoreClient::connect_lazy("http://127.0.0.1:9080", "http://127.0.0.1:8080", None).unwrap());
    let embed = Arc::new(EmbeddingService::new());
    let host = ToolHost::new(graph, store, embed);

    let response = host.call("get_function_callers", json!({ "name": "helper" })).await;
    assert_eq!(response["direct"][0]["name"], json!("main"));
}

#[tokio::test]
async fn tool_host_returns_an_error_envelope_for_an_unknown_tool() {
    use codegraph_core::Graph;
    use codegraph_embed::EmbeddingService;
    use codegraph_store::StoreClient;

    let graph = Arc::new(RwLock::new(Graph::new()));
    let store = Arc::new(StoreClient::connect_lazy("http://127.0.0.1:9080", "http://127.0.0.1:8080", None).unwrap());
    let embed = Arc::new(EmbeddingService::new());
    let host = ToolHost::new(graph, store, embed);

    let response = host.call("delete_everything", json!({})).await;
    assert_eq!(response["type"], json!("unknown_tool"));
}
