//! Tool host (C11). Exposes the six C9 query operations under the agent
//! tool protocol (§4.11): a call comes in as `(tool_name, JSON args)`,
//! gets deserialized into typed arguments, dispatched, and returns as a
//! single JSON payload — on success the operation's own result, on failure
//! the shared `{error, type}` envelope (§7). No analogous dispatch table
//! exists in the teacher project; this is grounded directly on §4.11 plus
//! `codegraph-core::error`'s envelope.

use codegraph_core::graph::Graph;
use codegraph_core::CodegraphError;
use codegraph_embed::EmbeddingService;
use codegraph_query::SymbolKind;
use codegraph_store::StoreClient;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

/// The fixed six tool names the host recognizes (§6 "Tool surface").
pub const TOOL_NAMES: &[&str] = &[
    "find_symbol_usages",
    "get_include_dependencies",
    "find_struct_field_access",
    "get_function_callers",
    "semantic_code_search",
    "check_affected_files",
];

/// Shared handles the tool host dispatches against. `graph` is behind a
/// lock rather than owned outright because the watch loop (C10) rebuilds
/// it in place on every re-index, concurrently with tool calls the host
/// may still be serving.
pub struct ToolHost {
    graph: Arc<RwLock<Graph>>,
    store: Arc<StoreClient>,
    embed: Arc<EmbeddingService>,
}

impl ToolHost {
    pub fn new(graph: Arc<RwLock<Graph>>, store: Arc<StoreClient>, embed: Arc<EmbeddingService>) -> ToolHost {
        ToolHost { graph, store, embed }
    }

    /// Dispatches one tool call. Never propagates a Rust error: every
    /// failure mode collapses into the `{error, type}` envelope so the
    /// caller always gets back a single JSON value (§4.11).
    pub async fn call(&self, tool_name: &str, args: Value) -> Value {
        match self.dispatch(tool_name, args).await {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(tool = tool_name, error = %err, "tool call failed");
                json!(err.to_envelope())
            }
        }
    }

    async fn dispatch(&self, tool_name: &str, args: Value) -> Result<Value, CodegraphError> {
        match tool_name {
            "find_symbol_usages" => self.find_symbol_usages(args).await,
            "get_include_dependencies" => self.get_include_dependencies(args).await,
            "find_struct_field_access" => self.find_struct_field_access(args).await,
            "get_function_callers" => self.get_function_callers(args).await,
            "semantic_code_search" => self.semantic_code_search(args).await,
            "check_affected_files" => self.check_affected_files(args).await,
            other => Err(CodegraphError::UnknownTool(other.to_string())),
        }
    }

    async fn find_symbol_usages(&self, args: Value) -> Result<Value, CodegraphError> {
        #[derive(Deserialize)]
        struct Args {
            name: String,
            kind: String,
        }
        let args: Args = parse_args(args)?;
        if args.name.trim().is_empty() {
            return Err(CodegraphError::InvalidParameter("name must not be empty".into()));
        }
        let kind = SymbolKind::parse(&args.kind)?;
        let graph = self.graph.read().await;
        codegraph_query::find_symbol_usages(&graph, &args.name, kind)
    }

    async fn get_include_dependencies(&self, args: Value) -> Result<Value, CodegraphError> {
        #[derive(Deserialize)]
        struct Args {
            path: PathBuf,
        }
        let args: Args = parse_args(args)?;
        let graph = self.graph.read().await;
        codegraph_query::get_include_dependencies(&graph, &args.path)
    }

    async fn find_struct_field_access(&self, args: Value) -> Result<Value, CodegraphError> {
        #[derive(Deserialize)]
        struct Args {
            #[serde(rename = "struct")]
            struct_name: String,
            field: String,
        }
        let args: Args = parse_args(args)?;
        if args.struct_name.trim().is_empty() || args.field.trim().is_empty() {
            return Err(CodegraphError::InvalidParameter("struct and field must not be empty".into()));
        }
        let graph = self.graph.read().await;
        codegraph_query::find_struct_field_access(&graph, &args.struct_name, &args.field)
    }

    async fn get_function_callers(&self, args: Value) -> Result<Value, CodegraphError> {
        #[derive(Deserialize)]
        struct Args {
            name: String,
            #[serde(default)]
            include_indirect: bool,
        }
        let args: Args = parse_args(args)?;
        let graph = self.graph.read().await;
        codegraph_query::get_function_callers(&graph, &args.name, args.include_indirect)
    }

    async fn semantic_code_search(&self, args: Value) -> Result<Value, CodegraphError> {
        #[derive(Deserialize)]
        struct Args {
            query: String,
            #[serde(default)]
            file_glob: Option<String>,
            #[serde(default = "default_limit")]
            limit: usize,
        }
        let args: Args = parse_args(args)?;
        if args.query.trim().is_empty() {
            return Err(CodegraphError::InvalidParameter("query must not be empty".into()));
        }
        if args.limit == 0 {
            return Err(CodegraphError::InvalidParameter("limit must be greater than zero".into()));
        }
        let graph = self.graph.read().await;
        codegraph_query::semantic_code_search(&graph, &self.embed, &self.store, &args.query, args.file_glob.as_deref(), args.limit).await
    }

    async fn check_affected_files(&self, args: Value) -> Result<Value, CodegraphError> {
        #[derive(Deserialize)]
        struct Args {
            files: Vec<PathBuf>,
        }
        let args: Args = parse_args(args)?;
        let graph = self.graph.read().await;
        codegraph_query::check_affected_files(&graph, &args.files)
    }
}

fn default_limit() -> usize {
    10
}

fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, CodegraphError> {
    serde_json::from_value(args).map_err(|err| CodegraphError::InvalidParameter(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_host() -> ToolHost {
        let store = StoreClient::connect_lazy("http://127.0.0.1:9080", "http://127.0.0.1:8080", None).unwrap();
        ToolHost::new(Arc::new(RwLock::new(Graph::new())), Arc::new(store), Arc::new(EmbeddingService::new()))
    }

    #[tokio::test]
    async fn unknown_tool_name_becomes_an_error_envelope() {
        let host = empty_host();
        let result = host.call("delete_everything", json!({})).await;
        assert_eq!(result["type"], "unknown_tool");
    }

    #[tokio::test]
    async fn malformed_arguments_become_invalid_parameter() {
        let host = empty_host();
        let result = host.call("find_symbol_usages", json!({"name": "foo"})).await;
        assert_eq!(result["type"], "invalid_parameter");
    }

    #[tokio::test]
    async fn struct_keyword_argument_is_accepted_via_rename() {
        let host = empty_host();
        let result = host.call("find_struct_field_access", json!({"struct": "Widget", "field": "count"})).await;
        assert_eq!(result["matches"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn zero_limit_is_rejected_before_touching_the_store() {
        let host = empty_host();
        let result = host.call("semantic_code_search", json!({"query": "parse config", "limit": 0})).await;
        assert_eq!(result["type"], "invalid_parameter");
    }
}
