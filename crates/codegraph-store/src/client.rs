//! The store client (C8): schema setup, dual-channel insert, the
//! update-single-file cycle, and the two read primitives C9 composes over.
//! Grounded on `original_source/cli/badger/graph/dgraph.py`'s `DgraphClient`,
//! rebuilt around `tonic` (native channel) and `reqwest` (GraphQL channel)
//! in place of `pydgraph`/`requests`.

use crate::backoff::{with_backoff, Outcome};
use crate::batch::{self, PreparedBatch};
use crate::dgraph::dgraph_client::DgraphClient;
use crate::dgraph::{Mutation, Request};
use crate::hash_cache::{node_content_hash, HashCache};
use crate::schema::{self, SchemaError};
use codegraph_core::{Graph, NodeId};
use serde_json::{json, Value};
use std::path::PathBuf;
use tokio::sync::OnceCell;
use tonic::transport::Channel;

const MAX_MESSAGE_SIZE: usize = 50 * 1024 * 1024;
const COMMIT_CHUNK_SIZE: usize = 1000;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("schema setup failed: {0}")]
    Schema(#[from] SchemaError),
    #[error("native channel connection failed: {0}")]
    Connect(#[from] tonic::transport::Error),
    #[error("native channel mutation failed: {0}")]
    Grpc(#[from] tonic::Status),
    #[error("graphql request failed: {0}")]
    GraphQl(#[from] reqwest::Error),
    #[error("failed to encode mutation payload: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write debug dump: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Default)]
pub struct InsertSummary {
    pub inserted: usize,
    pub skipped_unchanged: usize,
    pub embeddings_attached: usize,
    pub embeddings_failed: usize,
}

pub struct StoreClient {
    channel: Channel,
    http: reqwest::Client,
    http_endpoint: String,
    schema_ready: OnceCell<()>,
    /// Opt-in write-only dump of each committed chunk, for diagnosis
    /// (§4.8 step 8; off by default, matching the original's optional
    /// sidecar index).
    debug_dump_dir: Option<PathBuf>,
}

impl StoreClient {
    pub async fn connect(native_endpoint: &str, http_endpoint: &str, debug_dump_dir: Option<PathBuf>) -> Result<StoreClient, StoreError> {
        let channel = Channel::from_shared(native_endpoint.to_string())?.connect().await?;
        Ok(StoreClient {
            channel,
            http: reqwest::Client::new(),
            http_endpoint: http_endpoint.to_string(),
            schema_ready: OnceCell::new(),
            debug_dump_dir,
        })
    }

    /// Builds a client without blocking on the initial connection; the
    /// channel connects lazily on its first RPC. Used where a `StoreClient`
    /// needs to exist before the store is necessarily reachable (tool-host
    /// wiring, tests).
    pub fn connect_lazy(native_endpoint: &str, http_endpoint: &str, debug_dump_dir: Option<PathBuf>) -> Result<StoreClient, StoreError> {
        let channel = Channel::from_shared(native_endpoint.to_string())?.connect_lazy();
        Ok(StoreClient {
            channel,
            http: reqwest::Client::new(),
            http_endpoint: http_endpoint.to_string(),
            schema_ready: OnceCell::new(),
            debug_dump_dir,
        })
    }

    fn dgraph(&self) -> DgraphClient<Channel> {
        DgraphClient::new(self.channel.clone())
            .max_decoding_message_size(MAX_MESSAGE_SIZE)
            .max_encoding_message_size(MAX_MESSAGE_SIZE)
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        self.schema_ready
            .get_or_try_init(|| async { schema::upload_schema(&self.http, &self.http_endpoint).await.map_err(StoreError::from) })
            .await?;
        Ok(())
    }

    /// Idempotent upsert-by-identity insert (§4.8 "Insert algorithm").
    /// `hash_cache`, when given, lets unchanged nodes be skipped entirely;
    /// the caller owns persisting it afterward.
    pub async fn insert_graph(
        &self,
        graph: &Graph,
        shaped_nodes: &[Value],
        mut hash_cache: Option<&mut HashCache>,
    ) -> Result<InsertSummary, StoreError> {
        self.ensure_schema().await?;

        let mut kept_nodes = Vec::with_capacity(shaped_nodes.len());
        let mut skipped_unchanged = 0;
        for node in shaped_nodes {
            let Some(id) = batch::node_id_of(node) else { continue };
            let targets: Vec<String> = edge_targets(graph, id);
            let hash = node_content_hash(node, &targets);

            if let Some(cache) = hash_cache.as_deref_mut() {
                if cache.contains(&hash) {
                    skipped_unchanged += 1;
                    continue;
                }
                cache.insert(hash);
            }
            kept_nodes.push(node.clone());
        }

        let prepared = batch::prepare_batch(&kept_nodes, graph);
        let inserted = self.commit_scalars_and_edges(&prepared).await?;
        let (embeddings_attached, embeddings_failed) = self.attach_embeddings(&prepared).await;

        Ok(InsertSummary { inserted, skipped_unchanged, embeddings_attached, embeddings_failed })
    }

    /// Re-indexes a single file: deletes every node it previously
    /// contained, re-inserts the fresh parse, and links any edge whose
    /// target lives in another file by querying the store for that
    /// target's content-addressed id (§4.8 "Update-single-file algorithm").
    pub async fn update_single_file(
        &self,
        file_path: &str,
        graph: &Graph,
        shaped_nodes: &[Value],
        hash_cache: Option<&mut HashCache>,
    ) -> Result<InsertSummary, StoreError> {
        self.ensure_schema().await?;
        self.delete_file_contents(file_path).await?;

        let summary = self.insert_graph(graph, shaped_nodes, hash_cache).await?;
        self.link_cross_file_edges(graph, shaped_nodes).await?;
        Ok(summary)
    }

    async fn commit_scalars_and_edges(&self, prepared: &PreparedBatch) -> Result<usize, StoreError> {
        let mut total = 0;
        for (index, chunk) in batch::chunk_batch(&prepared.scalars_and_edges, COMMIT_CHUNK_SIZE).into_iter().enumerate() {
            if chunk.is_empty() {
                continue;
            }
            self.dump_chunk_for_diagnosis(index, chunk)?;
            let payload = serde_json::to_vec(&json!({ "set": chunk }))?;
            self.commit_with_retry(payload).await?;
            total += chunk.len();
        }
        Ok(total)
    }

    async fn commit_with_retry(&self, set_json: Vec<u8>) -> Result<(), StoreError> {
        with_backoff(|_attempt| {
            let set_json = set_json.clone();
            async move {
                let mutation = Mutation { set_json, delete_json: Vec::new(), commit_now: true };
                let request = Request { mutations: vec![mutation], commit_now: true, ..Default::default() };
                match self.dgraph().query(request).await {
                    Ok(_) => Outcome::Done(Ok(())),
                    Err(status) if is_transaction_conflict(&status) => Outcome::Retry(StoreError::Grpc(status)),
                    Err(status) => Outcome::Done(Err(StoreError::Grpc(status))),
                }
            }
        })
        .await
    }

    fn dump_chunk_for_diagnosis(&self, index: usize, chunk: &[Value]) -> Result<(), StoreError> {
        let Some(dir) = &self.debug_dump_dir else { return Ok(()) };
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("chunk_{index}.json"));
        std::fs::write(path, serde_json::to_string_pretty(chunk)?)?;
        Ok(())
    }

    /// Sets each node's embedding via the GraphQL channel only, per §4.8:
    /// the native object serializer flattens list-valued scalars into
    /// repeated predicates, which would corrupt a fixed-dimension vector.
    async fn attach_embeddings(&self, prepared: &PreparedBatch) -> (usize, usize) {
        let mut attached = 0;
        let mut failed = 0;
        for embedding in &prepared.embeddings {
            match self.set_embedding_via_graphql(&embedding.type_name, &embedding.id, &embedding.vector).await {
                Ok(()) => attached += 1,
                Err(err) => {
                    tracing::warn!(kind = %embedding.type_name, id = %embedding.id, error = %err, "failed to attach embedding");
                    failed += 1;
                }
            }
        }
        (attached, failed)
    }

    async fn set_embedding_via_graphql(&self, type_name: &str, id: &str, vector: &[f32]) -> Result<(), StoreError> {
        let mutation_name = format!("update{type_name}");
        let query = format!(
            "mutation($id: String!, $vector: [Float!]) {{ {mutation_name}(input: {{filter: {{id: {{eq: $id}}}}, set: {{embedding: $vector}}}}) {{ numUids }} }}"
        );
        let variables = json!({ "id": id, "vector": vector });
        self.execute_graphql(&query, Some(variables)).await?;
        Ok(())
    }

    /// Deletes a file node and everything it contains, without re-inserting
    /// anything — the watch loop's delete path for a file that no longer
    /// exists on disk (§4.10).
    pub async fn delete_file(&self, file_path: &str) -> Result<(), StoreError> {
        self.ensure_schema().await?;
        self.delete_file_contents(file_path).await
    }

    async fn delete_file_contents(&self, file_path: &str) -> Result<(), StoreError> {
        let ids = self.ids_contained_in_file(file_path).await?;
        if ids.is_empty() {
            return Ok(());
        }
        let delete_doc: Vec<Value> = ids.into_iter().map(|id| json!({ "id": id })).collect();
        let payload = serde_json::to_vec(&json!(delete_doc))?;
        let mutation = Mutation { set_json: Vec::new(), delete_json: payload, commit_now: true };
        let request = Request { mutations: vec![mutation], commit_now: true, ..Default::default() };
        self.dgraph().query(request).await?;
        Ok(())
    }

    async fn ids_contained_in_file(&self, file_path: &str) -> Result<Vec<String>, StoreError> {
        let query = r#"query($file: String!) {
            queryFile(filter: {path: {eq: $file}}) { id contains { id } }
        }"#;
        let data = self.execute_graphql(query, Some(json!({ "file": file_path }))).await?;
        let mut ids = Vec::new();
        if let Some(files) = data.get("queryFile").and_then(Value::as_array) {
            for file in files {
                if let Some(id) = file.get("id").and_then(Value::as_str) {
                    ids.push(id.to_string());
                }
                if let Some(contained) = file.get("contains").and_then(Value::as_array) {
                    ids.extend(contained.iter().filter_map(|n| n.get("id")?.as_str()).map(str::to_string));
                }
            }
        }
        Ok(ids)
    }

    /// For each edge whose target isn't part of this file's batch, checks
    /// whether that target already exists in the store (by its
    /// content-addressed id) and links it directly if so.
    async fn link_cross_file_edges(&self, graph: &Graph, shaped_nodes: &[Value]) -> Result<(), StoreError> {
        use std::collections::HashSet;
        let in_batch: HashSet<&str> = shaped_nodes.iter().filter_map(batch::node_id_of).collect();

        for node in shaped_nodes {
            let Some(source_id) = batch::node_id_of(node) else { continue };
            for edge in graph.edges_from(&NodeId(source_id.to_string())) {
                if in_batch.contains(edge.target.as_str()) {
                    continue;
                }
                if self.node_exists(edge.target.as_str()).await? {
                    self.link_by_id(source_id, batch::predicate_key(edge.kind), edge.target.as_str()).await?;
                }
            }
        }
        Ok(())
    }

    async fn node_exists(&self, id: &str) -> Result<bool, StoreError> {
        let query = r#"query($id: String!) {
            queryFunction(filter: {id: {eq: $id}}) { id }
            queryClass(filter: {id: {eq: $id}}) { id }
            queryStruct(filter: {id: {eq: $id}}) { id }
        }"#;
        let data = self.execute_graphql(query, Some(json!({ "id": id }))).await?;
        let found = ["queryFunction", "queryClass", "queryStruct"]
            .iter()
            .any(|key| data.get(*key).and_then(Value::as_array).is_some_and(|a| !a.is_empty()));
        Ok(found)
    }

    async fn link_by_id(&self, source_id: &str, predicate: &str, target_id: &str) -> Result<(), StoreError> {
        let doc = json!({ "id": source_id, (predicate): [{ "id": target_id }] });
        let payload = serde_json::to_vec(&json!([doc]))?;
        let mutation = Mutation { set_json: payload, delete_json: Vec::new(), commit_now: true };
        let request = Request { mutations: vec![mutation], commit_now: true, ..Default::default() };
        self.dgraph().query(request).await?;
        Ok(())
    }

    /// `query_context`: function/class nodes by name with enough
    /// expansion (containing file, callees, inheritance) for an agent to
    /// navigate one hop (§4.8 read primitives).
    pub async fn query_context(&self, names: &[String]) -> Result<Value, StoreError> {
        let query = r#"query($names: [String!]) {
            queryFunction(filter: {name: {in: $names}}) {
                id name file line signature docstring
                calls { id name file }
                belongsToClassRef { id name }
            }
            queryClass(filter: {name: {in: $names}}) {
                id name file line methods baseClasses
                inherits { id name }
                containsMethod { id name }
            }
        }"#;
        self.execute_graphql(query, Some(json!({ "names": names }))).await
    }

    /// `vector_search_similar`: up to 1000 embedded functions/classes,
    /// ranked by cosine similarity to `query_vector` computed in process.
    pub async fn vector_search_similar(&self, query_vector: &[f32], top_k: usize, which: SearchKind) -> Result<Vec<(String, f32)>, StoreError> {
        let (field, query) = match which {
            SearchKind::Function => ("queryFunction", "query { queryFunction(first: 1000) { id embedding } }"),
            SearchKind::Class => ("queryClass", "query { queryClass(first: 1000) { id embedding } }"),
        };
        let data = self.execute_graphql(query, None).await?;

        let mut scored: Vec<(String, f32)> = data
            .get(field)
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|node| {
                let id = node.get("id")?.as_str()?.to_string();
                let embedding: Vec<f32> = node.get("embedding")?.as_array()?.iter().filter_map(Value::as_f64).map(|f| f as f32).collect();
                if embedding.len() != codegraph_embed::EMBEDDING_DIM {
                    return None;
                }
                let distance = 1.0 - cosine_similarity(query_vector, &embedding);
                Some((id, distance))
            })
            .collect();

        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    /// Cheap probe for "has anything ever been inserted" — the watch loop
    /// refuses to start against an empty store (§4.10, §4.12).
    pub async fn has_indexed_content(&self) -> Result<bool, StoreError> {
        let data = self.execute_graphql("query { queryFile(first: 1) { id } }", None).await?;
        Ok(data.get("queryFile").and_then(Value::as_array).map(|files| !files.is_empty()).unwrap_or(false))
    }

    /// Generic GraphQL execution the query layer (C9) composes over.
    pub async fn execute_graphql(&self, query: &str, variables: Option<Value>) -> Result<Value, StoreError> {
        let mut body = json!({ "query": query });
        if let Some(vars) = variables {
            body["variables"] = vars;
        }
        let url = format!("{}/graphql", self.http_endpoint);
        let response = self.http.post(&url).json(&body).send().await?;
        let result: Value = response.json().await?;
        if let Some(errors) = result.get("errors") {
            tracing::warn!(%errors, "graphql query returned errors");
        }
        Ok(result.get("data").cloned().unwrap_or(Value::Null))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Function,
    Class,
}

fn edge_targets(graph: &Graph, id: &str) -> Vec<String> {
    graph.edges_from(&NodeId(id.to_string())).map(|e| e.target.as_str().to_string()).collect()
}

fn is_transaction_conflict(status: &tonic::Status) -> bool {
    status.code() == tonic::Code::Aborted || status.message().to_lowercase().contains("transaction")
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_have_similarity_one() {
        let v = vec![0.1, 0.2, 0.3];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_vectors_have_similarity_zero() {
        assert!((cosine_similarity(&[1.0, 0.0], &[0.0, 1.0])).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_is_defined_as_zero_similarity() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
