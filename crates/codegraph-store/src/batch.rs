//! Builds the two wire-shaped halves of an insert batch from a shaped node
//! list and the graph's edges (§4.8 insert algorithm, steps 4-6): a native
//! JSON mutation document for scalars + relationship references, and a
//! list of per-node GraphQL embedding mutations pulled out separately.

use codegraph_core::{EdgeKind, Graph, NodeId};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// One node's embedding, named by (kind, name, file) for the by-name
/// GraphQL lookup the update channel uses (§4.8: "set embedding vectors by
/// name+file lookup").
pub struct EmbeddingMutation {
    pub type_name: String,
    pub id: String,
    pub vector: Vec<f32>,
}

pub struct PreparedBatch {
    /// One JSON object per node, blank-node-keyed (`uid: "_:<id>"`), with
    /// its scalar fields and outgoing relationship references attached as
    /// nested `{"uid": "_:<target>"}` lists. Embedding fields are stripped.
    pub scalars_and_edges: Vec<Value>,
    pub embeddings: Vec<EmbeddingMutation>,
}

/// Splits `shaped_nodes` (already validated by C5) plus `graph`'s edges
/// into the native-channel document and the embedding mutation list. Only
/// edges whose source is present among `shaped_nodes` are attached — the
/// caller already restricted `graph` to the current batch (or, for the
/// update-single-file path, to edges resolvable by name in the store).
pub fn prepare_batch(shaped_nodes: &[Value], graph: &Graph) -> PreparedBatch {
    let mut scalars_and_edges = Vec::with_capacity(shaped_nodes.len());
    let mut embeddings = Vec::new();

    let mut id_present: HashMap<&str, ()> = HashMap::new();
    for node in shaped_nodes {
        if let Some(id) = node_id_of(node) {
            id_present.insert(id, ());
        }
    }

    for node in shaped_nodes {
        let Some(type_name) = node.get("dgraph.type").and_then(Value::as_str) else { continue };
        let Some(id) = node_id_of(node) else { continue };

        let mut object = Map::new();
        object.insert("uid".to_string(), json!(format!("_:{id}")));

        if let Value::Object(fields) = node {
            for (key, value) in fields {
                if key.ends_with(".embedding") {
                    if let Some(vector) = value.as_array() {
                        let vector: Vec<f32> = vector.iter().filter_map(Value::as_f64).map(|f| f as f32).collect();
                        embeddings.push(EmbeddingMutation { type_name: type_name.to_string(), id: id.to_string(), vector });
                    }
                    continue;
                }
                object.insert(key.clone(), value.clone());
            }
        }

        if let Some(node_id) = codegraph_core_node_id(graph, id) {
            attach_outgoing_edges(&mut object, graph, &node_id, &id_present);
        }

        scalars_and_edges.push(Value::Object(object));
    }

    PreparedBatch { scalars_and_edges, embeddings }
}

pub(crate) fn node_id_of(shaped: &Value) -> Option<&str> {
    let type_name = shaped.get("dgraph.type")?.as_str()?;
    shaped.get(format!("{type_name}.id"))?.as_str()
}

fn codegraph_core_node_id(graph: &Graph, id: &str) -> Option<NodeId> {
    // The shaped node's id field round-trips to the same content-addressed
    // NodeId string the graph uses as its key.
    let candidate = NodeId(id.to_string());
    graph.contains(&candidate).then_some(candidate)
}

fn attach_outgoing_edges(object: &mut Map<String, Value>, graph: &Graph, source: &NodeId, id_present: &HashMap<&str, ()>) {
    let mut by_predicate: HashMap<&'static str, Vec<Value>> = HashMap::new();
    for edge in graph.edges_from(source) {
        if !id_present.contains_key(edge.target.as_str()) {
            // Only emit edges where both endpoints are in the current
            // batch; cross-batch targets are re-linked by name on their
            // own file's insert/update pass (§4.8 step 5).
            continue;
        }
        by_predicate.entry(predicate_key(edge.kind)).or_default().push(json!({"uid": format!("_:{}", edge.target)}));
    }
    for (predicate, targets) in by_predicate {
        object.insert(predicate.to_string(), Value::Array(targets));
    }
}

/// Maps an edge kind to its wire predicate name. `BelongsToClass` is
/// renamed to `belongsToClassRef` to avoid colliding with `Function`'s own
/// `belongsToClass: String` scalar field in the GraphQL schema.
pub fn predicate_key(kind: EdgeKind) -> &'static str {
    match kind {
        EdgeKind::Contains => "contains",
        EdgeKind::Calls => "calls",
        EdgeKind::CalledBy => "calledBy",
        EdgeKind::Inherits => "inherits",
        EdgeKind::InheritedBy => "inheritedBy",
        EdgeKind::ContainsMethod => "containsMethod",
        EdgeKind::BelongsToClass => "belongsToClassRef",
        EdgeKind::Uses => "uses",
        EdgeKind::Accesses => "accesses",
    }
}

/// Splits a batch into fixed-size commit chunks (§4.8 step 7: "commit in
/// chunks of 1000").
pub fn chunk_batch(nodes: &[Value], chunk_size: usize) -> Vec<&[Value]> {
    if chunk_size == 0 {
        return vec![nodes];
    }
    nodes.chunks(chunk_size).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_core::{GraphEdge, GraphNode, Language, NodeData, NodeKind};
    use std::path::PathBuf;

    fn file_node(path: &str) -> GraphNode {
        GraphNode {
            id: NodeId::file(std::path::Path::new(path)),
            kind: NodeKind::File,
            name: path.to_string(),
            file_path: PathBuf::from(path),
            language: Some(Language::Python),
            data: NodeData::File { functions_count: 1, classes_count: 0, structs_count: 0, imports_count: 0, ast_node_total: 10 },
        }
    }

    fn func_node(name: &str, file: &str) -> GraphNode {
        GraphNode {
            id: NodeId::function(name, std::path::Path::new(file)),
            kind: NodeKind::Function,
            name: name.to_string(),
            file_path: PathBuf::from(file),
            language: Some(Language::Python),
            data: NodeData::Function {
                line: 1,
                column: 0,
                signature: None,
                parameters: vec![],
                return_type: None,
                docstring: None,
                embedding: Some(vec![0.5; 384]),
                belongs_to_class: None,
            },
        }
    }

    #[test]
    fn embedding_is_pulled_out_and_scalar_document_omits_it() {
        let mut graph = Graph::new();
        let file = file_node("a.py");
        let func = func_node("helper", "a.py");
        graph.add_node(file.clone());
        graph.add_node(func.clone());
        graph.add_edge(GraphEdge::structural(file.id.clone(), func.id.clone(), EdgeKind::Contains));

        let shaped = vec![
            codegraph_indexer_shape_stub_file(&file),
            codegraph_indexer_shape_stub_func(&func),
        ];
        let batch = prepare_batch(&shaped, &graph);

        assert_eq!(batch.embeddings.len(), 1);
        assert_eq!(batch.embeddings[0].vector.len(), 384);
        let func_doc = batch.scalars_and_edges.iter().find(|n| n["Function.name"] == "helper").unwrap();
        assert!(func_doc.get("Function.embedding").is_none());
    }

    #[test]
    fn edge_to_node_outside_the_batch_is_dropped() {
        let mut graph = Graph::new();
        let file = file_node("a.py");
        let func = func_node("helper", "a.py");
        graph.add_node(file.clone());
        graph.add_node(func.clone());
        graph.add_edge(GraphEdge::structural(file.id.clone(), func.id.clone(), EdgeKind::Contains));

        // Only the file is in the shaped batch; the function is missing.
        let shaped = vec![codegraph_indexer_shape_stub_file(&file)];
        let batch = prepare_batch(&shaped, &graph);
        let file_doc = &batch.scalars_and_edges[0];
        assert!(file_doc.get("contains").is_none());
    }

    fn codegraph_indexer_shape_stub_file(node: &GraphNode) -> Value {
        json!({
            "dgraph.type": "File",
            "File.id": node.id.as_str(),
            "File.path": node.name,
            "File.file": node.file_path.to_string_lossy(),
        })
    }

    fn codegraph_indexer_shape_stub_func(node: &GraphNode) -> Value {
        let NodeData::Function { embedding, .. } = &node.data else { unreachable!() };
        json!({
            "dgraph.type": "Function",
            "Function.id": node.id.as_str(),
            "Function.name": node.name,
            "Function.file": node.file_path.to_string_lossy(),
            "Function.embedding": embedding,
        })
    }
}
