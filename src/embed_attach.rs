//! Attaches C6 embeddings to a freshly built graph before it's shaped and
//! sent to the store. `codegraph-indexer`'s builder always leaves
//! `embedding: None` (it has no async dependency on the embedding model),
//! so this runs as its own step between the graph builder (C4) and the
//! validator/shaper (C5) per §2's "Data flow (cold index): ... C4 → C5 →
//! {C6, C7} → C8".

use codegraph_core::{Graph, NodeData, NodeId, NodeKind};
use codegraph_embed::EmbeddingService;

/// Walks every `Function`/`Class`/`Struct` node and fills in its embedding
/// in place. Mutates `graph` directly rather than returning a copy since
/// callers immediately reshape it for the store.
pub async fn attach_embeddings(graph: &mut Graph, embed: &EmbeddingService) {
    let function_ids: Vec<NodeId> = graph.nodes_of_kind(NodeKind::Function).cloned().collect();
    for id in function_ids {
        let Some(node) = graph.node(&id) else { continue };
        let NodeData::Function { signature, docstring, .. } = &node.data else { continue };
        let vector = embed.embed_function(&node.name, signature.as_deref(), docstring.as_deref()).await;
        if let Some(NodeData::Function { embedding, .. }) = graph.node_mut(&id).map(|n| &mut n.data) {
            *embedding = Some(vector);
        }
    }

    let class_ids: Vec<NodeId> = graph.nodes_of_kind(NodeKind::Class).cloned().collect();
    for id in class_ids {
        let Some(node) = graph.node(&id) else { continue };
        let NodeData::Class { methods, .. } = &node.data else { continue };
        let vector = embed.embed_class(&node.name, methods).await;
        if let Some(NodeData::Class { embedding, .. }) = graph.node_mut(&id).map(|n| &mut n.data) {
            *embedding = Some(vector);
        }
    }

    let struct_ids: Vec<NodeId> = graph.nodes_of_kind(NodeKind::Struct).cloned().collect();
    for id in struct_ids {
        let Some(node) = graph.node(&id) else { continue };
        let NodeData::Struct { fields, .. } = &node.data else { continue };
        let vector = embed.embed_struct(&node.name, fields).await;
        if let Some(NodeData::Struct { embedding, .. }) = graph.node_mut(&id).map(|n| &mut n.data) {
            *embedding = Some(vector);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_core::{GraphNode, Language};
    use std::path::PathBuf;

    fn function_node(name: &str) -> GraphNode {
        let file_path = PathBuf::from("a.py");
        GraphNode {
            id: NodeId::function(name, &file_path),
            kind: NodeKind::Function,
            name: name.to_string(),
            file_path,
            language: Some(Language::Python),
            data: NodeData::Function {
                line: 1,
                column: 0,
                signature: Some(format!("def {name}():")),
                parameters: Vec::new(),
                return_type: None,
                docstring: None,
                embedding: None,
                belongs_to_class: None,
            },
        }
    }

    #[tokio::test]
    async fn every_function_gets_a_non_empty_embedding() {
        let mut graph = Graph::new();
        graph.add_node(function_node("helper"));
        let embed = EmbeddingService::new();

        attach_embeddings(&mut graph, &embed).await;

        let id = graph.nodes_of_kind(NodeKind::Function).next().unwrap().clone();
        let NodeData::Function { embedding, .. } = &graph.node(&id).unwrap().data else { unreachable!() };
        assert!(embedding.is_some());
    }
}
