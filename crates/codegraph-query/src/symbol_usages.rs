//! `find_symbol_usages(name, kind)` (§4.9.1): one definition record per
//! matching node, plus one usage record per edge into it. What counts as a
//! "usage" edge, and what the source node contributes to the record,
//! differs by kind.

use crate::SymbolKind;
use codegraph_core::graph::Graph;
use codegraph_core::{CodegraphError, EdgeKind, GraphNode, NodeKind};
use serde_json::{json, Value};

pub fn find_symbol_usages(graph: &Graph, name: &str, kind: SymbolKind) -> Result<Value, CodegraphError> {
    let node_kind = kind.node_kind();
    let definitions: Vec<&GraphNode> = graph
        .nodes_of_kind(node_kind)
        .filter_map(|id| graph.node(id))
        .filter(|n| n.name == name)
        .collect();

    let mut definition_records = Vec::new();
    let mut usage_records = Vec::new();

    for def in &definitions {
        definition_records.push(definition_record(def));
        usage_records.extend(usages_of(graph, def, kind));
    }

    Ok(json!({ "definitions": definition_records, "usages": usage_records }))
}

fn definition_record(node: &GraphNode) -> Value {
    json!({
        "id": node.id.as_str(),
        "name": node.name,
        "kind": node.kind.type_name(),
        "file": node.file_path.to_string_lossy(),
        "line": node.line(),
    })
}

fn usages_of(graph: &Graph, def: &GraphNode, kind: SymbolKind) -> Vec<Value> {
    match kind {
        SymbolKind::Function => graph
            .edges_from(&def.id)
            .filter(|e| e.kind == EdgeKind::CalledBy)
            .filter_map(|e| graph.node(&e.target))
            .map(|caller| {
                json!({
                    "type": "call",
                    "caller": caller.name,
                    "file": caller.file_path.to_string_lossy(),
                    "line": caller.line(),
                })
            })
            .collect(),

        SymbolKind::Macro | SymbolKind::Typedef => graph
            .edges_to(&def.id)
            .filter(|e| e.kind == EdgeKind::Uses)
            .filter_map(|e| graph.node(&e.source))
            .filter(|source| source.kind == NodeKind::File)
            .map(|file| {
                json!({
                    "type": "usage",
                    "file": file.file_path.to_string_lossy(),
                })
            })
            .collect(),

        SymbolKind::Variable => graph
            .edges_to(&def.id)
            .filter(|e| e.kind == EdgeKind::Uses)
            .filter_map(|e| graph.node(&e.source))
            .filter(|source| source.kind == NodeKind::Function)
            .map(|function| {
                json!({
                    "type": "usage",
                    "function": function.name,
                    "file": function.file_path.to_string_lossy(),
                })
            })
            .collect(),

        SymbolKind::Struct => graph
            .edges_to(&def.id)
            .filter(|e| e.kind == EdgeKind::Accesses)
            .filter_map(|e| graph.node(&e.source))
            .map(|access| {
                json!({
                    "type": "field_access",
                    "id": access.id.as_str(),
                    "file": access.file_path.to_string_lossy(),
                    "line": access.line(),
                })
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_core::graph::Graph;
    use codegraph_core::{EdgeSource, GraphEdge, Language, NodeData, NodeId};
    use std::path::{Path, PathBuf};

    fn function_node(name: &str, file: &str) -> GraphNode {
        GraphNode {
            id: NodeId::function(name, Path::new(file)),
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
                embedding: None,
                belongs_to_class: None,
            },
        }
    }

    fn calls_edge(caller: NodeId, callee: NodeId) -> GraphEdge {
        GraphEdge {
            source: caller,
            target: callee,
            kind: EdgeKind::Calls,
            edge_source: EdgeSource::Structural,
            file_path: None,
            line: None,
        }
    }

    #[test]
    fn reports_one_usage_per_caller() {
        let mut graph = Graph::new();
        let callee = function_node("helper", "a.py");
        let caller = function_node("main", "a.py");
        graph.add_node(callee.clone());
        graph.add_node(caller.clone());
        let edge = calls_edge(caller.id.clone(), callee.id.clone());
        graph.add_edge(edge.clone());
        if let Some(inverse) = edge.inverse() {
            graph.add_edge(inverse);
        }

        let result = find_symbol_usages(&graph, "helper", SymbolKind::Function).unwrap();
        assert_eq!(result["definitions"].as_array().unwrap().len(), 1);
        let usages = result["usages"].as_array().unwrap();
        assert_eq!(usages.len(), 1);
        assert_eq!(usages[0]["caller"], "main");
    }

    #[test]
    fn missing_symbol_returns_an_empty_result_not_an_error() {
        let graph = Graph::new();
        let result = find_symbol_usages(&graph, "nope", SymbolKind::Function).unwrap();
        assert!(result["definitions"].as_array().unwrap().is_empty());
        assert!(result["usages"].as_array().unwrap().is_empty());
    }
}
