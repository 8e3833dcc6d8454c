//! `find_struct_field_access(struct, field)` (§4.9.3): exact match on a
//! `StructFieldAccess` node's composite name, which the builder already
//! writes as `"<struct>.<field>"` (§4.4.4).

use codegraph_core::graph::Graph;
use codegraph_core::{CodegraphError, NodeData, NodeKind};
use serde_json::{json, Value};

pub fn find_struct_field_access(graph: &Graph, struct_name: &str, field: &str) -> Result<Value, CodegraphError> {
    let composite = format!("{struct_name}.{field}");

    let matches: Vec<Value> = graph
        .nodes_of_kind(NodeKind::StructFieldAccess)
        .filter_map(|id| graph.node(id))
        .filter(|n| n.name == composite)
        .map(|n| {
            let NodeData::StructFieldAccess { access_type, resolved_struct_file, .. } = &n.data else {
                unreachable!("StructFieldAccess node kind implies StructFieldAccess data")
            };
            json!({
                "id": n.id.as_str(),
                "file": n.file_path.to_string_lossy(),
                "line": n.line(),
                "access_type": access_type.as_str(),
                "resolved_struct_file": resolved_struct_file.as_ref().map(|p| p.to_string_lossy().to_string()),
            })
        })
        .collect();

    Ok(json!({ "matches": matches }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_core::graph::Graph;
    use codegraph_core::{AccessType, GraphNode, Language, NodeId};
    use std::path::{Path, PathBuf};

    fn access_node(struct_name: &str, field: &str, file: &str) -> GraphNode {
        GraphNode {
            id: NodeId::struct_field_access(struct_name, field, Path::new(file), 4),
            kind: NodeKind::StructFieldAccess,
            name: format!("{struct_name}.{field}"),
            file_path: PathBuf::from(file),
            language: Some(Language::C),
            data: NodeData::StructFieldAccess {
                line: 4,
                column: 2,
                access_type: AccessType::Pointer,
                resolved_struct_file: Some(PathBuf::from(file)),
            },
        }
    }

    #[test]
    fn finds_exact_struct_field_matches_only() {
        let mut graph = Graph::new();
        graph.add_node(access_node("Widget", "count", "a.c"));
        graph.add_node(access_node("Widget", "name", "a.c"));

        let result = find_struct_field_access(&graph, "Widget", "count").unwrap();
        let matches = result["matches"].as_array().unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0]["access_type"], "pointer");
    }
}
