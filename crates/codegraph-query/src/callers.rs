//! `get_function_callers(name, include_indirect)` (§4.9.4) and
//! `check_affected_files(files)` (§4.9.6), which reuses the same direct-call
//! lookup plus the include-dependency BFS from [`crate::include_deps`].

use crate::include_deps::reverse_dependents;
use codegraph_core::graph::Graph;
use codegraph_core::{CodegraphError, EdgeKind, NodeData, NodeId, NodeKind};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub fn get_function_callers(graph: &Graph, name: &str, include_indirect: bool) -> Result<Value, CodegraphError> {
    let functions: Vec<NodeId> = graph
        .nodes_of_kind(NodeKind::Function)
        .filter(|id| graph.node(id).map(|n| n.name == name).unwrap_or(false))
        .cloned()
        .collect();

    let direct: Vec<Value> = functions
        .iter()
        .flat_map(|fn_id| direct_callers(graph, fn_id))
        .collect();

    let indirect = if include_indirect { indirect_callers(graph, name) } else { Vec::new() };

    Ok(json!({ "direct": direct, "indirect": indirect }))
}

/// `CalledBy` is materialized on the callee, pointing at the caller (the
/// inverse of `Calls`, which runs caller -> callee).
fn direct_callers(graph: &Graph, function: &NodeId) -> Vec<Value> {
    graph
        .edges_from(function)
        .filter(|e| e.kind == EdgeKind::CalledBy)
        .filter_map(|e| graph.node(&e.target))
        .map(|caller| {
            json!({
                "caller": caller.name,
                "file": caller.file_path.to_string_lossy(),
            })
        })
        .collect()
}

/// Weak heuristic: a `Variable` whose declared type looks like a function
/// pointer and whose type text or own name mentions `name` is flagged as a
/// possible indirect caller (§4.9.4). No control-flow analysis is done.
fn indirect_callers(graph: &Graph, name: &str) -> Vec<Value> {
    graph
        .nodes_of_kind(NodeKind::Variable)
        .filter_map(|id| graph.node(id))
        .filter_map(|node| {
            let NodeData::Variable { var_type, .. } = &node.data else { return None };
            let type_text = var_type.as_deref().unwrap_or("");
            let looks_like_function_pointer = type_text.contains("(*)") || type_text.contains("fn(");
            let mentions_target = type_text.contains(name) || node.name.contains(name);
            (looks_like_function_pointer && mentions_target).then(|| {
                json!({
                    "variable": node.name,
                    "file": node.file_path.to_string_lossy(),
                    "line": node.line(),
                })
            })
        })
        .collect()
}

/// Union, per input file, of its reverse-include dependents and the
/// caller-files of every function it contains, partitioned by cause
/// (§4.9.6).
pub fn check_affected_files(graph: &Graph, files: &[PathBuf]) -> Result<Value, CodegraphError> {
    let mut direct_include: HashSet<String> = HashSet::new();
    let mut transitive_include: HashSet<String> = HashSet::new();
    let mut function_call: HashSet<String> = HashSet::new();

    for file in files {
        let (direct, transitive) = reverse_dependents(graph, file);
        direct_include.extend(direct.into_iter().map(path_string));
        transitive_include.extend(transitive.into_iter().map(path_string));

        for caller_file in caller_files_of_functions_in(graph, file) {
            function_call.insert(caller_file);
        }
    }

    // An include relationship takes precedence when a file is reachable
    // both ways; it doesn't also need to be listed under function_call.
    function_call.retain(|f| !direct_include.contains(f) && !transitive_include.contains(f));

    Ok(json!({
        "direct_include": sorted(direct_include),
        "transitive_include": sorted(transitive_include),
        "function_call": sorted(function_call),
    }))
}

fn caller_files_of_functions_in(graph: &Graph, file: &Path) -> HashSet<String> {
    let file_id = NodeId::file(file);
    let mut callers = HashSet::new();

    for function_id in graph
        .edges_from(&file_id)
        .filter(|e| e.kind == EdgeKind::Contains)
        .filter_map(|e| graph.node(&e.target))
        .filter(|n| n.kind == NodeKind::Function)
        .map(|n| n.id.clone())
        .collect::<Vec<_>>()
    {
        for edge in graph.edges_from(&function_id).filter(|e| e.kind == EdgeKind::CalledBy) {
            if let Some(caller) = graph.node(&edge.target) {
                if caller.file_path != file {
                    callers.insert(path_string(caller.file_path.clone()));
                }
            }
        }
    }

    callers
}

fn path_string(path: PathBuf) -> String {
    path.to_string_lossy().to_string()
}

fn sorted(set: HashSet<String>) -> Vec<String> {
    let mut v: Vec<String> = set.into_iter().collect();
    v.sort();
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_core::graph::Graph;
    use codegraph_core::{EdgeSource, GraphEdge, GraphNode, Language};

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
        GraphEdge { source: caller, target: callee, kind: EdgeKind::Calls, edge_source: EdgeSource::Structural, file_path: None, line: None }
    }

    #[test]
    fn direct_callers_come_from_the_inverse_calledby_edge() {
        let mut graph = Graph::new();
        let callee = function_node("helper", "a.py");
        let caller = function_node("main", "b.py");
        graph.add_node(callee.clone());
        graph.add_node(caller.clone());
        let edge = calls_edge(caller.id.clone(), callee.id.clone());
        graph.add_edge(edge.clone());
        graph.add_edge(edge.inverse().unwrap());

        let result = get_function_callers(&graph, "helper", false).unwrap();
        let direct = result["direct"].as_array().unwrap();
        assert_eq!(direct.len(), 1);
        assert_eq!(direct[0]["file"], "b.py");
        assert!(result["indirect"].as_array().unwrap().is_empty());
    }

    #[test]
    fn unknown_function_returns_empty_lists_not_an_error() {
        let graph = Graph::new();
        let result = get_function_callers(&graph, "nope", false).unwrap();
        assert!(result["direct"].as_array().unwrap().is_empty());
        assert!(result["indirect"].as_array().unwrap().is_empty());
    }
}
