//! `get_include_dependencies(path)` (§4.9.2): the transitive set of files
//! that depend on (import/include) a given file. The per-import resolution
//! mirrors the cross-file resolver's include matching (relative path, then
//! extension guesses, then basename), run here over the built graph's
//! `Import` nodes rather than the raw parse results, since the query layer
//! only ever sees the graph. Reverse reachability is capped at depth 20
//! with cycle detection, deliberately simple for both the Python
//! dotted-module and the C/C++ include-text cases (§4.9.2).

use codegraph_core::graph::Graph;
use codegraph_core::{CodegraphError, EdgeKind, NodeId, NodeKind};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

const MAX_DEPTH: usize = 20;

pub fn get_include_dependencies(graph: &Graph, path: &Path) -> Result<Value, CodegraphError> {
    let (direct, transitive) = reverse_dependents(graph, path);
    Ok(json!({
        "direct": paths_to_strings(&direct),
        "transitive": paths_to_strings(&transitive),
    }))
}

/// Returns `(direct dependents, transitive-only dependents)` of `target`,
/// where "direct" means the importing file includes `target` itself and
/// "transitive" means it only reaches `target` through one or more other
/// files' includes.
pub fn reverse_dependents(graph: &Graph, target: &Path) -> (Vec<PathBuf>, Vec<PathBuf>) {
    let direct_map = build_direct_dependents(graph);

    let direct: HashSet<PathBuf> = direct_map.get(target).cloned().unwrap_or_default();
    let mut visited: HashSet<PathBuf> = direct.clone();
    visited.insert(target.to_path_buf());

    let mut all_transitive: HashSet<PathBuf> = HashSet::new();
    let mut frontier = direct.clone();
    let mut depth = 0;
    while !frontier.is_empty() && depth < MAX_DEPTH {
        let mut next = HashSet::new();
        for file in &frontier {
            if let Some(deps) = direct_map.get(file) {
                for dep in deps {
                    if visited.insert(dep.clone()) {
                        next.insert(dep.clone());
                        all_transitive.insert(dep.clone());
                    }
                }
            }
        }
        frontier = next;
        depth += 1;
    }

    (direct.into_iter().collect(), all_transitive.into_iter().collect())
}

/// file -> the files whose imports resolve directly to it.
fn build_direct_dependents(graph: &Graph) -> HashMap<PathBuf, HashSet<PathBuf>> {
    let all_files = all_file_paths(graph);
    let mut map: HashMap<PathBuf, HashSet<PathBuf>> = HashMap::new();

    for importer in &all_files {
        for target in direct_import_targets(graph, importer, &all_files) {
            map.entry(target).or_default().insert(importer.clone());
        }
    }

    map
}

fn all_file_paths(graph: &Graph) -> Vec<PathBuf> {
    graph.nodes_of_kind(NodeKind::File).filter_map(|id| graph.node(id)).map(|n| n.file_path.clone()).collect()
}

fn direct_import_targets(graph: &Graph, importer: &Path, all_files: &[PathBuf]) -> Vec<PathBuf> {
    let importer_id = NodeId::file(importer);
    graph
        .edges_from(&importer_id)
        .filter(|e| e.kind == EdgeKind::Contains)
        .filter_map(|e| graph.node(&e.target))
        .filter(|n| n.kind == NodeKind::Import)
        .filter_map(|n| resolve_include(importer, &n.name, all_files))
        .collect()
}

/// Same matching order the builder's cross-file resolver uses for calls: a
/// path relative to the including file's directory (with a few extension
/// guesses), else any indexed file with a matching basename.
fn resolve_include(including_file: &Path, module: &str, all_files: &[PathBuf]) -> Option<PathBuf> {
    if let Some(parent) = including_file.parent() {
        let candidate = parent.join(module);
        if let Some(found) = all_files.iter().find(|f| f.as_path() == candidate) {
            return Some(found.clone());
        }
        for ext in ["", ".py", ".h", ".c"] {
            let candidate = parent.join(format!("{module}{ext}"));
            if let Some(found) = all_files.iter().find(|f| f.as_path() == candidate) {
                return Some(found.clone());
            }
        }
    }

    let module_basename = Path::new(module).file_name()?.to_str()?;
    all_files.iter().find(|f| f.file_name().and_then(|n| n.to_str()) == Some(module_basename)).cloned()
}

fn paths_to_strings(paths: &[PathBuf]) -> Vec<String> {
    paths.iter().map(|p| p.to_string_lossy().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_core::{GraphEdge, GraphNode, ImportKind, Language, NodeData};

    fn file_node(path: &str) -> GraphNode {
        GraphNode {
            id: NodeId::file(Path::new(path)),
            kind: NodeKind::File,
            name: path.to_string(),
            file_path: PathBuf::from(path),
            language: Some(Language::C),
            data: NodeData::File { functions_count: 0, classes_count: 0, structs_count: 0, imports_count: 1, ast_node_total: 1 },
        }
    }

    fn import_node(module: &str, file: &str, line: u32) -> GraphNode {
        GraphNode {
            id: NodeId::import(module, Path::new(file), line),
            kind: NodeKind::Import,
            name: module.to_string(),
            file_path: PathBuf::from(file),
            language: Some(Language::C),
            data: NodeData::Import { line, text: Some(format!("#include \"{module}\"")), imported_items: vec![], alias: None, kind: ImportKind::Local },
        }
    }

    fn wire_contains(graph: &mut Graph, file: &GraphNode, child: &GraphNode) {
        graph.add_edge(GraphEdge::structural(file.id.clone(), child.id.clone(), EdgeKind::Contains));
    }

    #[test]
    fn direct_and_transitive_includers_are_separated() {
        let mut graph = Graph::new();
        let c = file_node("c.h");
        let b = file_node("b.h");
        let a = file_node("a.c");
        graph.add_node(c.clone());
        graph.add_node(b.clone());
        graph.add_node(a.clone());

        let b_imports_c = import_node("c.h", "b.h", 1);
        graph.add_node(b_imports_c.clone());
        wire_contains(&mut graph, &b, &b_imports_c);

        let a_imports_b = import_node("b.h", "a.c", 1);
        graph.add_node(a_imports_b.clone());
        wire_contains(&mut graph, &a, &a_imports_b);

        let result = get_include_dependencies(&graph, Path::new("c.h")).unwrap();
        let direct: Vec<String> = result["direct"].as_array().unwrap().iter().map(|v| v.as_str().unwrap().to_string()).collect();
        let transitive: Vec<String> = result["transitive"].as_array().unwrap().iter().map(|v| v.as_str().unwrap().to_string()).collect();
        assert_eq!(direct, vec!["b.h".to_string()]);
        assert_eq!(transitive, vec!["a.c".to_string()]);
    }

    #[test]
    fn unindexed_file_returns_empty_lists_not_an_error() {
        let graph = Graph::new();
        let result = get_include_dependencies(&graph, Path::new("missing.c")).unwrap();
        assert!(result["direct"].as_array().unwrap().is_empty());
        assert!(result["transitive"].as_array().unwrap().is_empty());
    }
}
