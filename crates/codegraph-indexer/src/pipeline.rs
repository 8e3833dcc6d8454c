//! Ties the indexer's components into the two operations the rest of the
//! system drives: a full workspace scan-and-build, and a single-file
//! re-index. Holds the parse-result cache a re-index needs to resolve
//! cross-file calls/includes without re-scanning the whole tree.

use crate::builder::build_graph;
use crate::extractor::ParseResult;
use crate::languages::get_extractor;
use crate::parser_pool::{create_parser_pool, ParserPool};
use crate::resolver::CrossFileIndex;
use crate::scanner::scan_workspace;
use crate::validator::{validate_and_shape, ValidationError};
use codegraph_core::graph::Graph;
use codegraph_core::SymbolTable;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Validated, store-ready nodes plus whatever the shaper rejected.
pub struct BuildOutcome {
    pub graph: Graph,
    pub symbols: SymbolTable,
    pub shaped_nodes: Vec<serde_json::Value>,
    pub validation_errors: Vec<ValidationError>,
}

pub struct WorkspaceIndex {
    parser_pool: ParserPool,
    parse_results: HashMap<PathBuf, ParseResult>,
}

impl WorkspaceIndex {
    /// Scans `root`, extracts every supported file, and builds the graph.
    /// `strict` aborts on the first validation failure instead of skipping
    /// and continuing (§4.5, §3 invariant 5).
    pub fn scan_and_build(root: &Path, strict: bool) -> anyhow::Result<(WorkspaceIndex, BuildOutcome)> {
        let parser_pool = create_parser_pool();
        let files = scan_workspace(root)?;

        let mut parse_results = HashMap::new();
        for file in files {
            match extract_file(&file, parser_pool.clone()) {
                Ok(Some(result)) => {
                    parse_results.insert(file, result);
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(path = %file.display(), error = %err, "failed to parse file, skipping");
                }
            }
        }

        let mut index = WorkspaceIndex { parser_pool, parse_results };
        let outcome = index.rebuild(strict)?;
        Ok((index, outcome))
    }

    /// Re-extracts a single file and rebuilds the whole graph from the
    /// updated parse-result set — the "delete-all-contained-nodes +
    /// re-insert" cycle from §3's lifecycle note, done by full rebuild
    /// rather than an incremental diff.
    pub fn reindex_file(&mut self, path: &Path, strict: bool) -> anyhow::Result<BuildOutcome> {
        let canonical = best_effort_canonical(path);
        match extract_file(&canonical, self.parser_pool.clone())? {
            Some(result) => {
                self.parse_results.insert(canonical, result);
            }
            None => {
                self.parse_results.remove(&canonical);
            }
        }
        self.rebuild(strict)
    }

    /// Drops a deleted file from the index and rebuilds.
    pub fn remove_file(&mut self, path: &Path, strict: bool) -> anyhow::Result<BuildOutcome> {
        self.parse_results.remove(&best_effort_canonical(path));
        self.rebuild(strict)
    }

    fn rebuild(&self, strict: bool) -> anyhow::Result<BuildOutcome> {
        let parse_results: Vec<ParseResult> = self.parse_results.values().cloned().collect();
        let cross_file = CrossFileIndex::build(&parse_results);
        let graph = build_graph(&parse_results, &cross_file);

        let symbols = SymbolTable::new();
        let mut shaped_nodes = Vec::new();
        let mut validation_errors = Vec::new();
        for node in graph.all_nodes() {
            symbols.insert(node.name.clone(), node.id.clone(), node.file_path.clone());
            match validate_and_shape(node) {
                Ok(shaped) => shaped_nodes.push(shaped),
                Err(err) if strict => return Err(err.into()),
                Err(err) => {
                    tracing::warn!(%err, "skipping node that failed validation");
                    validation_errors.push(err);
                }
            }
        }

        Ok(BuildOutcome { graph, symbols, shaped_nodes, validation_errors })
    }
}

/// Canonicalizes `path`, falling back to canonicalizing its parent and
/// rejoining the file name if the file itself no longer exists (the
/// delete case, where `path.canonicalize()` would otherwise fail).
fn best_effort_canonical(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    match (path.parent().and_then(|p| p.canonicalize().ok()), path.file_name()) {
        (Some(parent), Some(name)) => parent.join(name),
        _ => path.to_path_buf(),
    }
}

fn extract_file(path: &Path, parser_pool: ParserPool) -> anyhow::Result<Option<ParseResult>> {
    let Some(extractor) = get_extractor(path, parser_pool) else {
        return Ok(None);
    };
    let content = std::fs::read(path)?;
    Ok(Some(extractor.extract(path, &content)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn scan_and_build_indexes_a_small_workspace() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.py"), "def main():\n    helper()\n\ndef helper():\n    pass\n").unwrap();

        let (_index, outcome) = WorkspaceIndex::scan_and_build(dir.path(), false).unwrap();
        assert!(outcome.validation_errors.is_empty());
        assert!(outcome.graph.node_count() > 0);
        assert!(outcome.shaped_nodes.iter().any(|n| n["dgraph.type"] == "Function"));
    }

    #[test]
    fn reindex_file_picks_up_edits() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.py");
        fs::write(&file, "def one():\n    pass\n").unwrap();

        let (mut index, _) = WorkspaceIndex::scan_and_build(dir.path(), false).unwrap();
        fs::write(&file, "def one():\n    pass\n\ndef two():\n    pass\n").unwrap();
        let outcome = index.reindex_file(&file, false).unwrap();

        let names: Vec<_> = outcome
            .graph
            .all_nodes()
            .filter(|n| n.kind == codegraph_core::NodeKind::Function)
            .map(|n| n.name.clone())
            .collect();
        assert!(names.contains(&"two".to_string()));
    }
}
