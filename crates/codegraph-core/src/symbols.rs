//! Cross-file symbol index: name -> the (possibly many) definitions/
//! declarations sharing that name, plus a per-file reverse index used to
//! evict a file's entries on re-index. Backs the cross-file resolver (C3)
//! and the `find_symbol_usages`/`get_function_callers` query operations.

use crate::model::NodeId;
use dashmap::DashMap;
use std::path::PathBuf;

pub struct SymbolTable {
    /// name -> (node id, defining file), in insertion order.
    by_name: DashMap<String, Vec<(NodeId, PathBuf)>>,
    /// file -> names defined in that file, for eviction on re-index.
    file_symbols: DashMap<PathBuf, Vec<String>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            by_name: DashMap::new(),
            file_symbols: DashMap::new(),
        }
    }

    pub fn insert(&self, name: String, node_id: NodeId, file_path: PathBuf) {
        self.by_name
            .entry(name.clone())
            .or_default()
            .push((node_id, file_path.clone()));
        self.file_symbols.entry(file_path).or_default().push(name);
    }

    /// All known definitions/declarations sharing this name, across files.
    pub fn lookup(&self, name: &str) -> Vec<NodeId> {
        self.by_name
            .get(name)
            .map(|entries| entries.iter().map(|(id, _)| id.clone()).collect())
            .unwrap_or_default()
    }

    /// Definitions of `name` restricted to a single file — used to prefer
    /// a same-file definition when resolving a call.
    pub fn lookup_in_file(&self, name: &str, file: &std::path::Path) -> Vec<NodeId> {
        self.by_name
            .get(name)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|(_, f)| f == file)
                    .map(|(id, _)| id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn names_in_file(&self, file_path: &std::path::Path) -> Vec<String> {
        self.file_symbols
            .get(file_path)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    /// Evicts every symbol contributed by `file_path`, ahead of a re-parse.
    pub fn remove_file(&self, file_path: &std::path::Path) {
        if let Some((_, names)) = self.file_symbols.remove(file_path) {
            for name in names {
                if let Some(mut entries) = self.by_name.get_mut(&name) {
                    entries.retain(|(_, f)| f != file_path);
                }
            }
        }
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_lookup() {
        let table = SymbolTable::new();
        let a = PathBuf::from("a.py");
        let b = PathBuf::from("b.py");
        table.insert("save".into(), NodeId::function("save", &a), a.clone());
        table.insert("save".into(), NodeId::function("save", &b), b.clone());

        assert_eq!(table.lookup("save").len(), 2);
        assert_eq!(table.lookup_in_file("save", &a).len(), 1);
    }

    #[test]
    fn remove_file_evicts_only_its_symbols() {
        let table = SymbolTable::new();
        let a = PathBuf::from("a.py");
        let b = PathBuf::from("b.py");
        table.insert("save".into(), NodeId::function("save", &a), a.clone());
        table.insert("save".into(), NodeId::function("save", &b), b.clone());

        table.remove_file(&a);

        assert_eq!(table.lookup("save").len(), 1);
        assert!(table.names_in_file(&a).is_empty());
    }
}
