//! Cross-file resolver (C3). Builds a function index and a file-dependency
//! map over a batch of `ParseResult`s so the graph builder can resolve call
//! sites and includes across file boundaries. Writes nothing to the store.

use crate::extractor::ParseResult;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct FunctionRef {
    pub file: PathBuf,
    pub is_definition: bool,
}

pub struct CrossFileIndex {
    /// Function name -> every definition/declaration of it, across files.
    function_index: HashMap<String, Vec<FunctionRef>>,
    /// File -> files it includes/imports, resolved to paths in this batch.
    file_deps: HashMap<PathBuf, Vec<PathBuf>>,
    /// Callee name -> (caller file, caller name) for every resolved call.
    reverse_calls: HashMap<String, Vec<(PathBuf, String)>>,
}

impl CrossFileIndex {
    pub fn build(parse_results: &[ParseResult]) -> CrossFileIndex {
        let mut function_index: HashMap<String, Vec<FunctionRef>> = HashMap::new();
        for result in parse_results {
            for function in &result.functions {
                function_index.entry(function.name.clone()).or_default().push(FunctionRef {
                    file: result.path.clone(),
                    is_definition: function.is_definition,
                });
            }
        }

        let all_files: Vec<&PathBuf> = parse_results.iter().map(|r| &r.path).collect();
        let mut file_deps: HashMap<PathBuf, Vec<PathBuf>> = HashMap::new();
        for result in parse_results {
            let deps = result
                .imports
                .iter()
                .filter_map(|import| resolve_include(&result.path, &import.module, &all_files))
                .collect();
            file_deps.insert(result.path.clone(), deps);
        }

        let mut index = CrossFileIndex {
            function_index,
            file_deps,
            reverse_calls: HashMap::new(),
        };

        for result in parse_results {
            for call in &result.calls {
                if let Some(target) = index.resolve_call(&result.path, &call.callee) {
                    index
                        .reverse_calls
                        .entry(call.callee.clone())
                        .or_default()
                        .push((result.path.clone(), call.caller.clone()));
                    let _ = target;
                }
            }
        }

        index
    }

    /// Resolves a call site's callee name from `caller_file`: prefers a
    /// same-file definition, then a definition in an included file, then
    /// any global with the name (definitions over declarations).
    pub fn resolve_call(&self, caller_file: &Path, callee: &str) -> Option<FunctionRef> {
        let candidates = self.function_index.get(callee)?;

        if let Some(same_file) = candidates.iter().find(|c| c.file == caller_file) {
            return Some(same_file.clone());
        }

        if let Some(deps) = self.file_deps.get(caller_file) {
            if let Some(included) = candidates.iter().find(|c| deps.contains(&c.file)) {
                return Some(included.clone());
            }
        }

        candidates
            .iter()
            .find(|c| c.is_definition)
            .or_else(|| candidates.first())
            .cloned()
    }

    pub fn callers_of(&self, function_name: &str) -> &[(PathBuf, String)] {
        self.reverse_calls
            .get(function_name)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn dependencies_of(&self, file: &Path) -> &[PathBuf] {
        self.file_deps.get(file).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

/// Resolves an include/import name to a path in this batch: first a path
/// relative to the including file's directory, then any parsed file whose
/// basename matches.
fn resolve_include(including_file: &Path, module: &str, all_files: &[&PathBuf]) -> Option<PathBuf> {
    if let Some(parent) = including_file.parent() {
        let candidate = parent.join(module);
        if let Some(found) = all_files.iter().find(|f| f.as_path() == candidate) {
            return Some((*found).clone());
        }
        for ext in ["", ".py", ".h", ".c"] {
            let candidate = parent.join(format!("{module}{ext}"));
            if let Some(found) = all_files.iter().find(|f| f.as_path() == candidate) {
                return Some((*found).clone());
            }
        }
    }

    let module_basename = Path::new(module).file_name()?.to_str()?;
    all_files
        .iter()
        .find(|f| f.file_name().and_then(|n| n.to_str()) == Some(module_basename))
        .map(|f| (*f).clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{ParsedCall, ParsedFunction, ParsedImport};
    use codegraph_core::{ImportKind, Language};

    fn function(name: &str, is_definition: bool) -> ParsedFunction {
        ParsedFunction {
            name: name.to_string(),
            line: 1,
            column: 0,
            end_line: 2,
            parameters: Vec::new(),
            return_type: None,
            docstring: None,
            signature: name.to_string(),
            is_definition,
        }
    }

    #[test]
    fn prefers_same_file_definition_over_any_other() {
        let mut a = ParseResult::empty(PathBuf::from("a.py"), Language::Python);
        a.functions.push(function("helper", true));
        a.calls.push(ParsedCall { caller: "<module>".into(), callee: "helper".into(), line: 3 });

        let mut b = ParseResult::empty(PathBuf::from("b.py"), Language::Python);
        b.functions.push(function("helper", true));

        let index = CrossFileIndex::build(&[a, b]);
        let resolved = index.resolve_call(Path::new("a.py"), "helper").unwrap();
        assert_eq!(resolved.file, PathBuf::from("a.py"));
    }

    #[test]
    fn falls_back_to_included_file_then_any_global() {
        let mut a = ParseResult::empty(PathBuf::from("a.c"), Language::C);
        a.imports.push(ParsedImport {
            module: "b.h".into(),
            line: 1,
            text: "#include \"b.h\"".into(),
            imported_items: Vec::new(),
            alias: None,
            kind: ImportKind::Local,
        });

        let mut b = ParseResult::empty(PathBuf::from("b.h"), Language::C);
        b.functions.push(function("shared", true));

        let index = CrossFileIndex::build(&[a, b]);
        let resolved = index.resolve_call(Path::new("a.c"), "shared").unwrap();
        assert_eq!(resolved.file, PathBuf::from("b.h"));
    }

    #[test]
    fn prefers_definition_over_declaration_when_globally_ambiguous() {
        let mut a = ParseResult::empty(PathBuf::from("a.c"), Language::C);
        a.functions.push(function("foo", false));

        let mut b = ParseResult::empty(PathBuf::from("b.c"), Language::C);
        b.functions.push(function("foo", true));

        let index = CrossFileIndex::build(&[a, b]);
        let resolved = index.resolve_call(Path::new("c.c"), "foo").unwrap();
        assert!(resolved.is_definition);
    }
}
