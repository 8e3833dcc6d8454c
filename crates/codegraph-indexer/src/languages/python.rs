//! Python extractor (C2). Walks a tree-sitter Python AST and produces
//! functions, classes, imports, and calls per §4.2: method calls are
//! recorded by their last attribute segment only (name-only resolution),
//! and top-level call sites are attributed to the synthetic `<module>`
//! function.

use crate::extractor::{LanguageExtractor, ParseResult, ParsedCall, ParsedClass, ParsedFunction, ParsedImport};
use crate::parser_pool::{FileType, ParseRequest, ParserPool};
use codegraph_core::{ImportKind, Language};
use std::path::Path;
use tree_sitter::{Node, Point};

/// Top-level standard-library module names. Imports resolving to one of
/// these are dropped entirely rather than stored with `kind = system`,
/// matching the C extractor's treatment of `<system>` includes.
const PYTHON_STDLIB: &[&str] = &[
    "os", "sys", "re", "io", "json", "math", "time", "datetime", "collections", "itertools",
    "functools", "typing", "abc", "enum", "pathlib", "subprocess", "threading", "asyncio",
    "logging", "unittest", "argparse", "copy", "random", "string", "textwrap", "traceback",
    "warnings", "weakref", "socket", "struct", "hashlib", "hmac", "base64", "uuid", "shutil",
    "tempfile", "glob", "fnmatch", "csv", "sqlite3", "xml", "html", "http", "urllib", "email",
    "contextlib", "dataclasses", "decimal", "fractions", "statistics", "array", "queue",
    "multiprocessing", "concurrent", "signal", "platform", "inspect", "importlib", "pickle",
    "copyreg", "operator", "heapq", "bisect", "types", "numbers", "ast", "dis", "gc", "ctypes",
];

pub struct PythonExtractor {
    parser_pool: ParserPool,
}

impl PythonExtractor {
    pub fn new(parser_pool: ParserPool) -> Self {
        Self { parser_pool }
    }

    fn line(point: Point) -> u32 {
        point.row as u32 + 1
    }

    fn text<'a>(node: Node, source: &'a [u8]) -> &'a str {
        node.utf8_text(source).unwrap_or_default()
    }

    fn parameter_name(node: Node, source: &[u8]) -> Option<String> {
        match node.kind() {
            "identifier" => Some(Self::text(node, source).to_string()),
            "typed_parameter" | "default_parameter" | "typed_default_parameter" => node
                .child_by_field_name("name")
                .or_else(|| node.named_child(0))
                .map(|n| Self::text(n, source).trim_start_matches(['*']).to_string()),
            "list_splat_pattern" | "dictionary_splat_pattern" => node
                .named_child(0)
                .map(|n| Self::text(n, source).to_string()),
            _ => None,
        }
    }

    fn extract_parameters(params_node: Node, source: &[u8]) -> Vec<String> {
        let mut cursor = params_node.walk();
        params_node
            .named_children(&mut cursor)
            .filter_map(|child| Self::parameter_name(child, source))
            .collect()
    }

    fn extract_docstring(body: Node, source: &[u8]) -> Option<String> {
        let first = body.named_child(0)?;
        if first.kind() != "expression_statement" {
            return None;
        }
        let expr = first.named_child(0)?;
        if expr.kind() != "string" {
            return None;
        }
        let raw = Self::text(expr, source);
        Some(
            raw.trim_matches(['"', '\''])
                .trim_start_matches("r")
                .trim()
                .to_string(),
        )
    }

    fn build_signature(name: &str, parameters: &[String], return_type: &Option<String>) -> String {
        let params = parameters.join(", ");
        match return_type {
            Some(rt) => format!("{name}({params}) -> {rt}"),
            None => format!("{name}({params})"),
        }
    }

    fn extract_function(node: Node, source: &[u8]) -> Option<ParsedFunction> {
        if node.kind() != "function_definition" {
            return None;
        }
        let name_node = node.child_by_field_name("name")?;
        let name = Self::text(name_node, source).to_string();
        let parameters = node
            .child_by_field_name("parameters")
            .map(|p| Self::extract_parameters(p, source))
            .unwrap_or_default();
        let return_type = node
            .child_by_field_name("return_type")
            .map(|n| Self::text(n, source).to_string());
        let docstring = node
            .child_by_field_name("body")
            .and_then(|b| Self::extract_docstring(b, source));
        let signature = Self::build_signature(&name, &parameters, &return_type);

        Some(ParsedFunction {
            name,
            line: Self::line(node.start_position()),
            column: node.start_position().column as u32,
            end_line: Self::line(node.end_position()),
            parameters,
            return_type,
            docstring,
            signature,
            is_definition: true,
        })
    }

    fn extract_class(node: Node, source: &[u8]) -> Option<ParsedClass> {
        if node.kind() != "class_definition" {
            return None;
        }
        let name_node = node.child_by_field_name("name")?;
        let name = Self::text(name_node, source).to_string();

        let base_classes = node
            .child_by_field_name("superclasses")
            .map(|args| {
                let mut cursor = args.walk();
                args.named_children(&mut cursor)
                    .filter(|c| c.kind() != "keyword_argument")
                    .map(|c| Self::text(c, source).to_string())
                    .collect()
            })
            .unwrap_or_default();

        let methods = node
            .child_by_field_name("body")
            .map(|body| {
                let mut cursor = body.walk();
                body.named_children(&mut cursor)
                    .filter(|c| c.kind() == "function_definition")
                    .filter_map(|c| c.child_by_field_name("name"))
                    .map(|n| Self::text(n, source).to_string())
                    .collect()
            })
            .unwrap_or_default();

        Some(ParsedClass {
            name,
            line: Self::line(node.start_position()),
            end_line: Self::line(node.end_position()),
            column: node.start_position().column as u32,
            base_classes,
            methods,
        })
    }

    /// `import X [as Y]` and `from X import Y, Z [as W]`. Stdlib modules
    /// are filtered out entirely rather than kept with `kind = system`.
    fn extract_imports(node: Node, source: &[u8]) -> Vec<ParsedImport> {
        let mut out = Vec::new();
        let line = Self::line(node.start_position());
        let text = Self::text(node, source).to_string();

        match node.kind() {
            "import_statement" => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    let (module, alias) = match child.kind() {
                        "dotted_name" => (Self::text(child, source).to_string(), None),
                        "aliased_import" => {
                            let module = child
                                .child_by_field_name("name")
                                .map(|n| Self::text(n, source).to_string())
                                .unwrap_or_default();
                            let alias = child
                                .child_by_field_name("alias")
                                .map(|n| Self::text(n, source).to_string());
                            (module, alias)
                        }
                        _ => continue,
                    };
                    if is_stdlib_top_level(&module) {
                        continue;
                    }
                    out.push(ParsedImport {
                        module,
                        line,
                        text: text.clone(),
                        imported_items: Vec::new(),
                        alias,
                        kind: ImportKind::Local,
                    });
                }
            }
            "import_from_statement" => {
                let module_name_node = node.child_by_field_name("module_name");
                let module = module_name_node
                    .map(|n| Self::text(n, source).to_string())
                    .unwrap_or_default();
                if is_stdlib_top_level(&module) {
                    return out;
                }
                let mut imported_items = Vec::new();
                let mut alias = None;
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    if Some(child) == module_name_node {
                        continue;
                    }
                    match child.kind() {
                        "dotted_name" | "identifier" => {
                            imported_items.push(Self::text(child, source).to_string());
                        }
                        "aliased_import" => {
                            if let Some(n) = child.child_by_field_name("name") {
                                imported_items.push(Self::text(n, source).to_string());
                            }
                            alias = child
                                .child_by_field_name("alias")
                                .map(|n| Self::text(n, source).to_string());
                        }
                        "wildcard_import" => imported_items.push("*".to_string()),
                        _ => {}
                    }
                }
                out.push(ParsedImport {
                    module,
                    line,
                    text: text.clone(),
                    imported_items,
                    alias,
                    kind: ImportKind::Local,
                });
            }
            _ => {}
        }

        out
    }

    fn call_callee(function_node: Node, source: &[u8]) -> Option<String> {
        match function_node.kind() {
            "identifier" => Some(Self::text(function_node, source).to_string()),
            "attribute" => function_node
                .child_by_field_name("attribute")
                .map(|n| Self::text(n, source).to_string()),
            _ => None,
        }
    }
}

fn is_stdlib_top_level(module: &str) -> bool {
    let top = module.split('.').next().unwrap_or(module);
    let top = top.trim_start_matches('.');
    PYTHON_STDLIB.contains(&top)
}

fn count_nodes(node: Node) -> u32 {
    let mut total = 1u32;
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        total += count_nodes(child);
    }
    total
}

fn walk(
    node: Node,
    source: &[u8],
    caller_stack: &mut Vec<String>,
    functions: &mut Vec<ParsedFunction>,
    classes: &mut Vec<ParsedClass>,
    imports: &mut Vec<ParsedImport>,
    calls: &mut Vec<ParsedCall>,
) {
    match node.kind() {
        "function_definition" => {
            if let Some(function) = PythonExtractor::extract_function(node, source) {
                let name = function.name.clone();
                functions.push(function);
                caller_stack.push(name);
                if let Some(body) = node.child_by_field_name("body") {
                    let mut cursor = body.walk();
                    for child in body.children(&mut cursor) {
                        walk(child, source, caller_stack, functions, classes, imports, calls);
                    }
                }
                caller_stack.pop();
                return;
            }
        }
        "class_definition" => {
            if let Some(class) = PythonExtractor::extract_class(node, source) {
                classes.push(class);
            }
        }
        "import_statement" | "import_from_statement" => {
            imports.extend(PythonExtractor::extract_imports(node, source));
        }
        "call" => {
            if let Some(function_node) = node.child_by_field_name("function") {
                if let Some(callee) = PythonExtractor::call_callee(function_node, source) {
                    let caller = caller_stack
                        .last()
                        .cloned()
                        .unwrap_or_else(|| "<module>".to_string());
                    calls.push(ParsedCall {
                        caller,
                        callee,
                        line: PythonExtractor::line(node.start_position()),
                    });
                }
            }
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, source, caller_stack, functions, classes, imports, calls);
    }
}

impl LanguageExtractor for PythonExtractor {
    fn extract(&self, path: &Path, content: &[u8]) -> anyhow::Result<ParseResult> {
        if content.is_empty() {
            return Ok(ParseResult::empty(path.to_path_buf(), Language::Python));
        }
        let source_code = std::str::from_utf8(content)?;

        let parsed = self.parser_pool.parse_blocking(ParseRequest {
            file_type: FileType::Python,
            content: source_code.to_string(),
            path: path.to_path_buf(),
        })?;

        let root = parsed.tree.root_node();
        let mut functions = Vec::new();
        let mut classes = Vec::new();
        let mut imports = Vec::new();
        let mut calls = Vec::new();
        let mut caller_stack: Vec<String> = Vec::new();

        walk(
            root,
            content,
            &mut caller_stack,
            &mut functions,
            &mut classes,
            &mut imports,
            &mut calls,
        );

        Ok(ParseResult {
            path: path.to_path_buf(),
            language: Language::Python,
            loc: source_code.lines().count() as u32,
            ast_node_total: count_nodes(root),
            functions,
            classes,
            structs: Vec::new(),
            imports,
            calls,
            typedefs: Vec::new(),
            macros: Vec::new(),
            variables: Vec::new(),
            struct_field_accesses: Vec::new(),
            usages: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser_pool::create_parser_pool;

    fn extractor() -> PythonExtractor {
        PythonExtractor::new(create_parser_pool())
    }

    #[test]
    fn extracts_functions_and_module_level_calls() {
        let code = br#"
def helper():
    return 1

def main():
    helper()
"#;
        let result = extractor().extract(Path::new("a.py"), code).unwrap();
        assert_eq!(result.functions.len(), 2);
        assert!(result.functions.iter().any(|f| f.name == "main"));
        assert!(result.calls.iter().any(|c| c.callee == "helper" && c.caller == "main"));
    }

    #[test]
    fn method_calls_resolve_to_last_attribute_segment() {
        let code = br#"
class U:
    def save(self):
        pass

u = U()
u.save()
"#;
        let result = extractor().extract(Path::new("b.py"), code).unwrap();
        assert!(result.classes.iter().any(|c| c.name == "U" && c.methods == vec!["save".to_string()]));
        assert!(result
            .calls
            .iter()
            .any(|c| c.callee == "save" && c.caller == "<module>"));
    }

    #[test]
    fn docstring_and_signature_are_captured() {
        let code = br#"
def validate_email(address: str) -> bool:
    "validate an email address"
    return "@" in address
"#;
        let result = extractor().extract(Path::new("c.py"), code).unwrap();
        let f = &result.functions[0];
        assert_eq!(f.docstring.as_deref(), Some("validate an email address"));
        assert!(f.signature.contains("validate_email(address) -> bool"));
    }

    #[test]
    fn stdlib_imports_are_filtered() {
        let code = b"import os\nimport requests\n";
        let result = extractor().extract(Path::new("d.py"), code).unwrap();
        assert_eq!(result.imports.len(), 1);
        assert_eq!(result.imports[0].module, "requests");
    }
}
