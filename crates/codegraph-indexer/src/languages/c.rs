//! C extractor (C2). Two passes over the same tree: the first collects
//! declarations (functions, structs/unions/enums, typedefs, macros,
//! variables) and builds an intra-file `identifier -> type` map; the
//! second walks again for call sites, struct field accesses, and usage
//! records, since those need the first pass's declarations to resolve
//! against (field-access type lookup, usage shadowing).

use crate::extractor::{
    LanguageExtractor, ParseResult, ParsedCall, ParsedFieldAccess, ParsedFunction, ParsedImport,
    ParsedMacro, ParsedStruct, ParsedTypedef, ParsedUsage, ParsedVariable, UsageKind,
};
use crate::parser_pool::{FileType, ParseRequest, ParserPool};
use codegraph_core::{AccessType, ImportKind, Language};
use std::collections::HashMap;
use std::path::Path;
use tree_sitter::{Node, Point};

pub struct CExtractor {
    parser_pool: ParserPool,
}

impl CExtractor {
    pub fn new(parser_pool: ParserPool) -> Self {
        Self { parser_pool }
    }
}

fn line(point: Point) -> u32 {
    point.row as u32 + 1
}

fn text<'a>(node: Node, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or_default()
}

fn count_nodes(node: Node) -> u32 {
    let mut total = 1u32;
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        total += count_nodes(child);
    }
    total
}

/// Strips pointer/array/qualifier decoration down to a bare type name,
/// e.g. `const struct Person *` -> `Person`.
fn base_type_name(raw: &str) -> String {
    raw.trim()
        .trim_end_matches('*')
        .trim()
        .replace("const", "")
        .replace("struct", "")
        .replace("union", "")
        .replace("enum", "")
        .trim()
        .to_string()
}

fn declarator_identifier(node: Node) -> Option<Node> {
    match node.kind() {
        "identifier" | "field_identifier" | "type_identifier" => Some(node),
        "pointer_declarator" | "init_declarator" | "array_declarator" | "parenthesized_declarator" => {
            node.child_by_field_name("declarator").and_then(declarator_identifier)
        }
        _ => None,
    }
}

fn find_function_declarator(node: Node) -> Option<Node> {
    match node.kind() {
        "function_declarator" => Some(node),
        "pointer_declarator" => node.child_by_field_name("declarator").and_then(find_function_declarator),
        _ => None,
    }
}

struct Declarations {
    structs: Vec<ParsedStruct>,
    typedefs: Vec<ParsedTypedef>,
    macros: Vec<ParsedMacro>,
    variables: Vec<ParsedVariable>,
    functions: Vec<ParsedFunction>,
    var_types: HashMap<String, String>,
}

fn collect_declarations(node: Node, source: &[u8], func_stack: &mut Vec<String>, out: &mut Declarations) {
    match node.kind() {
        "function_definition" => {
            if let Some(f) = extract_function(node, source, true) {
                let name = f.name.clone();
                out.functions.push(f);
                func_stack.push(name);
                if let Some(body) = node.child_by_field_name("body") {
                    let mut cursor = body.walk();
                    for child in body.children(&mut cursor) {
                        collect_declarations(child, source, func_stack, out);
                    }
                }
                func_stack.pop();
                return;
            }
        }
        "declaration" => {
            if let Some(f) = extract_function(node, source, false) {
                out.functions.push(f);
            } else if let Some(vars) = extract_variables(node, source, func_stack) {
                for v in vars {
                    out.var_types.insert(v.name.clone(), v.var_type.clone().unwrap_or_default());
                    out.variables.push(v);
                }
            }
        }
        "struct_specifier" | "union_specifier" | "enum_specifier" => {
            if let Some(s) = extract_struct(node, source) {
                out.structs.push(s);
            }
        }
        "type_definition" => {
            if let Some(t) = extract_typedef(node, source) {
                out.typedefs.push(t);
            }
        }
        "preproc_def" | "preproc_function_def" => {
            if let Some(m) = extract_macro(node, source) {
                out.macros.push(m);
            }
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_declarations(child, source, func_stack, out);
    }
}

fn extract_parameters(params_node: Node, source: &[u8]) -> Vec<String> {
    let mut cursor = params_node.walk();
    params_node
        .named_children(&mut cursor)
        .filter(|p| p.kind() == "parameter_declaration")
        .filter_map(|p| p.child_by_field_name("declarator").and_then(declarator_identifier))
        .map(|n| text(n, source).to_string())
        .collect()
}

fn extract_function(node: Node, source: &[u8], is_definition: bool) -> Option<ParsedFunction> {
    let declarator = node.child_by_field_name("declarator")?;
    let fn_declarator = find_function_declarator(declarator)?;
    let name_node = fn_declarator
        .child_by_field_name("declarator")
        .and_then(declarator_identifier)?;
    let name = text(name_node, source).to_string();
    let parameters = fn_declarator
        .child_by_field_name("parameters")
        .map(|p| extract_parameters(p, source))
        .unwrap_or_default();
    let return_type = node
        .child_by_field_name("type")
        .map(|n| base_type_name(text(n, source)));
    let signature = format!(
        "{} {}({})",
        return_type.clone().unwrap_or_else(|| "void".to_string()),
        name,
        parameters.join(", ")
    );

    Some(ParsedFunction {
        name,
        line: line(node.start_position()),
        column: node.start_position().column as u32,
        end_line: line(node.end_position()),
        parameters,
        return_type,
        docstring: None,
        signature,
        is_definition,
    })
}

fn extract_struct(node: Node, source: &[u8]) -> Option<ParsedStruct> {
    let name_node = node.child_by_field_name("name")?;
    let name = text(name_node, source).to_string();
    let body = node.child_by_field_name("body")?;

    let fields = if node.kind() == "enum_specifier" {
        let mut cursor = body.walk();
        body.named_children(&mut cursor)
            .filter(|c| c.kind() == "enumerator")
            .filter_map(|c| c.child_by_field_name("name"))
            .map(|n| text(n, source).to_string())
            .collect()
    } else {
        let mut cursor = body.walk();
        body.named_children(&mut cursor)
            .filter(|c| c.kind() == "field_declaration")
            .filter_map(|c| c.child_by_field_name("declarator"))
            .filter_map(declarator_identifier)
            .map(|n| text(n, source).to_string())
            .collect()
    };

    Some(ParsedStruct {
        name,
        line: line(node.start_position()),
        column: node.start_position().column as u32,
        fields,
    })
}

/// Only bare `typedef <type> <alias>;` aliases are kept: function-pointer,
/// array, and inline (has-a-body) struct/union/enum typedefs are skipped.
/// A named-only reference like `typedef struct Person PersonT;` is kept,
/// with `underlying_type` left unstripped (`"struct Person"`) so the graph
/// builder's field-access resolution can pattern-match on it.
fn extract_typedef(node: Node, source: &[u8]) -> Option<ParsedTypedef> {
    let type_node = node.child_by_field_name("type")?;
    let is_tagged = matches!(
        type_node.kind(),
        "struct_specifier" | "union_specifier" | "enum_specifier"
    );
    if is_tagged && type_node.child_by_field_name("body").is_some() {
        return None;
    }
    let declarator = node.child_by_field_name("declarator")?;
    if declarator.kind() != "type_identifier" && declarator.kind() != "identifier" {
        return None;
    }

    let underlying_type = if is_tagged {
        text(type_node, source).trim().to_string()
    } else {
        base_type_name(text(type_node, source))
    };

    Some(ParsedTypedef {
        name: text(declarator, source).to_string(),
        line: line(node.start_position()),
        column: node.start_position().column as u32,
        underlying_type,
    })
}

fn extract_macro(node: Node, source: &[u8]) -> Option<ParsedMacro> {
    let name_node = node.child_by_field_name("name")?;
    let name = text(name_node, source).to_string();
    let value = node
        .child_by_field_name("value")
        .map(|n| text(n, source).trim().to_string())
        .filter(|v| !v.is_empty());
    let parameters = node
        .child_by_field_name("parameters")
        .map(|params| {
            let mut cursor = params.walk();
            params
                .named_children(&mut cursor)
                .filter(|c| c.kind() == "identifier")
                .map(|c| text(c, source).to_string())
                .collect()
        })
        .unwrap_or_default();

    Some(ParsedMacro {
        name,
        line: line(node.start_position()),
        column: node.start_position().column as u32,
        value,
        parameters,
    })
}

fn extract_variables(node: Node, source: &[u8], func_stack: &[String]) -> Option<Vec<ParsedVariable>> {
    let type_node = node.child_by_field_name("type")?;
    if matches!(
        type_node.kind(),
        "struct_specifier" | "union_specifier" | "enum_specifier"
    ) {
        return None;
    }
    let var_type = base_type_name(text(type_node, source));
    let mut cursor = node.walk();
    let storage_class = node
        .children(&mut cursor)
        .find(|c| c.kind() == "storage_class_specifier")
        .map(|n| text(n, source).to_string());

    let mut cursor = node.walk();
    let declarators: Vec<Node> = node
        .children(&mut cursor)
        .filter(|c| {
            matches!(
                c.kind(),
                "init_declarator" | "identifier" | "pointer_declarator" | "array_declarator"
            )
        })
        .collect();

    let is_global = func_stack.is_empty();
    let containing_function = func_stack.last().cloned();

    let vars: Vec<_> = declarators
        .into_iter()
        .filter_map(declarator_identifier)
        .map(|id_node| ParsedVariable {
            name: text(id_node, source).to_string(),
            line: line(node.start_position()),
            column: node.start_position().column as u32,
            var_type: Some(var_type.clone()),
            storage_class: storage_class.clone(),
            is_global,
            containing_function: containing_function.clone(),
        })
        .collect();

    if vars.is_empty() {
        None
    } else {
        Some(vars)
    }
}

fn resolve_struct_name(object: Node, source: &[u8], var_types: &HashMap<String, String>) -> String {
    match object.kind() {
        "identifier" => {
            let name = text(object, source);
            var_types.get(name).cloned().unwrap_or_else(|| name.to_string())
        }
        "field_expression" => object
            .child_by_field_name("field")
            .map(|f| text(f, source).to_string())
            .unwrap_or_else(|| text(object, source).to_string()),
        _ => text(object, source).to_string(),
    }
}

struct KnownNames {
    macros: std::collections::HashSet<String>,
    typedefs: std::collections::HashSet<String>,
    variables_local: HashMap<String, Option<String>>,
    variables_global: std::collections::HashSet<String>,
}

fn walk_calls_and_usages(
    node: Node,
    source: &[u8],
    func_stack: &mut Vec<String>,
    var_types: &HashMap<String, String>,
    known: &KnownNames,
    calls: &mut Vec<ParsedCall>,
    field_accesses: &mut Vec<ParsedFieldAccess>,
    usages: &mut Vec<ParsedUsage>,
) {
    match node.kind() {
        "function_definition" => {
            if let Some(declarator) = node.child_by_field_name("declarator") {
                if let Some(fn_declarator) = find_function_declarator(declarator) {
                    if let Some(name_node) = fn_declarator
                        .child_by_field_name("declarator")
                        .and_then(declarator_identifier)
                    {
                        func_stack.push(text(name_node, source).to_string());
                        if let Some(body) = node.child_by_field_name("body") {
                            let mut cursor = body.walk();
                            for child in body.children(&mut cursor) {
                                walk_calls_and_usages(
                                    child, source, func_stack, var_types, known, calls, field_accesses, usages,
                                );
                            }
                        }
                        func_stack.pop();
                        return;
                    }
                }
            }
        }
        "call_expression" => {
            if let Some(function_node) = node.child_by_field_name("function") {
                let callee = match function_node.kind() {
                    "identifier" => Some(text(function_node, source).to_string()),
                    "field_expression" => function_node
                        .child_by_field_name("field")
                        .map(|f| text(f, source).to_string()),
                    _ => None,
                };
                if let Some(callee) = callee {
                    let caller = func_stack.last().cloned().unwrap_or_else(|| "<module>".to_string());
                    calls.push(ParsedCall {
                        caller,
                        callee,
                        line: line(node.start_position()),
                    });
                }
            }
        }
        "field_expression" => {
            let is_call_target = node
                .parent()
                .map(|p| p.kind() == "call_expression" && p.child_by_field_name("function") == Some(node))
                .unwrap_or(false);
            if !is_call_target {
                if let (Some(object), Some(field)) = (
                    node.child_by_field_name("argument"),
                    node.child_by_field_name("field"),
                ) {
                    let access_type = if text(node, source).contains("->") {
                        AccessType::Pointer
                    } else {
                        AccessType::Direct
                    };
                    field_accesses.push(ParsedFieldAccess {
                        struct_name: resolve_struct_name(object, source, var_types),
                        field_name: text(field, source).to_string(),
                        line: line(node.start_position()),
                        column: node.start_position().column as u32,
                        access_type,
                    });
                }
            }
        }
        "identifier" => {
            let name = text(node, source);
            let current_fn = func_stack.last().cloned();
            let shadowed_by_local = known
                .variables_local
                .get(name)
                .map(|owner| owner == &current_fn)
                .unwrap_or(false);
            if known.macros.contains(name) {
                usages.push(ParsedUsage {
                    kind: UsageKind::Macro,
                    name: name.to_string(),
                    line: line(node.start_position()),
                    containing_function: current_fn.clone(),
                });
            } else if shadowed_by_local || known.variables_global.contains(name) {
                usages.push(ParsedUsage {
                    kind: UsageKind::Variable,
                    name: name.to_string(),
                    line: line(node.start_position()),
                    containing_function: current_fn.clone(),
                });
            }
        }
        "type_identifier" => {
            let name = text(node, source);
            if known.typedefs.contains(name) {
                usages.push(ParsedUsage {
                    kind: UsageKind::Typedef,
                    name: name.to_string(),
                    line: line(node.start_position()),
                    containing_function: func_stack.last().cloned(),
                });
            }
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk_calls_and_usages(child, source, func_stack, var_types, known, calls, field_accesses, usages);
    }
}

/// `#include <x>` includes are dropped entirely (equivalent to stdlib
/// filtering for Python); `#include "x"` includes survive as local imports.
fn collect_includes(node: Node, source: &[u8]) -> Vec<ParsedImport> {
    let mut out = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "preproc_include" {
            if let Some(path_node) = child.child_by_field_name("path") {
                match path_node.kind() {
                    "string_literal" => {
                        let header = text(path_node, source).trim_matches('"').to_string();
                        out.push(ParsedImport {
                            module: header,
                            line: line(child.start_position()),
                            text: text(child, source).to_string(),
                            imported_items: Vec::new(),
                            alias: None,
                            kind: ImportKind::Local,
                        });
                    }
                    "system_lib_string" => {}
                    _ => {}
                }
            }
        }
        out.extend(collect_includes(child, source));
    }
    out
}

impl LanguageExtractor for CExtractor {
    fn extract(&self, path: &Path, content: &[u8]) -> anyhow::Result<ParseResult> {
        if content.is_empty() {
            return Ok(ParseResult::empty(path.to_path_buf(), Language::C));
        }
        let source_code = std::str::from_utf8(content)?;

        let parsed = self.parser_pool.parse_blocking(ParseRequest {
            file_type: FileType::C,
            content: source_code.to_string(),
            path: path.to_path_buf(),
        })?;

        let root = parsed.tree.root_node();
        let mut decls = Declarations {
            structs: Vec::new(),
            typedefs: Vec::new(),
            macros: Vec::new(),
            variables: Vec::new(),
            functions: Vec::new(),
            var_types: HashMap::new(),
        };
        let mut func_stack = Vec::new();
        collect_declarations(root, content, &mut func_stack, &mut decls);

        let known = KnownNames {
            macros: decls.macros.iter().map(|m| m.name.clone()).collect(),
            typedefs: decls.typedefs.iter().map(|t| t.name.clone()).collect(),
            variables_local: decls
                .variables
                .iter()
                .filter(|v| !v.is_global)
                .map(|v| (v.name.clone(), v.containing_function.clone()))
                .collect(),
            variables_global: decls
                .variables
                .iter()
                .filter(|v| v.is_global)
                .map(|v| v.name.clone())
                .collect(),
        };

        let mut calls = Vec::new();
        let mut struct_field_accesses = Vec::new();
        let mut usages = Vec::new();
        let mut func_stack = Vec::new();
        walk_calls_and_usages(
            root,
            content,
            &mut func_stack,
            &decls.var_types,
            &known,
            &mut calls,
            &mut struct_field_accesses,
            &mut usages,
        );

        Ok(ParseResult {
            path: path.to_path_buf(),
            language: Language::C,
            loc: source_code.lines().count() as u32,
            ast_node_total: count_nodes(root),
            functions: decls.functions,
            classes: Vec::new(),
            structs: decls.structs,
            imports: collect_includes(root, content),
            calls,
            typedefs: decls.typedefs,
            macros: decls.macros,
            variables: decls.variables,
            struct_field_accesses,
            usages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser_pool::create_parser_pool;

    fn extractor() -> CExtractor {
        CExtractor::new(create_parser_pool())
    }

    #[test]
    fn extracts_function_definition_and_call() {
        let code = br#"
int add(int a, int b) {
    return a + b;
}

int main() {
    return add(1, 2);
}
"#;
        let result = extractor().extract(Path::new("a.c"), code).unwrap();
        assert!(result.functions.iter().any(|f| f.name == "add" && f.is_definition));
        assert!(result.calls.iter().any(|c| c.callee == "add" && c.caller == "main"));
    }

    #[test]
    fn struct_and_field_access_are_captured() {
        let code = br#"
struct Person {
    char *name;
    int age;
};

void greet(struct Person *p) {
    int a = p->age;
}
"#;
        let result = extractor().extract(Path::new("b.c"), code).unwrap();
        assert!(result
            .structs
            .iter()
            .any(|s| s.name == "Person" && s.fields.contains(&"name".to_string())));
        assert!(result
            .struct_field_accesses
            .iter()
            .any(|fa| fa.field_name == "age" && fa.access_type == AccessType::Pointer));
    }

    #[test]
    fn simple_typedef_alias_is_kept_but_struct_typedef_is_not() {
        let code = br#"
typedef unsigned long size_t_alias;
typedef struct { int x; } Point;
"#;
        let result = extractor().extract(Path::new("c.c"), code).unwrap();
        assert!(result.typedefs.iter().any(|t| t.name == "size_t_alias"));
        assert!(!result.typedefs.iter().any(|t| t.name == "Point"));
    }

    #[test]
    fn named_struct_reference_typedef_keeps_struct_tag_in_underlying_type() {
        let code = br#"
struct Person { char *name; };
typedef struct Person PersonT;
"#;
        let result = extractor().extract(Path::new("f.c"), code).unwrap();
        let t = result.typedefs.iter().find(|t| t.name == "PersonT").unwrap();
        assert!(t.underlying_type.contains("struct Person"));
    }

    #[test]
    fn macro_with_parameters_is_extracted() {
        let code = b"#define MAX(a, b) ((a) > (b) ? (a) : (b))\n";
        let result = extractor().extract(Path::new("d.c"), code).unwrap();
        let m = &result.macros[0];
        assert_eq!(m.name, "MAX");
        assert_eq!(m.parameters, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn system_includes_are_dropped_local_includes_kept() {
        let code = b"#include <stdio.h>\n#include \"myheader.h\"\n";
        let result = extractor().extract(Path::new("e.c"), code).unwrap();
        assert_eq!(result.imports.len(), 1);
        assert_eq!(result.imports[0].module, "myheader.h");
    }
}
