//! Graph builder (C4). Folds a batch of `ParseResult`s plus the C3 cross-file
//! index into a `Graph` of typed nodes and explicit (forward + inverse)
//! edges. Node IDs are content-addressed (§3), so unlike a store-assigned-ID
//! design this component resolves relationship endpoints directly to their
//! final `NodeId` rather than deferring to a later ID-rewrite pass.

use crate::extractor::ParseResult;
use crate::resolver::CrossFileIndex;
use codegraph_core::{EdgeKind, GraphEdge, GraphNode, NodeData, NodeId, NodeKind};
use codegraph_core::graph::Graph;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The reserved function name representing file-level (non-function) call
/// sites; exists once per file, at line 1 (§3 invariant 6).
pub const MODULE_FUNCTION: &str = "<module>";

pub fn build_graph(parse_results: &[ParseResult], index: &CrossFileIndex) -> Graph {
    let mut graph = Graph::new();

    let structs_by_name = index_structs(parse_results);
    let classes_by_file: HashMap<&PathBuf, &[crate::extractor::ParsedClass]> =
        parse_results.iter().map(|r| (&r.path, r.classes.as_slice())).collect();
    let typedefs_by_name = index_typedefs(parse_results);

    for result in parse_results {
        add_file_and_module_fn(&mut graph, result);
        add_functions(&mut graph, result, &classes_by_file);
        add_classes(&mut graph, result);
        add_structs(&mut graph, result);
        add_imports(&mut graph, result);
        add_macros(&mut graph, result);
        add_typedefs(&mut graph, result);
        add_variables(&mut graph, result);
        add_struct_field_accesses(&mut graph, result, &structs_by_name, &typedefs_by_name);
    }

    for result in parse_results {
        add_calls(&mut graph, result, index);
        add_inherits(&mut graph, result, parse_results);
        add_variable_usages(&mut graph, result);
    }

    graph
}

fn insert_with_inverse(graph: &mut Graph, edge: GraphEdge) {
    let inverse = edge.inverse();
    graph.add_edge(edge);
    if let Some(inverse) = inverse {
        graph.add_edge(inverse);
    }
}

fn add_file_and_module_fn(graph: &mut Graph, result: &ParseResult) {
    let file_id = NodeId::file(&result.path);
    graph.add_node(GraphNode {
        id: file_id.clone(),
        kind: NodeKind::File,
        name: result.path.to_string_lossy().to_string(),
        file_path: result.path.clone(),
        language: Some(result.language),
        data: NodeData::File {
            functions_count: result.functions.len() as u32,
            classes_count: result.classes.len() as u32,
            structs_count: result.structs.len() as u32,
            imports_count: result.imports.len() as u32,
            ast_node_total: result.ast_node_total,
        },
    });

    let module_fn_id = NodeId::function(MODULE_FUNCTION, &result.path);
    graph.add_node(GraphNode {
        id: module_fn_id.clone(),
        kind: NodeKind::Function,
        name: MODULE_FUNCTION.to_string(),
        file_path: result.path.clone(),
        language: Some(result.language),
        data: NodeData::Function {
            line: 1,
            column: 0,
            signature: None,
            parameters: Vec::new(),
            return_type: None,
            docstring: None,
            embedding: None,
            belongs_to_class: None,
        },
    });
    insert_with_inverse(graph, GraphEdge::structural(file_id, module_fn_id, EdgeKind::Contains));
}

/// A function belongs to class C iff its start line falls inside C's line
/// range in the same file and its name appears in C's method list.
fn classify_owner<'a>(
    func_line: u32,
    classes: &'a [crate::extractor::ParsedClass],
    func_name: &str,
) -> Option<&'a crate::extractor::ParsedClass> {
    classes
        .iter()
        .find(|c| func_line >= c.line && func_line <= c.end_line && c.methods.iter().any(|m| m == func_name))
}

fn add_functions(
    graph: &mut Graph,
    result: &ParseResult,
    classes_by_file: &HashMap<&PathBuf, &[crate::extractor::ParsedClass]>,
) {
    let file_id = NodeId::file(&result.path);
    let classes = classes_by_file.get(&result.path).copied().unwrap_or(&[]);

    for function in &result.functions {
        let owner = classify_owner(function.line, classes, &function.name);
        let fn_id = NodeId::function(&function.name, &result.path);

        graph.add_node(GraphNode {
            id: fn_id.clone(),
            kind: NodeKind::Function,
            name: function.name.clone(),
            file_path: result.path.clone(),
            language: Some(result.language),
            data: NodeData::Function {
                line: function.line,
                column: function.column,
                signature: Some(function.signature.clone()),
                parameters: function.parameters.clone(),
                return_type: function.return_type.clone(),
                docstring: function.docstring.clone(),
                embedding: None,
                belongs_to_class: owner.map(|c| c.name.clone()),
            },
        });
        insert_with_inverse(graph, GraphEdge::structural(file_id.clone(), fn_id.clone(), EdgeKind::Contains));

        if let Some(owner) = owner {
            let class_id = NodeId::class(&owner.name, &result.path);
            insert_with_inverse(graph, GraphEdge::structural(class_id, fn_id, EdgeKind::ContainsMethod));
        }
    }
}

fn add_classes(graph: &mut Graph, result: &ParseResult) {
    let file_id = NodeId::file(&result.path);
    for class in &result.classes {
        let class_id = NodeId::class(&class.name, &result.path);
        graph.add_node(GraphNode {
            id: class_id.clone(),
            kind: NodeKind::Class,
            name: class.name.clone(),
            file_path: result.path.clone(),
            language: Some(result.language),
            data: NodeData::Class {
                line: class.line,
                column: class.column,
                methods: class.methods.clone(),
                base_classes: class.base_classes.clone(),
                embedding: None,
            },
        });
        insert_with_inverse(graph, GraphEdge::structural(file_id.clone(), class_id, EdgeKind::Contains));
    }
}

fn add_structs(graph: &mut Graph, result: &ParseResult) {
    let file_id = NodeId::file(&result.path);
    for strukt in &result.structs {
        let struct_id = NodeId::strukt(&strukt.name, &result.path, strukt.line);
        graph.add_node(GraphNode {
            id: struct_id.clone(),
            kind: NodeKind::Struct,
            name: strukt.name.clone(),
            file_path: result.path.clone(),
            language: Some(result.language),
            data: NodeData::Struct {
                line: strukt.line,
                column: strukt.column,
                fields: strukt.fields.clone(),
                embedding: None,
            },
        });
        insert_with_inverse(graph, GraphEdge::structural(file_id.clone(), struct_id, EdgeKind::Contains));
    }
}

fn add_imports(graph: &mut Graph, result: &ParseResult) {
    let file_id = NodeId::file(&result.path);
    for import in &result.imports {
        let import_id = NodeId::import(&import.module, &result.path, import.line);
        graph.add_node(GraphNode {
            id: import_id.clone(),
            kind: NodeKind::Import,
            name: import.module.clone(),
            file_path: result.path.clone(),
            language: Some(result.language),
            data: NodeData::Import {
                line: import.line,
                text: Some(import.text.clone()),
                imported_items: import.imported_items.clone(),
                alias: import.alias.clone(),
                kind: import.kind,
            },
        });
        insert_with_inverse(graph, GraphEdge::structural(file_id.clone(), import_id, EdgeKind::Contains));
    }
}

fn add_macros(graph: &mut Graph, result: &ParseResult) {
    let file_id = NodeId::file(&result.path);
    for macro_def in &result.macros {
        let macro_id = NodeId::macro_def(&macro_def.name, &result.path, macro_def.line);
        graph.add_node(GraphNode {
            id: macro_id.clone(),
            kind: NodeKind::Macro,
            name: macro_def.name.clone(),
            file_path: result.path.clone(),
            language: Some(result.language),
            data: NodeData::Macro {
                line: macro_def.line,
                column: macro_def.column,
                value: macro_def.value.clone(),
                parameters: macro_def.parameters.clone(),
            },
        });
        insert_with_inverse(graph, GraphEdge::structural(file_id.clone(), macro_id.clone(), EdgeKind::Contains));
        insert_with_inverse(graph, GraphEdge::structural(file_id.clone(), macro_id, EdgeKind::Uses));
    }
}

fn add_typedefs(graph: &mut Graph, result: &ParseResult) {
    let file_id = NodeId::file(&result.path);
    for typedef in &result.typedefs {
        let typedef_id = NodeId::typedef(&typedef.name, &result.path, typedef.line);
        graph.add_node(GraphNode {
            id: typedef_id.clone(),
            kind: NodeKind::Typedef,
            name: typedef.name.clone(),
            file_path: result.path.clone(),
            language: Some(result.language),
            data: NodeData::Typedef {
                line: typedef.line,
                column: typedef.column,
                underlying_type: Some(typedef.underlying_type.clone()),
            },
        });
        insert_with_inverse(graph, GraphEdge::structural(file_id.clone(), typedef_id.clone(), EdgeKind::Contains));
        insert_with_inverse(graph, GraphEdge::structural(file_id.clone(), typedef_id, EdgeKind::Uses));
    }
}

fn add_variables(graph: &mut Graph, result: &ParseResult) {
    let file_id = NodeId::file(&result.path);
    for variable in &result.variables {
        let var_id = NodeId::variable(&variable.name, &result.path, variable.line);
        graph.add_node(GraphNode {
            id: var_id.clone(),
            kind: NodeKind::Variable,
            name: variable.name.clone(),
            file_path: result.path.clone(),
            language: Some(result.language),
            data: NodeData::Variable {
                line: variable.line,
                column: variable.column,
                var_type: variable.var_type.clone(),
                storage_class: variable.storage_class.clone(),
                is_global: variable.is_global,
                containing_function: variable.containing_function.clone(),
            },
        });
        insert_with_inverse(graph, GraphEdge::structural(file_id.clone(), var_id, EdgeKind::Contains));
    }
}

type StructIndex = HashMap<String, Vec<(PathBuf, u32)>>;
type TypedefIndex = HashMap<String, Vec<(PathBuf, String)>>;

fn index_structs(parse_results: &[ParseResult]) -> StructIndex {
    let mut out: StructIndex = HashMap::new();
    for result in parse_results {
        for strukt in &result.structs {
            out.entry(strukt.name.clone()).or_default().push((result.path.clone(), strukt.line));
        }
    }
    out
}

fn index_typedefs(parse_results: &[ParseResult]) -> TypedefIndex {
    let mut out: TypedefIndex = HashMap::new();
    for result in parse_results {
        for typedef in &result.typedefs {
            out.entry(typedef.name.clone())
                .or_default()
                .push((result.path.clone(), typedef.underlying_type.clone()));
        }
    }
    out
}

/// §4.4.4: same-file struct match; else cross-file name match; else via a
/// typedef whose underlying type text contains `struct <Name>`, retried
/// under that extracted name.
fn resolve_struct_access_target(
    struct_name: &str,
    file: &Path,
    structs: &StructIndex,
    typedefs: &TypedefIndex,
) -> Option<(String, PathBuf)> {
    if let Some(candidates) = structs.get(struct_name) {
        if let Some((path, _)) = candidates.iter().find(|(path, _)| path == file) {
            return Some((struct_name.to_string(), path.clone()));
        }
        if let Some((path, _)) = candidates.first() {
            return Some((struct_name.to_string(), path.clone()));
        }
    }

    let typedef_candidates = typedefs.get(struct_name)?;
    let (_, underlying) = typedef_candidates
        .iter()
        .find(|(path, _)| path == file)
        .or_else(|| typedef_candidates.first())?;

    let retried_name = underlying
        .split_once("struct")
        .or_else(|| underlying.split_once("union"))
        .map(|(_, rest)| rest.trim().to_string())?;

    let candidates = structs.get(&retried_name)?;
    candidates
        .iter()
        .find(|(path, _)| path == file)
        .or_else(|| candidates.first())
        .map(|(path, _)| (retried_name.clone(), path.clone()))
}

fn add_struct_field_accesses(
    graph: &mut Graph,
    result: &ParseResult,
    structs: &StructIndex,
    typedefs: &TypedefIndex,
) {
    let file_id = NodeId::file(&result.path);
    for access in &result.struct_field_accesses {
        let access_id =
            NodeId::struct_field_access(&access.struct_name, &access.field_name, &result.path, access.line);
        let resolved = resolve_struct_access_target(&access.struct_name, &result.path, structs, typedefs);

        graph.add_node(GraphNode {
            id: access_id.clone(),
            kind: NodeKind::StructFieldAccess,
            name: format!("{}.{}", access.struct_name, access.field_name),
            file_path: result.path.clone(),
            language: Some(result.language),
            data: NodeData::StructFieldAccess {
                line: access.line,
                column: access.column,
                access_type: access.access_type,
                resolved_struct_file: resolved.as_ref().map(|(_, path)| path.clone()),
            },
        });
        insert_with_inverse(graph, GraphEdge::structural(file_id.clone(), access_id.clone(), EdgeKind::Contains));

        if let Some((name, path)) = resolved {
            if let Some(candidates) = structs.get(&name) {
                if let Some((struct_file, struct_line)) = candidates.iter().find(|(p, _)| *p == path) {
                    let struct_id = NodeId::strukt(&name, struct_file, *struct_line);
                    insert_with_inverse(graph, GraphEdge::structural(access_id, struct_id, EdgeKind::Accesses));
                }
            }
        }
    }
}

fn add_calls(graph: &mut Graph, result: &ParseResult, index: &CrossFileIndex) {
    for call in &result.calls {
        let caller_id = NodeId::function(&call.caller, &result.path);
        if let Some(target) = index.resolve_call(&result.path, &call.callee) {
            let callee_id = NodeId::function(&call.callee, &target.file);
            if graph.contains(&caller_id) && graph.contains(&callee_id) {
                insert_with_inverse(graph, GraphEdge::structural(caller_id, callee_id, EdgeKind::Calls));
            }
        }
    }
}

fn add_inherits(graph: &mut Graph, result: &ParseResult, all: &[ParseResult]) {
    for class in &result.classes {
        let class_id = NodeId::class(&class.name, &result.path);
        for base in &class.base_classes {
            let base_owner = all
                .iter()
                .find(|r| r.path == result.path && r.classes.iter().any(|c| &c.name == base))
                .or_else(|| all.iter().find(|r| r.classes.iter().any(|c| &c.name == base)));
            if let Some(owner) = base_owner {
                let base_id = NodeId::class(base, &owner.path);
                if graph.contains(&class_id) && graph.contains(&base_id) {
                    insert_with_inverse(graph, GraphEdge::structural(class_id.clone(), base_id, EdgeKind::Inherits));
                }
            }
        }
    }
}

/// Function uses Variable, honoring the shadowing rule: a variable usage
/// inside function F resolves to F's own local of that name if one exists,
/// else to a global of that name.
fn add_variable_usages(graph: &mut Graph, result: &ParseResult) {
    use crate::extractor::UsageKind;

    let locals_by_fn: HashMap<(&str, &str), u32> = result
        .variables
        .iter()
        .filter(|v| !v.is_global)
        .filter_map(|v| v.containing_function.as_deref().map(|f| ((f, v.name.as_str()), v.line)))
        .collect();
    let globals: HashMap<&str, u32> = result
        .variables
        .iter()
        .filter(|v| v.is_global)
        .map(|v| (v.name.as_str(), v.line))
        .collect();

    for usage in result.usages.iter().filter(|u| u.kind == UsageKind::Variable) {
        let caller_name = usage.containing_function.as_deref().unwrap_or(MODULE_FUNCTION);
        let caller_id = NodeId::function(caller_name, &result.path);

        let resolved_line = locals_by_fn
            .get(&(caller_name, usage.name.as_str()))
            .or_else(|| globals.get(usage.name.as_str()));

        if let Some(&line) = resolved_line {
            let var_id = NodeId::variable(&usage.name, &result.path, line);
            if graph.contains(&caller_id) && graph.contains(&var_id) {
                insert_with_inverse(graph, GraphEdge::structural(caller_id, var_id, EdgeKind::Uses));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{ParsedCall, ParsedClass, ParsedFunction};
    use codegraph_core::Language;

    #[test]
    fn module_function_exists_per_file_and_owns_top_level_calls() {
        let mut result = ParseResult::empty(PathBuf::from("a.py"), Language::Python);
        result.functions.push(ParsedFunction {
            name: "helper".into(),
            line: 2,
            column: 0,
            end_line: 3,
            parameters: Vec::new(),
            return_type: None,
            docstring: None,
            signature: "helper()".into(),
            is_definition: true,
        });
        result.calls.push(ParsedCall { caller: MODULE_FUNCTION.into(), callee: "helper".into(), line: 5 });

        let index = CrossFileIndex::build(std::slice::from_ref(&result));
        let graph = build_graph(std::slice::from_ref(&result), &index);

        let module_id = NodeId::function(MODULE_FUNCTION, Path::new("a.py"));
        assert!(graph.contains(&module_id));
        let helper_id = NodeId::function("helper", Path::new("a.py"));
        assert!(graph.has_edge_between(&module_id, &helper_id, EdgeKind::Calls));
        assert!(graph.has_edge_between(&helper_id, &module_id, EdgeKind::CalledBy));
    }

    #[test]
    fn method_is_classified_by_line_range_and_name() {
        let mut result = ParseResult::empty(PathBuf::from("a.py"), Language::Python);
        result.classes.push(ParsedClass {
            name: "Widget".into(),
            line: 1,
            end_line: 10,
            column: 0,
            base_classes: Vec::new(),
            methods: vec!["render".into()],
        });
        result.functions.push(ParsedFunction {
            name: "render".into(),
            line: 2,
            column: 4,
            end_line: 4,
            parameters: Vec::new(),
            return_type: None,
            docstring: None,
            signature: "render()".into(),
            is_definition: true,
        });

        let index = CrossFileIndex::build(std::slice::from_ref(&result));
        let graph = build_graph(std::slice::from_ref(&result), &index);

        let class_id = NodeId::class("Widget", Path::new("a.py"));
        let fn_id = NodeId::function("render", Path::new("a.py"));
        assert!(graph.has_edge_between(&class_id, &fn_id, EdgeKind::ContainsMethod));
        assert!(graph.has_edge_between(&fn_id, &class_id, EdgeKind::BelongsToClass));
    }
}
