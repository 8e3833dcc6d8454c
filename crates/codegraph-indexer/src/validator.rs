//! Node validator / shaper (C5). Typed per-kind factories that reject
//! incomplete nodes outright (never a silently-inserted partial), normalize
//! optional list fields, and serialize to the store-wire shape with
//! fully-qualified `<Kind>.<field>` predicate names plus a `dgraph.type` tag.

use codegraph_core::{GraphNode, NodeData, NodeKind};
use serde_json::{json, Map, Value};
use std::path::PathBuf;

#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid {kind:?} node {identifier:?} in {file:?}: {reason}")]
pub struct ValidationError {
    pub kind: NodeKind,
    pub identifier: String,
    pub file: PathBuf,
    pub reason: String,
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn normalize_list(items: &[String]) -> Vec<String> {
    items.iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
}

fn reject(node: &GraphNode, reason: impl Into<String>) -> ValidationError {
    ValidationError {
        kind: node.kind,
        identifier: node.name.clone(),
        file: node.file_path.clone(),
        reason: reason.into(),
    }
}

/// Validates a node and serializes it to the wire shape, or rejects it with
/// a structured error naming the offending kind/identifier/file.
pub fn validate_and_shape(node: &GraphNode) -> Result<Value, ValidationError> {
    let type_name = node.kind.type_name();
    let file = non_empty(&node.file_path.to_string_lossy())
        .ok_or_else(|| reject(node, "file path is empty"))?
        .to_string();

    let mut fields = Map::new();
    fields.insert("dgraph.type".to_string(), json!(type_name));
    fields.insert(format!("{type_name}.file"), json!(file));

    match &node.data {
        NodeData::File {
            functions_count,
            classes_count,
            structs_count,
            imports_count,
            ast_node_total,
        } => {
            non_empty(&node.name).ok_or_else(|| reject(node, "path is empty"))?;
            fields.insert("File.path".into(), json!(node.name));
            fields.insert("File.functionsCount".into(), json!(functions_count));
            fields.insert("File.classesCount".into(), json!(classes_count));
            fields.insert("File.structsCount".into(), json!(structs_count));
            fields.insert("File.importsCount".into(), json!(imports_count));
            fields.insert("File.astNodeTotal".into(), json!(ast_node_total));
        }
        NodeData::Function {
            line,
            column,
            signature,
            parameters,
            return_type,
            docstring,
            embedding,
            belongs_to_class,
        } => {
            let name = non_empty(&node.name).ok_or_else(|| reject(node, "name is empty"))?;
            fields.insert("Function.name".into(), json!(name));
            fields.insert("Function.line".into(), json!(line));
            fields.insert("Function.column".into(), json!(column));
            fields.insert("Function.parameters".into(), json!(normalize_list(parameters)));
            insert_opt(&mut fields, "Function.signature", signature);
            insert_opt(&mut fields, "Function.returnType", return_type);
            insert_opt(&mut fields, "Function.docstring", docstring);
            insert_opt(&mut fields, "Function.belongsToClass", belongs_to_class);
            insert_embedding(&mut fields, "Function.embedding", embedding);
        }
        NodeData::Class { line, column, methods, base_classes, embedding } => {
            let name = non_empty(&node.name).ok_or_else(|| reject(node, "name is empty"))?;
            fields.insert("Class.name".into(), json!(name));
            fields.insert("Class.line".into(), json!(line));
            fields.insert("Class.column".into(), json!(column));
            fields.insert("Class.methods".into(), json!(normalize_list(methods)));
            fields.insert("Class.baseClasses".into(), json!(normalize_list(base_classes)));
            insert_embedding(&mut fields, "Class.embedding", embedding);
        }
        NodeData::Struct { line, column, fields: field_names, embedding } => {
            let name = non_empty(&node.name).ok_or_else(|| reject(node, "name is empty"))?;
            fields.insert("Struct.name".into(), json!(name));
            fields.insert("Struct.line".into(), json!(line));
            fields.insert("Struct.column".into(), json!(column));
            fields.insert("Struct.fields".into(), json!(normalize_list(field_names)));
            insert_embedding(&mut fields, "Struct.embedding", embedding);
        }
        NodeData::Import { line, text, imported_items, alias, kind } => {
            let module = non_empty(&node.name)
                .map(|s| s.to_string())
                .or_else(|| text.as_deref().and_then(non_empty).map(|s| s.to_string()))
                .ok_or_else(|| reject(node, "module is missing and no fallback text is present"))?;
            fields.insert("Import.module".into(), json!(module));
            fields.insert("Import.line".into(), json!(line));
            fields.insert("Import.importedItems".into(), json!(normalize_list(imported_items)));
            fields.insert(
                "Import.kind".into(),
                json!(match kind {
                    codegraph_core::ImportKind::System => "system",
                    codegraph_core::ImportKind::Local => "local",
                }),
            );
            insert_opt(&mut fields, "Import.text", text);
            insert_opt(&mut fields, "Import.alias", alias);
        }
        NodeData::Macro { line, column, value, parameters } => {
            let name = non_empty(&node.name).ok_or_else(|| reject(node, "name is empty"))?;
            fields.insert("Macro.name".into(), json!(name));
            fields.insert("Macro.line".into(), json!(line));
            fields.insert("Macro.column".into(), json!(column));
            fields.insert("Macro.parameters".into(), json!(normalize_list(parameters)));
            insert_opt(&mut fields, "Macro.value", value);
        }
        NodeData::Variable { line, column, var_type, storage_class, is_global, containing_function } => {
            let name = non_empty(&node.name).ok_or_else(|| reject(node, "name is empty"))?;
            fields.insert("Variable.name".into(), json!(name));
            fields.insert("Variable.line".into(), json!(line));
            fields.insert("Variable.column".into(), json!(column));
            fields.insert("Variable.isGlobal".into(), json!(is_global));
            insert_opt(&mut fields, "Variable.type", var_type);
            insert_opt(&mut fields, "Variable.storageClass", storage_class);
            insert_opt(&mut fields, "Variable.containingFunction", containing_function);
        }
        NodeData::Typedef { line, column, underlying_type } => {
            let name = non_empty(&node.name).ok_or_else(|| reject(node, "name is empty"))?;
            fields.insert("Typedef.name".into(), json!(name));
            fields.insert("Typedef.line".into(), json!(line));
            fields.insert("Typedef.column".into(), json!(column));
            insert_opt(&mut fields, "Typedef.underlyingType", underlying_type);
        }
        NodeData::StructFieldAccess { line, column, access_type, resolved_struct_file } => {
            let (struct_name, field_name) = node
                .name
                .split_once('.')
                .ok_or_else(|| reject(node, "name is not in `struct.field` form"))?;
            non_empty(struct_name).ok_or_else(|| reject(node, "struct name is empty"))?;
            non_empty(field_name).ok_or_else(|| reject(node, "field name is empty"))?;
            fields.insert("StructFieldAccess.structName".into(), json!(struct_name));
            fields.insert("StructFieldAccess.fieldName".into(), json!(field_name));
            fields.insert("StructFieldAccess.line".into(), json!(line));
            fields.insert("StructFieldAccess.column".into(), json!(column));
            fields.insert("StructFieldAccess.accessType".into(), json!(access_type.as_str()));
            if let Some(resolved) = resolved_struct_file {
                fields.insert("StructFieldAccess.resolvedStructFile".into(), json!(resolved.to_string_lossy()));
            }
        }
    }

    fields.insert(format!("{type_name}.id"), json!(node.id.as_str()));
    Ok(Value::Object(fields))
}

fn insert_opt(fields: &mut Map<String, Value>, key: &str, value: &Option<String>) {
    if let Some(v) = value.as_deref().and_then(non_empty) {
        fields.insert(key.to_string(), json!(v));
    }
}

/// Embeddings are only written when exactly 384 finite 32-bit floats;
/// anything else is omitted rather than defaulted (§3 invariant 7).
fn insert_embedding(fields: &mut Map<String, Value>, key: &str, embedding: &Option<Vec<f32>>) {
    if let Some(vec) = embedding {
        if vec.len() == 384 && vec.iter().all(|f| f.is_finite()) {
            fields.insert(key.to_string(), json!(vec));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_core::{Language, NodeId};

    fn function_node(name: &str) -> GraphNode {
        GraphNode {
            id: NodeId::function(name, std::path::Path::new("a.py")),
            kind: NodeKind::Function,
            name: name.to_string(),
            file_path: PathBuf::from("a.py"),
            language: Some(Language::Python),
            data: NodeData::Function {
                line: 1,
                column: 0,
                signature: Some(format!("{name}()")),
                parameters: vec!["a".into(), "  ".into(), "b".into()],
                return_type: None,
                docstring: None,
                embedding: None,
                belongs_to_class: None,
            },
        }
    }

    #[test]
    fn rejects_empty_name() {
        let node = function_node("");
        assert!(validate_and_shape(&node).is_err());
    }

    #[test]
    fn normalizes_blank_entries_out_of_parameter_list() {
        let node = function_node("helper");
        let shaped = validate_and_shape(&node).unwrap();
        let params = shaped["Function.parameters"].as_array().unwrap();
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn import_falls_back_to_raw_text_when_module_missing() {
        let node = GraphNode {
            id: NodeId::import("", std::path::Path::new("a.py"), 1),
            kind: NodeKind::Import,
            name: String::new(),
            file_path: PathBuf::from("a.py"),
            language: Some(Language::Python),
            data: NodeData::Import {
                line: 1,
                text: Some("import something_weird".into()),
                imported_items: Vec::new(),
                alias: None,
                kind: codegraph_core::ImportKind::Local,
            },
        };
        let shaped = validate_and_shape(&node).unwrap();
        assert_eq!(shaped["Import.module"], json!("import something_weird"));
    }

    #[test]
    fn embedding_of_wrong_dimension_is_omitted() {
        let mut node = function_node("helper");
        if let NodeData::Function { embedding, .. } = &mut node.data {
            *embedding = Some(vec![0.0; 10]);
        }
        let shaped = validate_and_shape(&node).unwrap();
        assert!(shaped.get("Function.embedding").is_none());
    }
}
