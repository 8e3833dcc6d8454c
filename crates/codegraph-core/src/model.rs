//! The typed property-graph data model: node/edge kinds, content-addressed
//! identity, and the kind-specific payloads each language extractor and the
//! graph builder produce.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// A stable, content-addressed node reference: the first 16 hex characters
/// of a SHA-256 digest over the node's identity tuple. Re-hashing the same
/// identity tuple always yields the same ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    /// Hashes an already-joined identity string (the `@`-joined tuple per
    /// node kind) down to its 16-hex-character identity.
    pub fn from_identity(identity: &str) -> NodeId {
        let mut hasher = Sha256::new();
        hasher.update(identity.as_bytes());
        let digest = hasher.finalize();
        NodeId(hex::encode(digest)[..16].to_string())
    }

    pub fn file(path: &Path) -> NodeId {
        NodeId::from_identity(&path.to_string_lossy())
    }

    pub fn function(name: &str, file: &Path) -> NodeId {
        NodeId::from_identity(&format!("{name}@{}", file.to_string_lossy()))
    }

    pub fn class(name: &str, file: &Path) -> NodeId {
        NodeId::from_identity(&format!("{name}@{}", file.to_string_lossy()))
    }

    pub fn strukt(name: &str, file: &Path, line: u32) -> NodeId {
        NodeId::from_identity(&format!("{name}@{}@{line}", file.to_string_lossy()))
    }

    pub fn import(module: &str, file: &Path, line: u32) -> NodeId {
        NodeId::from_identity(&format!("{module}@{}@{line}", file.to_string_lossy()))
    }

    pub fn macro_def(name: &str, file: &Path, line: u32) -> NodeId {
        NodeId::from_identity(&format!("{name}@{}@{line}", file.to_string_lossy()))
    }

    pub fn variable(name: &str, file: &Path, line: u32) -> NodeId {
        NodeId::from_identity(&format!("{name}@{}@{line}", file.to_string_lossy()))
    }

    pub fn typedef(name: &str, file: &Path, line: u32) -> NodeId {
        NodeId::from_identity(&format!("{name}@{}@{line}", file.to_string_lossy()))
    }

    pub fn struct_field_access(struct_name: &str, field: &str, file: &Path, line: u32) -> NodeId {
        NodeId::from_identity(&format!(
            "{struct_name}.{field}@{}@{line}",
            file.to_string_lossy()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A local blank-ID reference within one mutation batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    File,
    Function,
    Class,
    Struct,
    Import,
    Macro,
    Variable,
    Typedef,
    StructFieldAccess,
}

impl NodeKind {
    /// The `dgraph.type` / predicate-prefix name for this kind.
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::File => "File",
            NodeKind::Function => "Function",
            NodeKind::Class => "Class",
            NodeKind::Struct => "Struct",
            NodeKind::Import => "Import",
            NodeKind::Macro => "Macro",
            NodeKind::Variable => "Variable",
            NodeKind::Typedef => "Typedef",
            NodeKind::StructFieldAccess => "StructFieldAccess",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Python,
    C,
}

impl Language {
    pub fn from_path(path: &Path) -> Option<Language> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("py") => Some(Language::Python),
            Some("c") | Some("h") | Some("cpp") | Some("hpp") | Some("cc") | Some("cxx")
            | Some("hxx") => Some(Language::C),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportKind {
    System,
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessType {
    Direct,
    Pointer,
}

impl AccessType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessType::Direct => "direct",
            AccessType::Pointer => "pointer",
        }
    }
}

/// Kind-specific content fields. One variant per `NodeKind`; this is the
/// typed surface C5's validator/shaper factories operate over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NodeData {
    File {
        functions_count: u32,
        classes_count: u32,
        structs_count: u32,
        imports_count: u32,
        ast_node_total: u32,
    },
    Function {
        line: u32,
        column: u32,
        signature: Option<String>,
        parameters: Vec<String>,
        return_type: Option<String>,
        docstring: Option<String>,
        embedding: Option<Vec<f32>>,
        belongs_to_class: Option<String>,
    },
    Class {
        line: u32,
        column: u32,
        methods: Vec<String>,
        base_classes: Vec<String>,
        embedding: Option<Vec<f32>>,
    },
    Struct {
        line: u32,
        column: u32,
        fields: Vec<String>,
        embedding: Option<Vec<f32>>,
    },
    Import {
        line: u32,
        text: Option<String>,
        imported_items: Vec<String>,
        alias: Option<String>,
        kind: ImportKind,
    },
    Macro {
        line: u32,
        column: u32,
        value: Option<String>,
        parameters: Vec<String>,
    },
    Variable {
        line: u32,
        column: u32,
        var_type: Option<String>,
        storage_class: Option<String>,
        is_global: bool,
        containing_function: Option<String>,
    },
    Typedef {
        line: u32,
        column: u32,
        underlying_type: Option<String>,
    },
    StructFieldAccess {
        line: u32,
        column: u32,
        access_type: AccessType,
        resolved_struct_file: Option<PathBuf>,
    },
}

/// One entity extracted from source, prior to store-wire shaping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: String,
    pub file_path: PathBuf,
    pub language: Option<Language>,
    pub data: NodeData,
}

impl GraphNode {
    pub fn line(&self) -> Option<u32> {
        match &self.data {
            NodeData::File { .. } => None,
            NodeData::Function { line, .. }
            | NodeData::Class { line, .. }
            | NodeData::Struct { line, .. }
            | NodeData::Macro { line, .. }
            | NodeData::Variable { line, .. }
            | NodeData::Typedef { line, .. }
            | NodeData::StructFieldAccess { line, .. } => Some(*line),
            NodeData::Import { line, .. } => Some(*line),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// File contains {Function, Class, Struct, Import, Macro, Variable,
    /// Typedef, StructFieldAccess}.
    Contains,
    /// Function calls Function.
    Calls,
    /// Inverse of Calls.
    CalledBy,
    /// Class inherits Class.
    Inherits,
    /// Inverse of Inherits.
    InheritedBy,
    /// Class contains method Function.
    ContainsMethod,
    /// Inverse of ContainsMethod.
    BelongsToClass,
    /// File uses {Macro, Typedef}; Function uses Variable.
    Uses,
    /// StructFieldAccess accesses Struct.
    Accesses,
}

impl EdgeKind {
    /// The store predicate name for this relationship, as used in
    /// `<Kind>.<relation>` wire keys.
    pub fn predicate_name(&self) -> &'static str {
        match self {
            EdgeKind::Contains => "contains",
            EdgeKind::Calls => "calls",
            EdgeKind::CalledBy => "calledBy",
            EdgeKind::Inherits => "inherits",
            EdgeKind::InheritedBy => "inheritedBy",
            EdgeKind::ContainsMethod => "containsMethod",
            EdgeKind::BelongsToClass => "belongsToClass",
            EdgeKind::Uses => "uses",
            EdgeKind::Accesses => "accesses",
        }
    }

    /// The explicitly-materialized inverse of this relationship, per the
    /// "manual inverse edges" invariant — the store never derives a
    /// reverse lookup on our behalf.
    pub fn inverse(&self) -> Option<EdgeKind> {
        match self {
            EdgeKind::Contains => None,
            EdgeKind::Calls => Some(EdgeKind::CalledBy),
            EdgeKind::CalledBy => Some(EdgeKind::Calls),
            EdgeKind::Inherits => Some(EdgeKind::InheritedBy),
            EdgeKind::InheritedBy => Some(EdgeKind::Inherits),
            EdgeKind::ContainsMethod => Some(EdgeKind::BelongsToClass),
            EdgeKind::BelongsToClass => Some(EdgeKind::ContainsMethod),
            EdgeKind::Uses => None,
            EdgeKind::Accesses => None,
        }
    }
}

/// How a relationship was discovered: structurally from the AST, or by a
/// weaker heuristic (e.g. the function-pointer caller guess in C9.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeSource {
    Structural,
    Heuristic,
}

/// A relationship with symbolic endpoints — name/file/line references that
/// are resolved into persistent ID references by the graph builder and
/// store client, not petgraph indices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: NodeId,
    pub target: NodeId,
    pub kind: EdgeKind,
    pub edge_source: EdgeSource,
    pub file_path: Option<PathBuf>,
    pub line: Option<u32>,
}

impl GraphEdge {
    pub fn structural(source: NodeId, target: NodeId, kind: EdgeKind) -> GraphEdge {
        GraphEdge {
            source,
            target,
            kind,
            edge_source: EdgeSource::Structural,
            file_path: None,
            line: None,
        }
    }

    /// Produces the explicit inverse edge, if this relationship has one.
    pub fn inverse(&self) -> Option<GraphEdge> {
        self.kind.inverse().map(|inv| GraphEdge {
            source: self.target.clone(),
            target: self.source.clone(),
            kind: inv,
            edge_source: self.edge_source,
            file_path: self.file_path.clone(),
            line: self.line,
        })
    }
}
