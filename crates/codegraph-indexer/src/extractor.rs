//! Common extraction surface (C2): every language extractor produces the
//! same `ParseResult` shape. Entities here are still symbolic — names,
//! files, lines — not yet graph IDs; the graph builder (C4) and cross-file
//! resolver (C3) turn them into a node/edge model.

use codegraph_core::{AccessType, ImportKind, Language};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ParsedFunction {
    pub name: String,
    pub line: u32,
    pub column: u32,
    pub end_line: u32,
    pub parameters: Vec<String>,
    pub return_type: Option<String>,
    pub docstring: Option<String>,
    pub signature: String,
    /// C only: `false` for a bare declaration (prototype).
    pub is_definition: bool,
}

#[derive(Debug, Clone)]
pub struct ParsedClass {
    pub name: String,
    pub line: u32,
    pub end_line: u32,
    pub column: u32,
    pub base_classes: Vec<String>,
    pub methods: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ParsedStruct {
    pub name: String,
    pub line: u32,
    pub column: u32,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ParsedImport {
    pub module: String,
    pub line: u32,
    pub text: String,
    pub imported_items: Vec<String>,
    pub alias: Option<String>,
    pub kind: ImportKind,
}

/// A call site: `caller` is the enclosing function's name (or the
/// synthetic `<module>` function for top-level calls); `callee` is the
/// name-only resolution target (last attribute segment for Python method
/// calls, field name for C field calls).
#[derive(Debug, Clone)]
pub struct ParsedCall {
    pub caller: String,
    pub callee: String,
    pub line: u32,
}

#[derive(Debug, Clone)]
pub struct ParsedTypedef {
    pub name: String,
    pub line: u32,
    pub column: u32,
    pub underlying_type: String,
}

#[derive(Debug, Clone)]
pub struct ParsedMacro {
    pub name: String,
    pub line: u32,
    pub column: u32,
    pub value: Option<String>,
    pub parameters: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ParsedVariable {
    pub name: String,
    pub line: u32,
    pub column: u32,
    pub var_type: Option<String>,
    pub storage_class: Option<String>,
    pub is_global: bool,
    pub containing_function: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ParsedFieldAccess {
    pub struct_name: String,
    pub field_name: String,
    pub line: u32,
    pub column: u32,
    pub access_type: AccessType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageKind {
    Macro,
    Typedef,
    Variable,
}

#[derive(Debug, Clone)]
pub struct ParsedUsage {
    pub kind: UsageKind,
    pub name: String,
    pub line: u32,
    /// For variable usages: the enclosing function, used by the
    /// shadowing rule (prefer a local of this function, else a global).
    pub containing_function: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ParseResult {
    pub path: PathBuf,
    pub language: Language,
    pub loc: u32,
    pub ast_node_total: u32,
    pub functions: Vec<ParsedFunction>,
    pub classes: Vec<ParsedClass>,
    pub structs: Vec<ParsedStruct>,
    pub imports: Vec<ParsedImport>,
    pub calls: Vec<ParsedCall>,
    pub typedefs: Vec<ParsedTypedef>,
    pub macros: Vec<ParsedMacro>,
    pub variables: Vec<ParsedVariable>,
    pub struct_field_accesses: Vec<ParsedFieldAccess>,
    pub usages: Vec<ParsedUsage>,
}

impl ParseResult {
    pub fn empty(path: PathBuf, language: Language) -> ParseResult {
        ParseResult {
            path,
            language,
            loc: 0,
            ast_node_total: 0,
            functions: Vec::new(),
            classes: Vec::new(),
            structs: Vec::new(),
            imports: Vec::new(),
            calls: Vec::new(),
            typedefs: Vec::new(),
            macros: Vec::new(),
            variables: Vec::new(),
            struct_field_accesses: Vec::new(),
            usages: Vec::new(),
        }
    }
}

pub trait LanguageExtractor: Send + Sync {
    fn extract(&self, path: &Path, content: &[u8]) -> anyhow::Result<ParseResult>;
}
