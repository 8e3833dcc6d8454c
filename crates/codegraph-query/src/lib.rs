//! Read-side query layer (C9). Six operations over the in-memory graph plus
//! the embedding/store services, each returning a JSON-serializable value
//! with the shared error envelope on failure (§7).

pub mod callers;
pub mod field_access;
pub mod include_deps;
pub mod semantic;
pub mod symbol_usages;

use codegraph_core::CodegraphError;

/// The symbol kinds `find_symbol_usages` accepts (§4.9.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Function,
    Macro,
    Variable,
    Struct,
    Typedef,
}

impl SymbolKind {
    pub fn parse(s: &str) -> Result<SymbolKind, CodegraphError> {
        match s {
            "function" => Ok(SymbolKind::Function),
            "macro" => Ok(SymbolKind::Macro),
            "variable" => Ok(SymbolKind::Variable),
            "struct" => Ok(SymbolKind::Struct),
            "typedef" => Ok(SymbolKind::Typedef),
            other => Err(CodegraphError::InvalidParameter(format!("unknown symbol kind: {other}"))),
        }
    }

    fn node_kind(self) -> codegraph_core::NodeKind {
        match self {
            SymbolKind::Function => codegraph_core::NodeKind::Function,
            SymbolKind::Macro => codegraph_core::NodeKind::Macro,
            SymbolKind::Variable => codegraph_core::NodeKind::Variable,
            SymbolKind::Struct => codegraph_core::NodeKind::Struct,
            SymbolKind::Typedef => codegraph_core::NodeKind::Typedef,
        }
    }
}

pub use callers::{check_affected_files, get_function_callers};
pub use field_access::find_struct_field_access;
pub use include_deps::get_include_dependencies;
pub use semantic::semantic_code_search;
pub use symbol_usages::find_symbol_usages;
