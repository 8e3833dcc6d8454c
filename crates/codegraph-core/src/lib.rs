//! codegraph-core — the typed property-graph data model, content-addressed
//! identity, the in-memory graph assembled during a build, the cross-file
//! symbol index, the shared error taxonomy, and the workspace registry.

pub mod error;
pub mod graph;
pub mod model;
pub mod symbols;
pub mod workspace;

#[cfg(test)]
mod tests;

pub use error::{CodegraphError, ErrorEnvelope};
pub use graph::Graph;
pub use model::{
    AccessType, EdgeKind, EdgeSource, GraphEdge, GraphNode, ImportKind, Language, NodeData,
    NodeId, NodeKind,
};
pub use symbols::SymbolTable;
pub use workspace::{active_workspace, register_workspace};
