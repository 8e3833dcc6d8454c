//! The error taxonomy shared by every component (§7). Each variant carries
//! the `type` tag the tool host serializes into its `{error, type}`
//! envelope; components map their own failures onto this enum at their
//! boundary rather than leaking transport- or parser-specific types.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodegraphError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("query error: {0}")]
    QueryError(String),

    #[error("validation failure: {0}")]
    ValidationFailure(String),

    #[error("transport error: {0}")]
    TransportError(String),

    #[error("not indexed: {0}")]
    NotIndexed(String),
}

impl CodegraphError {
    /// The stable `type` tag used in the JSON error envelope.
    pub fn type_tag(&self) -> &'static str {
        match self {
            CodegraphError::UnknownTool(_) => "unknown_tool",
            CodegraphError::InvalidParameter(_) => "invalid_parameter",
            CodegraphError::QueryError(_) => "query_error",
            CodegraphError::ValidationFailure(_) => "validation_failure",
            CodegraphError::TransportError(_) => "transport_error",
            CodegraphError::NotIndexed(_) => "not_indexed",
        }
    }

    pub fn to_envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            error: self.to_string(),
            error_type: self.type_tag().to_string(),
        }
    }
}

/// The uniform `{error, type}` shape every tool-host failure takes.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub error: String,
    #[serde(rename = "type")]
    pub error_type: String,
}
