//! File scanning, language extraction, cross-file resolution, graph
//! building, and node validation (C1-C5).

pub mod builder;
pub mod extractor;
pub mod languages;
pub mod parser_pool;
pub mod pipeline;
pub mod resolver;
pub mod scanner;
pub mod validator;

pub use pipeline::{BuildOutcome, WorkspaceIndex};
