//! Language extractors (C2). Only Python and C are supported per the
//! parser pool's two `FileType` variants.

pub mod c;
pub mod python;

use crate::extractor::LanguageExtractor;
use crate::parser_pool::{FileType, ParserPool};
use std::path::Path;

/// Returns the extractor for `path`'s language, or `None` if unsupported.
pub fn get_extractor(path: &Path, parser_pool: ParserPool) -> Option<Box<dyn LanguageExtractor>> {
    match FileType::from_path(path)? {
        FileType::Python => Some(Box::new(python::PythonExtractor::new(parser_pool))),
        FileType::C => Some(Box::new(c::CExtractor::new(parser_pool))),
    }
}
