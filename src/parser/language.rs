//
//  language.rs
//  apisig
//

use tree_sitter::Parser;

use crate::error::{ApiSigError, Result};

/// Flavours of Python source the extractor accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFlavor {
    /// Regular module (`.py`).
    Module,
    /// Type stub (`.pyi`): bodies are `...`, overloads may lack an implementation.
    Stub,
}

impl SourceFlavor {
    pub fn from_origin(origin_path: &str) -> Self {
        if origin_path.ends_with(".pyi") {
            SourceFlavor::Stub
        } else {
            SourceFlavor::Module
        }
    }
}

/// A parser configured for the Python grammar. Parsers are not `Sync`; each
/// worker builds its own.
pub fn python_parser() -> Result<Parser> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| ApiSigError::ParserInit(e.to_string()))?;
    Ok(parser)
}
