//
//  error.rs
//  apisig
//

use serde::{Deserialize, Serialize};

use crate::source::LoaderError;

/// Fatal errors: the call that returns one produced no usable output.
#[derive(Debug, thiserror::Error)]
pub enum ApiSigError {
    #[error("resolution did not reach a fixed point after {passes} passes over {aliases} aliases")]
    InvariantViolation { passes: usize, aliases: usize },

    #[error("source provider failed: {0}")]
    Loader(#[from] LoaderError),

    #[error("malformed exchange tree: {0}")]
    Exchange(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to initialize the Python parser: {0}")]
    ParserInit(String),

    #[error("failed to start worker pool: {0}")]
    WorkerPool(String),

    #[error("logging already initialized: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, ApiSigError>;

/// What went wrong with a source unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceErrorKind {
    /// The parser rejected part of the unit.
    Syntax,
    /// A signature lists parameter kinds out of order.
    ParameterOrder,
    /// The provider could not produce the unit's text.
    Unreadable,
    /// The unit does not belong to the package being assembled.
    OutsidePackage,
}

/// A recoverable defect in one source unit. The unit is left out of the
/// package; its siblings are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{origin_path}:{line}:{column}: {qualified_name}: {message}")]
pub struct SourceError {
    pub kind: SourceErrorKind,
    pub qualified_name: String,
    pub origin_path: String,
    /// 1-based; 0 when the defect has no position (e.g. unreadable unit).
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl SourceError {
    pub fn new(
        kind: SourceErrorKind,
        qualified_name: impl Into<String>,
        origin_path: impl Into<String>,
        line: usize,
        column: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            qualified_name: qualified_name.into(),
            origin_path: origin_path.into(),
            line,
            column,
            message: message.into(),
        }
    }
}

/// An alias chain that loops back on itself without reaching a definition.
/// The alias is marked external; the rest of the package is unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("cyclic alias {qualified_name} -> {target} (via {})", .chain.join(" -> "))]
pub struct ResolutionError {
    /// The alias (or `Class.__bases__[i]` slot) that could not be resolved.
    pub qualified_name: String,
    pub target: String,
    /// Paths visited before the chain repeated.
    pub chain: Vec<String>,
}
