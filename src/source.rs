//! Source and model providers.
//!
//! Reading files, walking directories, and checking out historical refs all
//! happen outside this crate. A provider hands over finished units of text;
//! a model provider hands over a package that is already resolved (for
//! example one built by introspecting a live interpreter).

use crate::model::Package;

/// One module's worth of source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    /// Dotted module name, e.g. `pkg.sub.mod`.
    pub qualified_name: String,
    pub source_text: String,
    /// Where the text came from, used verbatim in locations and reports.
    pub origin_path: String,
}

impl SourceUnit {
    pub fn new(
        qualified_name: impl Into<String>,
        source_text: impl Into<String>,
        origin_path: impl Into<String>,
    ) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            source_text: source_text.into(),
            origin_path: origin_path.into(),
        }
    }

    /// Package initializers (`__init__.py`, `__init__.pyi`) anchor relative imports
    /// at their own name instead of their parent's.
    pub fn is_package_init(&self) -> bool {
        let file = self
            .origin_path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.origin_path);
        file == "__init__.py" || file == "__init__.pyi"
    }
}

/// Error raised by a provider. Carried through untouched.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct LoaderError(Box<dyn std::error::Error + Send + Sync>);

impl LoaderError {
    pub fn new(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self(err.into())
    }

    pub fn inner(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.0.as_ref()
    }
}

/// A unit the provider knew about but could not read.
#[derive(Debug)]
pub struct UnitFailure {
    pub qualified_name: String,
    pub origin_path: String,
    pub error: LoaderError,
}

pub type UnitResult = std::result::Result<SourceUnit, UnitFailure>;

/// Yields the units of one package. An `Err` fails the whole load; per-unit
/// failures travel inside the vector.
pub trait SourceProvider: Send + Sync {
    fn units(&self) -> std::result::Result<Vec<UnitResult>, LoaderError>;
}

/// Supplies a package that is already resolved.
pub trait ModelProvider {
    fn model(&self) -> std::result::Result<Package, LoaderError>;
}

/// In-memory provider, handy for tests and for callers that already hold the text.
#[derive(Debug, Default, Clone)]
pub struct MemoryProvider {
    units: Vec<SourceUnit>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module. `origin_path` is derived from the name (`pkg/mod.py`).
    pub fn module(mut self, qualified_name: &str, source_text: &str) -> Self {
        let origin_path = format!("{}.py", qualified_name.replace('.', "/"));
        self.units
            .push(SourceUnit::new(qualified_name, source_text, origin_path));
        self
    }

    /// Add a package initializer (`pkg/sub/__init__.py`).
    pub fn package(mut self, qualified_name: &str, source_text: &str) -> Self {
        let origin_path = format!("{}/__init__.py", qualified_name.replace('.', "/"));
        self.units
            .push(SourceUnit::new(qualified_name, source_text, origin_path));
        self
    }

    pub fn unit(mut self, unit: SourceUnit) -> Self {
        self.units.push(unit);
        self
    }
}

impl SourceProvider for MemoryProvider {
    fn units(&self) -> std::result::Result<Vec<UnitResult>, LoaderError> {
        Ok(self.units.iter().cloned().map(Ok).collect())
    }
}

impl SourceProvider for Vec<SourceUnit> {
    fn units(&self) -> std::result::Result<Vec<UnitResult>, LoaderError> {
        Ok(self.iter().cloned().map(Ok).collect())
    }
}
