//! # apisig
//!
//! Structural signatures of Python packages.
//!
//! apisig reads Python source, builds a model of a package's public API
//! (modules, classes, functions with their full signatures, attributes, and
//! imports), resolves every import and base class to its definition, and
//! compares two versions of the same package to find breaking changes.
//!
//! ## Pipeline
//!
//! - **Extract**: each source unit is parsed with tree-sitter and turned into
//!   an unresolved module tree. Units are independent and run in parallel.
//! - **Assemble**: module trees are nested into one package by dotted name.
//! - **Resolve**: aliases and bases are followed to their definitions until
//!   nothing changes; linearizations and inherited members are computed.
//! - **Diff**: two resolved packages are walked side by side.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use apisig::{check, format_report, Config, Loader, MemoryProvider};
//!
//! let loader = Loader::new(Config::default());
//! let old = loader
//!     .load("pkg", &MemoryProvider::new().package("pkg", "def f(a, b): pass\n"))
//!     .unwrap();
//! let new = loader
//!     .load("pkg", &MemoryProvider::new().package("pkg", "def f(a): pass\n"))
//!     .unwrap();
//!
//! let breakages = check(&old.package, &new.package, &Config::default().diff);
//! print!("{}", format_report(&breakages));
//! ```

pub mod config;
pub mod diff;
pub mod error;
pub mod graph;
pub mod logging;
pub mod model;
pub mod parser;
pub mod resolve;
pub mod serialize;
pub mod source;
pub mod stats;

// Re-exports for convenience
pub use config::{Config, DiffConfig, ExtractConfig, ResolveConfig, WorkerConfig};
pub use diff::{find_breaking_changes, format_report, Breakage, BreakageKind};
pub use error::{ApiSigError, ResolutionError, Result, SourceError, SourceErrorKind};
pub use model::{Object, ObjectKind, Package};
pub use source::{LoaderError, MemoryProvider, ModelProvider, SourceProvider, SourceUnit, UnitFailure};
pub use stats::Stats;

use tracing::info;

/// A loaded package and everything that went wrong along the way.
#[derive(Debug)]
pub struct LoadOutcome {
    /// Fully resolved: every alias edge is resolved or external.
    pub package: Package,
    /// Units left out of the package.
    pub source_errors: Vec<SourceError>,
    /// Alias cycles, marked external in the package.
    pub resolution_errors: Vec<ResolutionError>,
}

impl LoadOutcome {
    /// True when nothing had to be left out or marked as a cycle.
    pub fn is_clean(&self) -> bool {
        self.source_errors.is_empty() && self.resolution_errors.is_empty()
    }
}

/// Loads packages from source, resolving them against known dependencies.
///
/// Dependencies are owned by the loader for its lifetime and consulted by
/// every load; the symbol table built from them lives only for one load.
pub struct Loader {
    config: Config,
    dependencies: Vec<Package>,
}

impl Loader {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            dependencies: Vec::new(),
        }
    }

    /// Make `package` available as a resolution target.
    pub fn with_dependency(mut self, package: Package) -> Self {
        self.dependencies.push(package);
        self
    }

    /// Add a package produced by a model provider (for example one built by
    /// introspecting a live interpreter). It is used as-is.
    pub fn with_model(self, provider: &dyn ModelProvider) -> Result<Self> {
        let package = provider.model()?;
        Ok(self.with_dependency(package))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn dependencies(&self) -> &[Package] {
        &self.dependencies
    }

    /// Extract, assemble, and resolve `package_name` from `provider`.
    ///
    /// Per-unit problems are returned in the outcome. Only a provider that
    /// fails outright, a worker pool that cannot start, or a resolver that
    /// fails to converge makes the whole load fail.
    pub fn load(&self, package_name: &str, provider: &dyn SourceProvider) -> Result<LoadOutcome> {
        let (package, source_errors) = graph::build_package(package_name, provider, &self.config)?;
        let outcome = resolve::resolve_package(package, &self.dependencies, &self.config.resolve)?;

        info!(
            package = package_name,
            entities = outcome.package.len(),
            source_errors = source_errors.len(),
            resolution_errors = outcome.errors.len(),
            "package loaded"
        );
        Ok(LoadOutcome {
            package: outcome.package,
            source_errors,
            resolution_errors: outcome.errors,
        })
    }

    /// Resolve a package that came from elsewhere (e.g. the exchange format).
    pub fn resolve(&self, package: Package) -> Result<resolve::ResolveOutcome> {
        resolve::resolve_package(package, &self.dependencies, &self.config.resolve)
    }
}

/// Breaking changes from `old` to `new`. An empty result means compatible.
pub fn check(old: &Package, new: &Package, config: &DiffConfig) -> Vec<Breakage> {
    find_breaking_changes(old, new, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Introspected;

    impl ModelProvider for Introspected {
        fn model(&self) -> std::result::Result<Package, LoaderError> {
            let root = Object::module("ext", model::Location::default(), model::Module::default())
                .with_member(Object::new(
                    "Base",
                    model::Location::default(),
                    ObjectKind::Class(model::Class::default()),
                ));
            Ok(Package::from_tree(root))
        }
    }

    struct Broken;

    impl SourceProvider for Broken {
        fn units(&self) -> std::result::Result<Vec<source::UnitResult>, LoaderError> {
            Err(LoaderError::new("repository not found"))
        }
    }

    #[test]
    fn test_load_and_check() {
        let loader = Loader::new(Config::default());
        let old = loader
            .load("pkg", &MemoryProvider::new().package("pkg", "def f(a, b): pass\n"))
            .unwrap();
        let new = loader
            .load("pkg", &MemoryProvider::new().package("pkg", "def f(a): pass\n"))
            .unwrap();
        assert!(old.is_clean());

        let breakages = check(&old.package, &new.package, &DiffConfig::default());
        assert_eq!(breakages.len(), 1);
        assert_eq!(breakages[0].kind, BreakageKind::ParameterRemoved);
        assert_eq!(
            format_report(&breakages),
            "pkg/__init__.py:1: pkg.f(b): Parameter changed: Old: b New: absent\n"
        );
    }

    #[test]
    fn test_model_provider_dependency() {
        let loader = Loader::new(Config::default()).with_model(&Introspected).unwrap();
        let outcome = loader
            .load(
                "pkg",
                &MemoryProvider::new().package("pkg", "from ext import Base\n\nclass Impl(Base):\n    pass\n"),
            )
            .unwrap();
        let package = &outcome.package;
        let impl_id = package.id_of("pkg.Impl").unwrap();
        assert_eq!(package.mro(impl_id).unwrap(), &["pkg.Impl", "ext.Base"]);
    }

    #[test]
    fn test_provider_failure_is_fatal() {
        let err = Loader::new(Config::default()).load("pkg", &Broken).unwrap_err();
        assert!(matches!(err, ApiSigError::Loader(_)));
        assert_eq!(err.to_string(), "source provider failed: repository not found");
    }
}
