//
//  config.rs
//  apisig
//

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use crate::error::Result;

/// Top-level apisig configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub resolve: ResolveConfig,
    #[serde(default)]
    pub diff: DiffConfig,
    #[serde(default)]
    pub workers: WorkerConfig,
}

/// What the extractor records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Capture docstrings as opaque text.
    #[serde(default = "default_true")]
    pub docstrings: bool,
    /// Record `self.x = ...` assignments in `__init__` as class attributes.
    #[serde(default = "default_true")]
    pub instance_attributes: bool,
    /// Visit `if` / `try` / `with` blocks at module and class level.
    #[serde(default = "default_true")]
    pub descend_conditionals: bool,
}

/// Resolver settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveConfig {
    /// Override for the pass bound (defaults to the number of alias edges).
    #[serde(default)]
    pub max_passes: Option<usize>,
}

/// Which optional breakages the differ reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffConfig {
    #[serde(default = "default_true")]
    pub report_possible_renames: bool,
    #[serde(default = "default_true")]
    pub check_defaults: bool,
    #[serde(default = "default_true")]
    pub check_return_types: bool,
    #[serde(default = "default_true")]
    pub check_attribute_values: bool,
}

/// Extraction worker pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Number of threads; 0 uses the available hardware parallelism.
    #[serde(default)]
    pub threads: usize,
}

fn default_true() -> bool {
    true
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            docstrings: default_true(),
            instance_attributes: default_true(),
            descend_conditionals: default_true(),
        }
    }
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            report_possible_renames: default_true(),
            check_defaults: default_true(),
            check_return_types: default_true(),
            check_attribute_values: default_true(),
        }
    }
}

impl Config {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml_str(&contents).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "invalid config, using defaults");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Parse config text, rejecting malformed input.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Thread count for the extraction pool.
    pub fn worker_threads(&self) -> usize {
        if self.workers.threads > 0 {
            self.workers.threads
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_from_empty_text() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.extract.docstrings);
        assert!(config.diff.report_possible_renames);
        assert_eq!(config.resolve.max_passes, None);
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::from_toml_str(
            "[diff]\ncheck_defaults = false\n\n[workers]\nthreads = 3\n",
        )
        .unwrap();
        assert!(!config.diff.check_defaults);
        assert!(config.diff.check_return_types);
        assert_eq!(config.worker_threads(), 3);
    }

    #[test]
    fn test_invalid_text_is_an_error() {
        assert!(Config::from_toml_str("[diff]\ncheck_defaults = 12").is_err());
    }

    #[test]
    fn test_load_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not = [valid").unwrap();
        assert_eq!(Config::load(file.path()), Config::default());

        let missing = file.path().with_extension("missing");
        assert_eq!(Config::load(&missing), Config::default());
    }

    #[test]
    fn test_load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[extract]\ndocstrings = false").unwrap();
        let config = Config::load(file.path());
        assert!(!config.extract.docstrings);
        assert!(config.extract.instance_attributes);
    }
}
