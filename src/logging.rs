//! Tracing subscriber setup for binaries and tests that embed apisig.

use tracing_subscriber::EnvFilter;

use crate::error::{ApiSigError, Result};

/// Install a stderr `fmt` subscriber. `RUST_LOG` wins over `default_level`.
pub fn init_logging(default_level: &str) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| ApiSigError::Logging(e.to_string()))
}
