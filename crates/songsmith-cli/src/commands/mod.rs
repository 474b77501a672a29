//! CLI command implementations

pub mod constants;
pub mod generate;

use std::path::Path;

use anyhow::{Context, Result};
use songsmith_spec::Constants;
use tracing::debug;

/// Loads the built-in constants, replacing tables from `path` if given.
pub fn load_constants(path: Option<&Path>) -> Result<Constants> {
    let constants = match path {
        Some(path) => Constants::load(Some(path))
            .with_context(|| format!("Failed to load constants from {}", path.display()))?,
        None => Constants::load(None).context("Failed to load built-in constants")?,
    };
    debug!(
        source = %path.map(|p| p.display().to_string()).unwrap_or_else(|| "builtin".to_string()),
        "loaded constants"
    );
    Ok(constants)
}
