//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::blockchain::types::BlockchainError;
use crate::config::deployment::RawDeploymentConfig;
use crate::config::schema::ToolConfig;
use crate::config::validation::{validate_tool_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[source] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[source] serde_json::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    /// A ledger lookup needed to resolve the document failed.
    #[error("Ledger error: {0}")]
    Ledger(#[source] BlockchainError),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate operator settings from a TOML file.
pub fn load_tool_config(path: &Path) -> Result<ToolConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: ToolConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    validate_tool_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load operator settings, falling back to defaults when no path is given.
pub fn load_tool_config_or_default(path: Option<&Path>) -> Result<ToolConfig, ConfigError> {
    match path {
        Some(path) => load_tool_config(path),
        None => Ok(ToolConfig::default()),
    }
}

/// Read a configuration input document (JSON).
///
/// Only syntax is checked here; semantic validation happens during
/// resolution.
pub fn load_deployment_config(path: &Path) -> Result<RawDeploymentConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    serde_json::from_str(&content).map_err(ConfigError::Json)
}
