//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::RelayConfig;
use crate::config::validation::{malformed_ranges, validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<RelayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration text.
///
/// A file must set `signing.secret`; the built-in default is random per parse.
pub fn parse_config(content: &str) -> Result<RelayConfig, ConfigError> {
    let raw: toml::Table = content.parse()?;
    let has_secret = raw
        .get("signing")
        .and_then(|signing| signing.get("secret"))
        .is_some();
    let config: RelayConfig = toml::from_str(content)?;

    let mut errors = validate_config(&config).err().unwrap_or_default();
    if !has_secret {
        errors.insert(0, ValidationError::MissingSecret);
    }
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors));
    }

    for range in malformed_ranges(&config) {
        tracing::warn!(range = %range, "Ignoring malformed CIDR range in allow-list");
    }

    Ok(config)
}
