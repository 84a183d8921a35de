//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (chunk size, timeouts, secret length)
//! - Keep the origin a fixed, well-formed local target
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system
//! - Malformed CIDR entries are reported separately as warnings; the matcher
//!   already treats them as never matching

use std::net::SocketAddr;

use crate::config::schema::RelayConfig;
use crate::security::CidrRange;

/// Shortest accepted signing secret.
pub const MIN_SECRET_LEN: usize = 16;

/// Largest accepted relay chunk (16 MiB).
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a socket address")]
    BindAddress(String),

    #[error("listener.public_base_url {0:?} is not an http(s) URL")]
    PublicBaseUrl(String),

    #[error("origin.scheme {0:?} is not supported (only \"http\")")]
    OriginScheme(String),

    #[error("origin.host must not be empty")]
    OriginHost,

    #[error("origin.path_template must start with '/' and contain \"{{id}}\"")]
    PathTemplate,

    #[error("signing.secret must be set in the configuration file")]
    MissingSecret,

    #[error("signing.secret must be at least {MIN_SECRET_LEN} bytes")]
    SecretTooShort,

    #[error("signing.default_ttl_secs must be positive")]
    DefaultTtl,

    #[error("relay.chunk_size_bytes must be between 1 and {MAX_CHUNK_SIZE}")]
    ChunkSize,

    #[error("timeouts.{0} must be positive")]
    Timeout(&'static str),

    #[error("observability.metrics_address {0:?} is not a socket address")]
    MetricsAddress(String),
}

/// Validate a configuration, returning every problem found.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if let Some(base) = &config.listener.public_base_url {
        let ok = url::Url::parse(base)
            .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
            .unwrap_or(false);
        if !ok {
            errors.push(ValidationError::PublicBaseUrl(base.clone()));
        }
    }

    let origin = &config.origin;
    if origin.scheme != "http" {
        errors.push(ValidationError::OriginScheme(origin.scheme.clone()));
    }
    if origin.host.trim().is_empty() {
        errors.push(ValidationError::OriginHost);
    }
    if !origin.path_template.starts_with('/') || !origin.path_template.contains("{id}") {
        errors.push(ValidationError::PathTemplate);
    }

    if config.signing.secret.len() < MIN_SECRET_LEN {
        errors.push(ValidationError::SecretTooShort);
    }
    if config.signing.default_ttl_secs <= 0 {
        errors.push(ValidationError::DefaultTtl);
    }

    if config.relay.chunk_size_bytes == 0 || config.relay.chunk_size_bytes > MAX_CHUNK_SIZE {
        errors.push(ValidationError::ChunkSize);
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::Timeout("connect_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Timeout("request_secs"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// CIDR entries in the allow-list that will never match anything.
pub fn malformed_ranges(config: &RelayConfig) -> Vec<&str> {
    config
        .ip_restriction
        .allowed_ranges
        .iter()
        .filter(|r| r.parse::<CidrRange>().is_err())
        .map(String::as_str)
        .collect()
}
