//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::security::ResourceIdFormat;

/// Reference relay chunk size (2 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 2 * 1024 * 1024;

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Listener configuration (bind address, public URL).
    pub listener: ListenerConfig,

    /// The single internal media origin.
    pub origin: OriginConfig,

    /// Token signing settings.
    pub signing: SigningConfig,

    /// IP allow-list.
    pub ip_restriction: IpRestrictionConfig,

    /// Streaming behaviour.
    pub relay: StreamConfig,

    /// Defaults advertised to players when the library has no 3D metadata.
    pub playback: PlaybackConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8097").
    pub bind_address: String,

    /// Externally reachable base URL used in minted links.
    /// When unset, links are built from the request's Host header.
    pub public_base_url: Option<String>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8097".to_string(),
            public_base_url: None,
        }
    }
}

/// Internal origin the relay forwards to.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OriginConfig {
    /// URL scheme. Only "http" is supported.
    pub scheme: String,

    /// Origin host, normally loopback.
    pub host: String,

    /// Origin port.
    pub port: u16,

    /// Path and query with `{id}` placeholders for the resource identifier.
    pub path_template: String,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            scheme: "http".to_string(),
            host: "localhost".to_string(),
            port: 8096,
            path_template: "/Videos/{id}/stream.mp4?Static=true&mediaSourceId={id}&deviceId=vr-stream-relay"
                .to_string(),
        }
    }
}

impl OriginConfig {
    /// `scheme://host:port`.
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// Token signing configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningConfig {
    /// HMAC secret. Required in configuration files; the random default only
    /// applies when running without one.
    pub secret: String,

    /// Token lifetime when the content duration is unknown.
    pub default_ttl_secs: i64,
}

impl std::fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningConfig")
            .field("secret", &"<redacted>")
            .field("default_ttl_secs", &self.default_ttl_secs)
            .finish()
    }
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            secret: uuid::Uuid::new_v4().simple().to_string(),
            default_ttl_secs: 4 * 60 * 60,
        }
    }
}

/// IP allow-list configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct IpRestrictionConfig {
    /// Enable the allow-list. When false every address passes.
    pub enabled: bool,

    /// CIDR ranges, e.g. "192.168.1.0/24". Malformed entries never match.
    pub allowed_ranges: Vec<String>,

    /// Also guard the stream endpoint, not only the link endpoint.
    pub guard_stream: bool,
}

/// Streaming configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Maximum bytes read from the origin per client write.
    pub chunk_size_bytes: usize,

    /// Accepted identifier shape.
    pub resource_id_format: ResourceIdFormat,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            chunk_size_bytes: DEFAULT_CHUNK_SIZE,
            resource_id_format: ResourceIdFormat::Uuid,
        }
    }
}

/// Projection advertised when the item carries no 3D format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Projection {
    #[default]
    Flat,
    /// 180 degree.
    Dome,
    /// 360 degree.
    Sphere,
}

impl Projection {
    pub fn as_str(self) -> &'static str {
        match self {
            Projection::Flat => "flat",
            Projection::Dome => "dome",
            Projection::Sphere => "sphere",
        }
    }
}

/// Stereo layout advertised when the item carries no 3D format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StereoMode {
    #[default]
    Off,
    /// Side by side.
    Sbs,
    /// Top and bottom.
    Tb,
}

impl StereoMode {
    pub fn as_str(self) -> &'static str {
        match self {
            StereoMode::Off => "off",
            StereoMode::Sbs => "sbs",
            StereoMode::Tb => "tb",
        }
    }
}

/// Player fallbacks.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PlaybackConfig {
    pub fallback_projection: Projection,
    pub fallback_stereo_mode: StereoMode,
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Origin connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout for non-streaming routes in seconds.
    /// Streams have no overall deadline.
    pub request_secs: u64,

    /// How long open streams may keep running after shutdown is requested.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
            shutdown_grace_secs: 10,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config: RelayConfig = toml::from_str(
            r#"
            [signing]
            secret = "0123456789abcdef0123"
            "#,
        )
        .unwrap();

        assert_eq!(config.signing.secret, "0123456789abcdef0123");
        assert_eq!(config.relay.chunk_size_bytes, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.relay.resource_id_format, ResourceIdFormat::Uuid);
        assert_eq!(config.origin.base_url(), "http://localhost:8096");
        assert!(!config.ip_restriction.enabled);
    }

    #[test]
    fn test_full_toml() {
        let config: RelayConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:9000"
            public_base_url = "https://media.example.com"

            [origin]
            host = "127.0.0.1"
            port = 18096
            path_template = "/media/{id}"

            [ip_restriction]
            enabled = true
            allowed_ranges = ["192.168.1.0/24", "10.0.0.0/8"]
            guard_stream = true

            [relay]
            chunk_size_bytes = 65536
            resource_id_format = "opaque"

            [playback]
            fallback_projection = "dome"
            fallback_stereo_mode = "sbs"
            "#,
        )
        .unwrap();

        assert_eq!(config.origin.base_url(), "http://127.0.0.1:18096");
        assert_eq!(config.ip_restriction.allowed_ranges.len(), 2);
        assert!(config.ip_restriction.guard_stream);
        assert_eq!(config.relay.resource_id_format, ResourceIdFormat::Opaque);
        assert_eq!(config.playback.fallback_projection, Projection::Dome);
        assert_eq!(config.playback.fallback_stereo_mode.as_str(), "sbs");
    }

    #[test]
    fn test_default_secrets_differ() {
        let a = SigningConfig::default();
        let b = SigningConfig::default();
        assert_eq!(a.secret.len(), 32);
        assert_ne!(a.secret, b.secret);
        assert!(!format!("{a:?}").contains(&a.secret));
    }
}
