//! Origin URL construction.

use axum::http::Uri;

use crate::config::OriginConfig;
use crate::security::VerifiedResource;

/// Placeholder replaced by the resource identifier.
pub const ID_PLACEHOLDER: &str = "{id}";

/// The fixed origin location, resolved from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginTarget {
    base_url: String,
    path_template: String,
}

impl OriginTarget {
    pub fn from_config(config: &OriginConfig) -> Self {
        Self {
            base_url: config.base_url(),
            path_template: config.path_template.clone(),
        }
    }

    /// `scheme://host:port` of the origin.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Origin URI for a verified resource.
    pub fn uri_for(&self, resource: &VerifiedResource) -> Result<Uri, axum::http::uri::InvalidUri> {
        let path = self
            .path_template
            .replace(ID_PLACEHOLDER, resource.resource_id());
        format!("{}{}", self.base_url, path).parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::{TokenCodec, Verdict};

    fn verified(id: &str) -> VerifiedResource {
        let codec = TokenCodec::new("0123456789abcdef");
        let token = codec.mint(id, 60, 0);
        match codec.verify(id, token.expires_at, &token.signature_hex(), 0) {
            Verdict::Valid(resource) => resource,
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn test_default_template() {
        let target = OriginTarget::from_config(&OriginConfig::default());
        let uri = target
            .uri_for(&verified("e7bea589-e339-490c-8738-596e42b9042e"))
            .unwrap();

        assert_eq!(uri.host(), Some("localhost"));
        assert_eq!(uri.port_u16(), Some(8096));
        assert_eq!(uri.path(), "/Videos/e7bea589-e339-490c-8738-596e42b9042e/stream.mp4");
        assert_eq!(
            uri.query(),
            Some("Static=true&mediaSourceId=e7bea589-e339-490c-8738-596e42b9042e&deviceId=vr-stream-relay")
        );
    }

    #[test]
    fn test_custom_origin() {
        let config = OriginConfig {
            scheme: "http".into(),
            host: "127.0.0.1".into(),
            port: 18096,
            path_template: "/media/{id}".into(),
        };
        let target = OriginTarget::from_config(&config);
        assert_eq!(target.base_url(), "http://127.0.0.1:18096");
        assert_eq!(
            target.uri_for(&verified("abc-123")).unwrap().to_string(),
            "http://127.0.0.1:18096/media/abc-123"
        );
    }
}
