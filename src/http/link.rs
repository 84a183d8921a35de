//! Signed link endpoint.
//!
//! Mints the stream URL a manifest hands to the player. The token outlives the
//! content (twice its duration) so seeking near the end never needs a new link.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Extension, Path, Query, State},
    http::{header, HeaderMap},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::http::error::RelayError;
use crate::http::server::{AppState, Settings};
use crate::observability::metrics;
use crate::security::AccessToken;

const ROUTE: &str = "link";

#[derive(Debug, Deserialize)]
pub struct LinkQuery {
    /// Content duration in seconds.
    pub duration: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SignedLink {
    pub url: String,
    pub expires: i64,
    pub screen_type: String,
    pub stereo_mode: String,
}

/// Token lifetime for content of `duration` seconds.
pub fn ttl_for(duration: Option<i64>, default_ttl_secs: i64) -> i64 {
    match duration {
        Some(d) if d > 0 => d.saturating_mul(2),
        _ => default_ttl_secs,
    }
}

/// Path of the stream route for a minted token.
pub fn stream_path(token: &AccessToken) -> String {
    format!(
        "/proxy/{}/{}/{}/stream.mp4",
        token.resource_id,
        token.expires_at,
        token.signature_hex()
    )
}

fn base_url(public_base_url: Option<&str>, headers: &HeaderMap) -> String {
    if let Some(base) = public_base_url {
        return base.trim_end_matches('/').to_string();
    }
    headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(|host| format!("http://{host}"))
        .unwrap_or_default()
}

/// `GET /link/{resource_id}?duration={seconds}`
pub async fn signed_link(
    State(state): State<AppState>,
    Extension(settings): Extension<Arc<Settings>>,
    Path(resource_id): Path<String>,
    Query(query): Query<LinkQuery>,
    headers: HeaderMap,
) -> Result<Json<SignedLink>, RelayError> {
    let start = Instant::now();
    let config = &settings.config;

    if !config.relay.resource_id_format.is_valid(&resource_id) {
        metrics::record_request(ROUTE, RelayError::BadRequest.status().as_u16(), start);
        return Err(RelayError::BadRequest);
    }

    let ttl = ttl_for(query.duration, config.signing.default_ttl_secs);
    let token = settings.codec.mint(&resource_id, ttl, state.clock.now_unix());
    let url = format!(
        "{}{}",
        base_url(config.listener.public_base_url.as_deref(), &headers),
        stream_path(&token)
    );

    tracing::debug!(resource_id = %resource_id, expires = token.expires_at, "Minted stream link");
    metrics::record_request(ROUTE, 200, start);

    Ok(Json(SignedLink {
        url,
        expires: token.expires_at,
        screen_type: config.playback.fallback_projection.as_str().to_string(),
        stereo_mode: config.playback.fallback_stereo_mode.as_str().to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::TokenCodec;
    use axum::http::HeaderValue;

    #[test]
    fn test_ttl_is_twice_the_duration() {
        assert_eq!(ttl_for(Some(3600), 100), 7200);
        assert_eq!(ttl_for(Some(0), 100), 100);
        assert_eq!(ttl_for(Some(-5), 100), 100);
        assert_eq!(ttl_for(None, 100), 100);
    }

    #[test]
    fn test_stream_path_shape() {
        let token = TokenCodec::new("0123456789abcdef").mint("abc-123", 60, 1000);
        let path = stream_path(&token);
        let segments: Vec<&str> = path.split('/').collect();

        assert_eq!(segments[1], "proxy");
        assert_eq!(segments[2], "abc-123");
        assert_eq!(segments[3], "1060");
        assert_eq!(segments[4], token.signature_hex());
        assert_eq!(segments[5], "stream.mp4");
    }

    #[test]
    fn test_base_url_resolution() {
        let mut headers = HeaderMap::new();
        assert_eq!(base_url(None, &headers), "");

        headers.insert(header::HOST, HeaderValue::from_static("10.0.0.5:8097"));
        assert_eq!(base_url(None, &headers), "http://10.0.0.5:8097");
        assert_eq!(
            base_url(Some("https://vr.example.com/"), &headers),
            "https://vr.example.com"
        );
    }
}
