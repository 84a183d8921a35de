//! Signed stream relay.
//!
//! # Session states
//! ```text
//! Received ──(bad id / expiry)──────────────▶ Rejected 400
//!    │
//! ValidatingToken ──(expired / forged)──────▶ Rejected 401
//!    │
//! Forwarding ──(origin unreachable)─────────▶ OriginError 502
//!    │
//! Relaying ──▶ Completed | ClientDisconnected | OriginError (body aborted)
//! ```
//!
//! Nothing in a session is retried. Identifier checks happen before any
//! secret-dependent work, and the token check strictly precedes the single
//! origin request.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{Extension, Path, State},
    http::{header, HeaderMap, HeaderValue, Response},
};

use crate::http::error::RelayError;
use crate::http::request::request_id;
use crate::http::response::{copy_response_headers, relay_body};
use crate::http::server::{AppState, Settings};
use crate::observability::metrics;
use crate::security::Verdict;

const ROUTE: &str = "proxy";

/// `GET /proxy/{resource_id}/{expiry}/{signature}/stream.mp4`
pub async fn proxy_stream(
    State(state): State<AppState>,
    Extension(settings): Extension<Arc<Settings>>,
    Path((resource_id, expiry, signature)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Result<Response<Body>, RelayError> {
    let start = Instant::now();
    let request_id = request_id(&headers).to_string();

    let result = relay(&state, &settings, &request_id, resource_id, &expiry, &signature, &headers).await;

    let status = match &result {
        Ok(response) => response.status().as_u16(),
        Err(e) => e.status().as_u16(),
    };
    metrics::record_request(ROUTE, status, start);
    result
}

async fn relay(
    state: &AppState,
    settings: &Settings,
    request_id: &str,
    resource_id: String,
    expiry: &str,
    signature: &str,
    headers: &HeaderMap,
) -> Result<Response<Body>, RelayError> {
    // Received
    if !settings.config.relay.resource_id_format.is_valid(&resource_id) {
        tracing::debug!(request_id = %request_id, "Rejecting malformed resource id");
        return Err(RelayError::BadRequest);
    }
    let expires_at: i64 = expiry.parse().map_err(|_| {
        tracing::debug!(request_id = %request_id, expiry = %expiry, "Rejecting malformed expiry");
        RelayError::BadRequest
    })?;

    // ValidatingToken
    let now = state.clock.now_unix();
    let resource = match settings.codec.verify(&resource_id, expires_at, signature, now) {
        Verdict::Valid(resource) => resource,
        Verdict::Expired => {
            tracing::warn!(
                request_id = %request_id,
                resource_id = %resource_id,
                expiry = expires_at,
                now,
                provided = %signature,
                expected = %settings.codec.expected_signature_hex(&resource_id, expires_at),
                "Proxy token expired"
            );
            metrics::record_access_denied("token_expired");
            return Err(RelayError::Unauthorized);
        }
        Verdict::Forged => {
            tracing::warn!(
                request_id = %request_id,
                resource_id = %resource_id,
                expiry = expires_at,
                provided = %signature,
                expected = %settings.codec.expected_signature_hex(&resource_id, expires_at),
                "Proxy signature mismatch"
            );
            metrics::record_access_denied("token_forged");
            return Err(RelayError::Unauthorized);
        }
    };

    // Forwarding
    let ranges: Vec<HeaderValue> = headers.get_all(header::RANGE).iter().cloned().collect();
    tracing::debug!(
        request_id = %request_id,
        resource_id = %resource.resource_id(),
        range = ?ranges,
        "Forwarding to origin"
    );
    let origin_response = state
        .origin
        .fetch(&settings.origin, &resource, ranges)
        .await
        .map_err(|e| {
            tracing::error!(
                request_id = %request_id,
                resource_id = %resource.resource_id(),
                origin = %settings.origin.base_url(),
                error = %e,
                "Origin request failed"
            );
            RelayError::Upstream
        })?;

    // Relaying
    let (parts, origin_body) = origin_response.into_parts();
    let (body, _session) = relay_body(
        Body::new(origin_body),
        settings.config.relay.chunk_size_bytes,
        state.streams.clone(),
        request_id.to_string(),
        resource.resource_id().to_string(),
    );

    let mut response = Response::new(body);
    *response.status_mut() = parts.status;
    copy_response_headers(&parts.headers, response.headers_mut());
    Ok(response)
}
