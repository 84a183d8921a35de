//! Client-facing error mapping.
//!
//! Bodies are terse: a rejected token never reveals whether it
//! was expired or forged.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// A request that ends before (or instead of) streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    /// Malformed identifier or expiry.
    #[error("Bad request")]
    BadRequest,

    /// Expired or forged token.
    #[error("Unauthorized")]
    Unauthorized,

    /// Client address not allowed.
    #[error("Forbidden")]
    Forbidden,

    /// Origin unreachable or failed before headers.
    #[error("Upstream request failed")]
    Upstream,
}

impl RelayError {
    pub fn status(self) -> StatusCode {
        match self {
            RelayError::BadRequest => StatusCode::BAD_REQUEST,
            RelayError::Unauthorized => StatusCode::UNAUTHORIZED,
            RelayError::Forbidden => StatusCode::FORBIDDEN,
            RelayError::Upstream => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
