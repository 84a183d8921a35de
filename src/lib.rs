//! VR Stream Relay Library
//!
//! Signed-URL streaming relay for VR players sitting in front of a media
//! server. Players receive short-lived HMAC-signed links and fetch media
//! through `/proxy/...`, which verifies the token and streams bytes from one
//! fixed internal origin with `Range` support.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod origin;
pub mod security;

pub use config::RelayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
