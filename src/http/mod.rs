//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → middleware/access_control.rs (IP allow-list, per route)
//!     → link.rs  (mint signed stream URL)
//!     → relay.rs (verify token, forward to origin)
//!     → response.rs (copy headers, stream body in chunks)
//!     → Send to client
//! ```

pub mod error;
pub mod link;
pub mod middleware;
pub mod relay;
pub mod request;
pub mod response;
pub mod server;

pub use error::RelayError;
pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer, Settings};
