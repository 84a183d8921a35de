//! Internal origin subsystem.
//!
//! # Data Flow
//! ```text
//! VerifiedResource (token checked)
//!     → target.rs (substitute id into the fixed path template)
//!     → client.rs (one pooled hyper client, GET + optional Range)
//!     → origin response headers (body still unread)
//!     → handed to the relay for streaming
//! ```
//!
//! # Design Decisions
//! - Exactly one origin; the destination is never taken from the request
//! - The URL is built only from a verified identifier
//! - One client for the whole process, built at startup, no overall deadline

pub mod client;
pub mod target;

pub use client::{OriginClient, OriginError};
pub use target::OriginTarget;
