//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Link / manifest request:
//!     → access guard (cidr.rs: client address vs allow-list)
//!     → token.rs (mint signed stream URL)
//!
//! Stream request:
//!     → resource_id.rs (identifier shape, no secret work yet)
//!     → token.rs (expiry + constant-time signature check)
//!     → origin relay
//! ```
//!
//! # Design Decisions
//! - Fail closed: an address that cannot be determined is denied
//! - Token failures never say which check failed
//! - No server-side token state; every request is re-verified

pub mod cidr;
pub mod resource_id;
pub mod token;

pub use cidr::{is_allowed, matches, CidrRange};
pub use resource_id::ResourceIdFormat;
pub use token::{AccessToken, Clock, SystemClock, TokenCodec, Verdict, VerifiedResource};
