//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RelayConfig (validated, immutable)
//!     → shared via Arc snapshot to every request
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of the snapshot (arc-swap)
//!     → requests started afterwards see the new secret / allow-list
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    IpRestrictionConfig, ListenerConfig, ObservabilityConfig, OriginConfig, PlaybackConfig,
    Projection, RelayConfig, SigningConfig, StereoMode, StreamConfig, TimeoutConfig,
};
pub use watcher::ConfigWatcher;
