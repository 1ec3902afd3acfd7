//! Flagstone Core
//!
//! Contains the fundamental runtime pieces:
//! - Component registry with multi-word membership bitmasks
//! - Membership engine (immediate attach, deferred detach)
//! - System subscriptions kept in sync with membership
//! - Binary snapshot codec

pub mod config;
pub mod ecs;
pub mod snapshot;

pub use config::{ConfigError, WorldConfig};
pub use ecs::{World, WorldError};
pub use snapshot::SnapshotError;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
