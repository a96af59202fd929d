//! Core type definitions for the adgate ad delivery engine.
//!
//! This crate defines the plain value types shared by the entitlement store
//! and the ad engine:
//! - Entitlement state (premium / staff override)
//! - Ad surface kinds, banner configuration and rewards
//! - The composite status snapshot broadcast to UI observers
//! - Ad unit handle identifiers (UUID v7)
//! - A millisecond clock abstraction
//!
//! Nothing here performs I/O or owns an async runtime.

mod ad;
mod clock;
mod entitlement;
mod ids;
mod status;

pub use ad::{AdKind, BannerConfig, BannerSize, Reward};
pub use clock::{Clock, ManualClock, SystemClock};
pub use entitlement::EntitlementState;
pub use ids::HandleId;
pub use status::StatusSnapshot;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown ad kind: {0}")]
    UnknownAdKind(String),

    #[error("unknown banner size: {0}")]
    UnknownBannerSize(String),
}
