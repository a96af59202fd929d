//! Error types for the ad engine.
//!
//! None of these cross the public [`AdEngine`](crate::AdEngine) boundary;
//! the engine maps them to `false` / `None` and logs them.

use adgate_types::AdKind;
use thiserror::Error;

/// Result type for ad operations.
pub type AdsResult<T> = Result<T, AdsError>;

/// Errors that can occur while loading or showing ads.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdsError {
    /// The ad SDK is not present in this process.
    #[error("ad SDK unavailable: {0}")]
    SdkUnavailable(String),

    /// SDK initialization failed. Not retried within the process.
    #[error("ad SDK initialization failed: {0}")]
    InitializationFailed(String),

    /// An ad failed to load. Retried by the controller.
    #[error("ad load failed: {0}")]
    LoadFailed(String),

    /// An ad failed to show. Not retried.
    #[error("ad show failed: {0}")]
    ShowFailed(String),

    /// Shown too recently.
    #[error("cooldown active ({remaining_ms} ms remaining)")]
    CooldownActive { remaining_ms: i64 },

    /// Per-session cap reached.
    #[error("session limit reached")]
    SessionLimitReached,

    /// No ad of this kind is ready to show.
    #[error("{0} ad not ready")]
    NotReady(AdKind),

    /// The user is entitled to an ad-free experience.
    #[error("user is entitled, ads suppressed")]
    Entitled,

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl AdsError {
    /// Returns true for policy rejections, which are not faults.
    #[must_use]
    pub fn is_policy_rejection(&self) -> bool {
        matches!(
            self,
            Self::CooldownActive { .. } | Self::SessionLimitReached | Self::Entitled
        )
    }
}
