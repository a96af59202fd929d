//! Composite status snapshot.

use crate::EntitlementState;
use serde::{Deserialize, Serialize};

/// Immutable view of the whole ad subsystem, recomputed on every broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// Monotonic publish counter; zero for snapshots that were never published.
    pub version: u64,
    /// SDK initialization succeeded.
    pub is_initialized: bool,
    /// SDK initialization settled, successfully or not. Stays false while
    /// initialization has not been attempted, as for an entitled user.
    pub initialization_complete: bool,
    /// Why initialization failed, if it did.
    pub initialization_error: Option<String>,
    pub premium: bool,
    pub staff_override: bool,
    pub entitlement_loaded: bool,
    pub interstitial_ready: bool,
    pub rewarded_ready: bool,
    /// Ads may be shown: entitlement known, not entitled, SDK initialized.
    pub should_show_ads: bool,
    /// Interstitials shown in this process.
    pub session_show_count: u32,
}

impl StatusSnapshot {
    /// Derives `should_show_ads` from the entitlement and init flags.
    #[must_use]
    pub fn should_show_ads_for(entitlement: &EntitlementState, is_initialized: bool) -> bool {
        entitlement.loaded && !entitlement.is_entitled() && is_initialized
    }

    /// Effective entitlement as seen by this snapshot.
    #[must_use]
    pub fn is_entitled(&self) -> bool {
        self.premium || self.staff_override
    }
}
