//! Entitlement state.

use serde::{Deserialize, Serialize};

/// The user's entitlement flags as cached by the entitlement store.
///
/// `loaded` is false only until the first load or runtime update completes
/// and never reverts afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntitlementState {
    /// Paid subscription or purchase.
    pub premium: bool,
    /// Staff/admin override granted upstream.
    pub staff_override: bool,
    /// Whether the first load from storage has completed.
    pub loaded: bool,
}

impl EntitlementState {
    /// State before anything has been read.
    #[must_use]
    pub const fn unloaded() -> Self {
        Self {
            premium: false,
            staff_override: false,
            loaded: false,
        }
    }

    /// A loaded state with the given flags.
    #[must_use]
    pub const fn loaded(premium: bool, staff_override: bool) -> Self {
        Self {
            premium,
            staff_override,
            loaded: true,
        }
    }

    /// Effective entitlement: either flag exempts the user from ads.
    #[must_use]
    pub const fn is_entitled(&self) -> bool {
        self.premium || self.staff_override
    }
}
