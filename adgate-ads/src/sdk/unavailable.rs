use super::{AdEventSink, AdSdkAdapter, AdUnitHandle};
use crate::error::{AdsError, AdsResult};
use adgate_types::AdKind;
use async_trait::async_trait;
use std::sync::Arc;

/// Adapter for builds or platforms without an ad SDK.
///
/// Every operation fails with [`AdsError::SdkUnavailable`], so the engine
/// settles initialization as failed and never creates ad units.
#[derive(Debug, Clone)]
pub struct UnavailableSdk {
    reason: String,
}

impl UnavailableSdk {
    /// Creates the adapter, recording why the SDK is missing.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Why the SDK is missing.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl Default for UnavailableSdk {
    fn default() -> Self {
        Self::new("ad SDK not present on this platform")
    }
}

#[async_trait]
impl AdSdkAdapter for UnavailableSdk {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn supports_banners(&self) -> bool {
        false
    }

    async fn initialize(&self) -> AdsResult<()> {
        Err(AdsError::SdkUnavailable(self.reason.clone()))
    }

    fn create_ad_unit(
        &self,
        _kind: AdKind,
        _placement_id: &str,
        _sink: AdEventSink,
    ) -> AdsResult<Arc<dyn AdUnitHandle>> {
        Err(AdsError::SdkUnavailable(self.reason.clone()))
    }
}
