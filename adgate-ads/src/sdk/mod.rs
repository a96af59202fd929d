//! Ad SDK abstraction.
//!
//! Defines the capability interface the engine drives, so one controller
//! and one engine work with any ad network. Adapters provided here:
//! - [`UnavailableSdk`]: the SDK is missing from this build or platform
//! - [`BridgeSdk`]: forwards to a native SDK living in the host app
//! - [`mock::MockAdSdk`]: scripted, for tests and the simulator
//!
//! SDK callbacks flow back through an [`AdEventSink`] bound to the handle
//! they belong to.

mod bridge;
pub mod mock;
mod unavailable;

pub use bridge::{
    BridgeCommand, BridgeHost, BridgeReply, BridgeSdk, DEFAULT_REPLY_TIMEOUT, HostCapabilities,
};
pub use unavailable::UnavailableSdk;

use crate::error::AdsResult;
use adgate_types::{AdKind, HandleId, Reward};
use async_trait::async_trait;
use std::sync::{Arc, Weak};

/// Callback events raised by the SDK for one ad unit handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdEvent {
    /// An ad finished loading and can be shown.
    Loaded,
    /// Loading failed.
    LoadFailed { reason: String },
    /// The ad is on screen.
    Opened,
    /// The user dismissed the ad.
    Closed,
    /// The user earned the reward (rewarded ads only).
    Rewarded(Reward),
}

/// Receiver of SDK events, implemented by the ad unit controller.
pub trait EventTarget: Send + Sync {
    /// Handles `event` raised for `handle`.
    fn on_event(&self, handle: HandleId, event: AdEvent);
}

/// Where an adapter delivers events for one handle.
///
/// Holds the target weakly: events for a controller that no longer exists
/// are dropped.
#[derive(Clone)]
pub struct AdEventSink {
    handle: HandleId,
    target: Weak<dyn EventTarget>,
}

impl AdEventSink {
    /// Creates a sink delivering events for `handle` to `target`.
    pub fn new(handle: HandleId, target: Weak<dyn EventTarget>) -> Self {
        Self { handle, target }
    }

    /// The handle this sink reports for.
    #[must_use]
    pub fn handle_id(&self) -> HandleId {
        self.handle
    }

    /// Delivers `event`. Returns false if the target is gone.
    pub fn emit(&self, event: AdEvent) -> bool {
        match self.target.upgrade() {
            Some(target) => {
                target.on_event(self.handle, event);
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for AdEventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdEventSink")
            .field("handle", &self.handle)
            .field("attached", &(self.target.strong_count() > 0))
            .finish()
    }
}

/// One SDK ad object. Owned exclusively by its controller; dropping it
/// releases the SDK side.
#[async_trait]
pub trait AdUnitHandle: Send + Sync {
    /// Asks the SDK to fetch an ad. Completion arrives as an [`AdEvent`].
    async fn request(&self) -> AdsResult<()>;

    /// Presents the loaded ad. Resolves once the SDK has displayed it.
    async fn show(&self, context: Option<&str>) -> AdsResult<()>;
}

/// Capability interface over an ad network SDK.
#[async_trait]
pub trait AdSdkAdapter: Send + Sync {
    /// Adapter name for logs.
    fn name(&self) -> &str;

    /// Whether the SDK is present at all. Checked once at startup.
    fn is_available(&self) -> bool;

    /// Whether this platform can render banners.
    fn supports_banners(&self) -> bool;

    /// Starts the SDK.
    async fn initialize(&self) -> AdsResult<()>;

    /// Creates an ad unit for `placement_id` whose events go to `sink`.
    fn create_ad_unit(
        &self,
        kind: AdKind,
        placement_id: &str,
        sink: AdEventSink,
    ) -> AdsResult<Arc<dyn AdUnitHandle>>;
}
