//! Entitlement-gated ad delivery engine.
//!
//! Decides whether and how to load, rate-limit and display third-party ad
//! surfaces (banner, interstitial, rewarded) for an app with free, premium
//! and staff-override tiers.
//!
//! # Architecture
//!
//! ## Components
//!
//! - **Entitlement** (`adgate-entitlement`): persisted premium / staff flags
//! - **RateLimiter**: cooldown and per-session cap for interstitials
//! - **AdUnitController**: state machine around one SDK ad object, with
//!   auto-retry and auto-reload
//! - **SdkInitializer**: one-shot SDK startup shared by all callers
//! - **Broadcaster**: status fan-out with replay-on-subscribe
//! - **AdEngine**: the facade UI code talks to
//!
//! ## Startup
//!
//! 1. Load entitlement from storage (never fails)
//! 2. If not entitled, initialize the SDK (never fails, may settle false)
//! 3. If initialized, create and load the interstitial and rewarded units
//!
//! `set_entitlement` can interrupt this at any point.
//!
//! # Example
//!
//! ```no_run
//! use adgate_ads::{AdEngine, AdEngineConfig, mock::MockAdSdk};
//! use adgate_entitlement::MemoryStore;
//! use std::sync::Arc;
//!
//! # async fn run() {
//! let engine = AdEngine::start(
//!     AdEngineConfig::default(),
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(MockAdSdk::new().with_auto_fill()),
//! );
//! engine.wait_for_initialization().await;
//! let shown = engine.show_interstitial("level_complete").await;
//! # let _ = shown;
//! # }
//! ```

pub mod broadcast;
mod config;
pub mod controller;
mod engine;
mod error;
pub mod initializer;
pub mod rate_limit;
pub mod sdk;

pub use broadcast::{Broadcaster, Subscription};
pub use config::{AdEngineConfig, AdVendor, Placements, Platform, UnitTimings};
pub use controller::{AdPhase, AdUnitController, ControllerParams, RewardCallback, ShowGate};
pub use engine::{AdEngine, EnginePhase, StatusBroadcaster, StatusSubscription};
pub use error::{AdsError, AdsResult};
pub use initializer::{InitState, SdkInitializer};
pub use rate_limit::{RateDecision, RateLimitState, RateLimiter};
pub use sdk::{
    mock, AdEvent, AdEventSink, AdSdkAdapter, AdUnitHandle, BridgeCommand, BridgeHost, BridgeReply,
    BridgeSdk, EventTarget, HostCapabilities, UnavailableSdk, DEFAULT_REPLY_TIMEOUT,
};
