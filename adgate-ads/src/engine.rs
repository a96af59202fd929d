//! The ad engine facade.
//!
//! Startup runs entitlement load, then (only for un-entitled users) SDK
//! initialization, then creates the interstitial and rewarded controllers.
//! Runtime entitlement changes short-circuit that pipeline: becoming
//! entitled tears the controllers down, losing entitlement spins them up.
//!
//! Every public method resolves to a plain value. Failures are logged and
//! surface as `false`, `None`, or `status().initialization_error`.

use crate::broadcast::{Broadcaster, Subscription};
use crate::config::AdEngineConfig;
use crate::controller::{AdUnitController, ControllerParams, ShowGate};
use crate::error::AdsError;
use crate::initializer::SdkInitializer;
use crate::rate_limit::RateLimiter;
use crate::sdk::AdSdkAdapter;
use adgate_entitlement::{EntitlementStore, KeyValueStore};
use adgate_types::{AdKind, BannerConfig, Clock, Reward, StatusSnapshot, SystemClock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::runtime::Handle as RuntimeHandle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Broadcaster specialised to engine status.
pub type StatusBroadcaster = Broadcaster<StatusSnapshot>;

/// Handle returned by [`AdEngine::on_status_change`].
pub type StatusSubscription = Subscription<StatusSnapshot>;

/// Coarse engine life cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    /// Entitlement or SDK startup still running.
    Bootstrapping,
    /// Startup finished; changes now come from `set_entitlement`.
    Ready,
    /// `shutdown` was called.
    ShutDown,
}

struct AdUnits {
    interstitial: Arc<AdUnitController>,
    rewarded: Arc<AdUnitController>,
}

impl AdUnits {
    fn teardown(&self) {
        self.interstitial.teardown();
        self.rewarded.teardown();
    }
}

/// Entitlement-gated ad delivery engine.
///
/// Owned by the application's composition root and shared as
/// `Arc<AdEngine>`.
pub struct AdEngine {
    config: AdEngineConfig,
    sdk: Arc<dyn AdSdkAdapter>,
    entitlement: EntitlementStore,
    initializer: SdkInitializer,
    rate_limiter: Arc<RateLimiter>,
    clock: Arc<dyn Clock>,
    units: Mutex<Option<AdUnits>>,
    broadcaster: StatusBroadcaster,
    /// Flips to true once bootstrap has finished or was cut short by shutdown.
    bootstrap_done: watch::Sender<bool>,
    shut_down: AtomicBool,
    bootstrap_task: Mutex<Option<JoinHandle<()>>>,
    runtime: RuntimeHandle,
    weak_self: Weak<AdEngine>,
}

impl AdEngine {
    /// Creates the engine and starts the bootstrap pipeline in the
    /// background.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start(
        config: AdEngineConfig,
        kv: Arc<dyn KeyValueStore>,
        sdk: Arc<dyn AdSdkAdapter>,
    ) -> Arc<Self> {
        Self::start_with_clock(config, kv, sdk, Arc::new(SystemClock))
    }

    /// Like [`start`](Self::start) with an explicit clock for rate limiting.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start_with_clock(
        config: AdEngineConfig,
        kv: Arc<dyn KeyValueStore>,
        sdk: Arc<dyn AdSdkAdapter>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        let runtime = RuntimeHandle::current();
        let engine = Arc::new_cyclic(|weak_self: &Weak<AdEngine>| Self {
            rate_limiter: Arc::new(RateLimiter::new(config.cooldown_ms, config.max_per_session)),
            initializer: SdkInitializer::new(sdk.clone()),
            entitlement: EntitlementStore::new(kv),
            config,
            sdk,
            clock,
            units: Mutex::new(None),
            broadcaster: StatusBroadcaster::new(),
            bootstrap_done: watch::Sender::new(false),
            shut_down: AtomicBool::new(false),
            bootstrap_task: Mutex::new(None),
            runtime: runtime.clone(),
            weak_self: weak_self.clone(),
        });

        let weak = Arc::downgrade(&engine);
        engine
            .entitlement
            .set_change_listener(Arc::new(move |entitled| {
                if let Some(engine) = weak.upgrade() {
                    engine.on_entitlement_changed(entitled);
                }
            }));

        let task = runtime.spawn(engine.clone().bootstrap());
        if let Ok(mut slot) = engine.bootstrap_task.lock() {
            *slot = Some(task);
        }
        info!(sdk = engine.sdk.name(), "Ad engine starting");
        engine
    }

    async fn bootstrap(self: Arc<Self>) {
        let entitlement = self.entitlement.load().await;
        self.publish();

        if entitlement.is_entitled() {
            info!("User entitled, skipping ad SDK initialization");
        } else if self.initializer.initialize().await {
            self.ensure_units();
        }

        self.bootstrap_done.send_replace(true);
        debug!("Ad engine bootstrap finished");
        self.publish();
    }

    // ── Public contract ──────────────────────────────────────────

    /// Current status, computed now.
    #[must_use]
    pub fn status(&self) -> StatusSnapshot {
        self.snapshot(self.broadcaster.version())
    }

    /// Subscribes to status changes. If a status has been published, the
    /// callback also receives it once, asynchronously.
    pub fn on_status_change<F>(&self, callback: F) -> StatusSubscription
    where
        F: Fn(&Arc<StatusSnapshot>) + Send + Sync + 'static,
    {
        self.broadcaster.subscribe(callback)
    }

    /// Shows an interstitial if the user is not entitled, the SDK is
    /// initialized, an ad is ready, and the rate limiter allows it.
    pub async fn show_interstitial(&self, context: &str) -> bool {
        let unit = match self.gate(AdKind::Interstitial) {
            Ok(unit) => unit,
            Err(e) => {
                debug!(context, "Interstitial not shown: {}", e);
                return false;
            }
        };
        match unit.show(Some(context)).await {
            Ok(()) => true,
            Err(e) if e.is_policy_rejection() => {
                info!(context, "Interstitial suppressed: {}", e);
                false
            }
            Err(e) => {
                debug!(context, "Interstitial not shown: {}", e);
                false
            }
        }
    }

    /// Shows a rewarded ad under the same gating as interstitials, minus
    /// rate limiting. `on_reward` runs at most once.
    pub async fn show_rewarded<F>(&self, on_reward: F) -> bool
    where
        F: FnOnce(Reward) + Send + 'static,
    {
        let unit = match self.gate(AdKind::Rewarded) {
            Ok(unit) => unit,
            Err(e) => {
                debug!("Rewarded ad not shown: {}", e);
                return false;
            }
        };
        match unit.show_rewarded(Box::new(on_reward)).await {
            Ok(()) => true,
            Err(e) => {
                debug!("Rewarded ad not shown: {}", e);
                false
            }
        }
    }

    /// Banner placement and size, or `None` when banners must not show.
    #[must_use]
    pub fn banner_config(&self) -> Option<BannerConfig> {
        let entitlement = self.entitlement.get();
        if !entitlement.loaded
            || entitlement.is_entitled()
            || !self.initializer.is_initialized()
            || !self.sdk.supports_banners()
            || self.is_shut_down()
        {
            return None;
        }
        Some(BannerConfig {
            placement_id: self.config.placements().banner,
            size: self.config.banner_size,
        })
    }

    /// Applies a runtime entitlement change (purchase, staff detection).
    pub async fn set_entitlement(&self, premium: bool, staff_override: bool) {
        let was = self.entitlement.get().is_entitled();
        self.entitlement.set(premium, staff_override).await;
        // A flip has already been handled and published by the listener.
        if was == (premium || staff_override) {
            self.publish();
        }
    }

    /// Waits until SDK initialization settles, bounded by
    /// `init_wait_timeout_ms`. Returns whether the SDK is initialized.
    ///
    /// Returns false as soon as bootstrap finishes without starting
    /// initialization (entitled user, or shutdown).
    pub async fn wait_for_initialization(&self) -> bool {
        let deadline = Instant::now() + self.config.init_wait_timeout();
        let mut done = self.bootstrap_done.subscribe();
        let bootstrapped = matches!(
            tokio::time::timeout_at(deadline, done.wait_for(|finished| *finished)).await,
            Ok(Ok(_))
        );
        if bootstrapped && !self.initializer.is_started() {
            debug!("Ad SDK initialization was not attempted");
            return false;
        }
        self.initializer
            .wait_for_initialization(deadline.saturating_duration_since(Instant::now()))
            .await
    }

    // ── Introspection ────────────────────────────────────────────

    /// Coarse life cycle phase.
    #[must_use]
    pub fn phase(&self) -> EnginePhase {
        if self.is_shut_down() {
            EnginePhase::ShutDown
        } else if *self.bootstrap_done.borrow() {
            EnginePhase::Ready
        } else {
            EnginePhase::Bootstrapping
        }
    }

    /// The entitlement store.
    #[must_use]
    pub fn entitlement(&self) -> &EntitlementStore {
        &self.entitlement
    }

    /// The SDK initializer.
    #[must_use]
    pub fn initializer(&self) -> &SdkInitializer {
        &self.initializer
    }

    /// The interstitial rate limiter.
    #[must_use]
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Engine configuration.
    #[must_use]
    pub fn config(&self) -> &AdEngineConfig {
        &self.config
    }

    /// Controller for `kind`, if ad units currently exist.
    #[must_use]
    pub fn controller(&self, kind: AdKind) -> Option<Arc<AdUnitController>> {
        let units = self.lock_units();
        units.as_ref().and_then(|u| match kind {
            AdKind::Interstitial => Some(u.interstitial.clone()),
            AdKind::Rewarded => Some(u.rewarded.clone()),
            AdKind::Banner => None,
        })
    }

    /// Stops background work and drops all ad units. Further calls to the
    /// show methods return false.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(task) = self.bootstrap_task.lock().ok().and_then(|mut t| t.take()) {
            task.abort();
        }
        if let Some(units) = self.lock_units().take() {
            units.teardown();
        }
        self.bootstrap_done.send_replace(true);
        info!("Ad engine shut down");
        self.publish();
    }

    // ── Internals ────────────────────────────────────────────────

    fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    fn lock_units(&self) -> MutexGuard<'_, Option<AdUnits>> {
        self.units
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Entry checks shared by every show call. Entitlement is re-read on
    /// every call, not only when controllers were created.
    fn gate(&self, kind: AdKind) -> Result<Arc<AdUnitController>, AdsError> {
        if self.is_shut_down() {
            return Err(AdsError::NotReady(kind));
        }
        let entitlement = self.entitlement.get();
        if entitlement.is_entitled() {
            return Err(AdsError::Entitled);
        }
        if !self.initializer.is_initialized() {
            return Err(AdsError::NotReady(kind));
        }
        let unit = self.controller(kind).ok_or(AdsError::NotReady(kind))?;
        if !unit.is_ready() {
            return Err(AdsError::NotReady(kind));
        }
        Ok(unit)
    }

    fn snapshot(&self, version: u64) -> StatusSnapshot {
        let entitlement = self.entitlement.get();
        let is_initialized = self.initializer.is_initialized();
        let (interstitial_ready, rewarded_ready) = match self.lock_units().as_ref() {
            Some(units) => (units.interstitial.is_ready(), units.rewarded.is_ready()),
            None => (false, false),
        };
        StatusSnapshot {
            version,
            is_initialized,
            initialization_complete: self.initializer.is_settled(),
            initialization_error: self.initializer.error(),
            premium: entitlement.premium,
            staff_override: entitlement.staff_override,
            entitlement_loaded: entitlement.loaded,
            interstitial_ready,
            rewarded_ready,
            should_show_ads: StatusSnapshot::should_show_ads_for(&entitlement, is_initialized)
                && !self.is_shut_down(),
            session_show_count: self.rate_limiter.session_show_count(),
        }
    }

    fn publish(&self) {
        let snapshot = self.broadcaster.publish_with(|version| self.snapshot(version));
        debug!(
            version = snapshot.version,
            should_show_ads = snapshot.should_show_ads,
            interstitial_ready = snapshot.interstitial_ready,
            rewarded_ready = snapshot.rewarded_ready,
            "Status published"
        );
    }

    /// Creates and starts loading both controllers if the user is known to
    /// be un-entitled and the SDK is up. Idempotent.
    fn ensure_units(&self) {
        let created = {
            let mut units = self.lock_units();
            let entitlement = self.entitlement.get();
            if units.is_some()
                || self.is_shut_down()
                || !entitlement.loaded
                || entitlement.is_entitled()
                || !self.initializer.is_initialized()
            {
                return;
            }
            let fresh = AdUnits {
                interstitial: self.make_controller(AdKind::Interstitial),
                rewarded: self.make_controller(AdKind::Rewarded),
            };
            let handles = (fresh.interstitial.clone(), fresh.rewarded.clone());
            *units = Some(fresh);
            handles
        };

        info!("Ad units created");
        let (interstitial, rewarded) = created;
        self.runtime.spawn(async move {
            futures::future::join(interstitial.load(), rewarded.load()).await;
        });
    }

    fn make_controller(&self, kind: AdKind) -> Arc<AdUnitController> {
        let gate = (kind == AdKind::Interstitial).then(|| ShowGate {
            limiter: self.rate_limiter.clone(),
            clock: self.clock.clone(),
        });
        let weak = self.weak_self.clone();
        let params = ControllerParams {
            kind,
            placement_id: self.config.placements().for_kind(kind).to_string(),
            timings: self.config.unit_timings(),
            gate,
            on_change: Some(Arc::new(move || {
                if let Some(engine) = weak.upgrade() {
                    engine.publish();
                }
            })),
            runtime: Some(self.runtime.clone()),
        };
        AdUnitController::new(params, self.sdk.clone())
    }

    fn on_entitlement_changed(&self, entitled: bool) {
        if entitled {
            if let Some(units) = self.lock_units().take() {
                units.teardown();
                info!("User became entitled, ad units torn down");
            }
        } else if !self.entitlement.get().loaded {
            // Bootstrap picks up the runtime value once the load returns.
            debug!("User lost entitlement before entitlement load finished");
        } else if self.initializer.is_initialized() {
            info!("User lost entitlement, creating ad units");
            self.ensure_units();
        } else if !self.initializer.is_started() {
            // Initialization was skipped at startup because the user was entitled.
            info!("User lost entitlement, initializing ad SDK");
            let weak = self.weak_self.clone();
            self.runtime.spawn(async move {
                let Some(engine) = weak.upgrade() else {
                    return;
                };
                if engine.initializer.initialize().await {
                    engine.ensure_units();
                }
                engine.publish();
            });
        } else {
            warn!(
                state = ?self.initializer.state(),
                "User lost entitlement but ad SDK is not initialized"
            );
        }
        self.publish();
    }
}

impl Drop for AdEngine {
    fn drop(&mut self) {
        if let Some(task) = self.bootstrap_task.get_mut().ok().and_then(|t| t.take()) {
            task.abort();
        }
        if let Some(units) = self.units.get_mut().ok().and_then(|u| u.take()) {
            units.teardown();
        }
    }
}
