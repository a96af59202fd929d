//! Life cycle of one full-screen ad surface.
//!
//! ```text
//!  Idle ──load──▶ Loading ──Loaded──▶ Ready ──show──▶ Showing ──Closed──▶ Closed
//!                   │                                   │                   │
//!               LoadFailed                         show error          reload timer
//!                   ▼                                   ▼                   │
//!                 Error ◀────────────────────────────────                  │
//!                   │ retry timer                                           │
//!                   └──────────────────────▶ Loading ◀──────────────────────┘
//! ```
//!
//! `teardown()` returns to `Idle` from any phase and drops the handle.
//! Every SDK event is matched against the current handle id; events for a
//! handle the controller no longer holds are ignored.

use crate::config::UnitTimings;
use crate::error::{AdsError, AdsResult};
use crate::rate_limit::{RateDecision, RateLimiter};
use crate::sdk::{AdEvent, AdEventSink, AdSdkAdapter, AdUnitHandle, EventTarget};
use adgate_types::{AdKind, Clock, HandleId, Reward};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::runtime::Handle as RuntimeHandle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Phase of an ad unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdPhase {
    Idle,
    Loading,
    Ready,
    Showing,
    Closed,
    Error,
}

impl fmt::Display for AdPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Showing => "showing",
            Self::Closed => "closed",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// One-shot reward delivery for rewarded ads.
pub type RewardCallback = Box<dyn FnOnce(Reward) + Send>;

/// Called after phase changes that affect readiness.
pub type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

/// Interstitial gate: the shared limiter and the clock it reads.
#[derive(Clone)]
pub struct ShowGate {
    pub limiter: Arc<RateLimiter>,
    pub clock: Arc<dyn Clock>,
}

/// Everything a controller needs besides the SDK.
pub struct ControllerParams {
    pub kind: AdKind,
    pub placement_id: String,
    pub timings: UnitTimings,
    /// Applied before every show. Interstitials only.
    pub gate: Option<ShowGate>,
    pub on_change: Option<ChangeCallback>,
    /// Runtime for retry and reload timers. Defaults to the current one.
    pub runtime: Option<RuntimeHandle>,
}

struct UnitState {
    phase: AdPhase,
    /// Identity of the handle being loaded or held. Set as soon as a load
    /// starts, before the SDK has returned the handle object.
    current: Option<HandleId>,
    handle: Option<Arc<dyn AdUnitHandle>>,
    last_error: Option<String>,
    consecutive_failures: u32,
    active: bool,
    pending_reward: Option<RewardCallback>,
    /// Bumped whenever scheduled work must be invalidated.
    timer_seq: u64,
    timer: Option<JoinHandle<()>>,
}

impl UnitState {
    fn release_handle(&mut self) -> Option<Arc<dyn AdUnitHandle>> {
        self.current = None;
        self.handle.take()
    }
}

/// Finite-state machine around one SDK ad object.
pub struct AdUnitController {
    kind: AdKind,
    placement_id: String,
    sdk: Arc<dyn AdSdkAdapter>,
    timings: UnitTimings,
    gate: Option<ShowGate>,
    on_change: Option<ChangeCallback>,
    runtime: Option<RuntimeHandle>,
    state: Mutex<UnitState>,
    weak_self: Weak<AdUnitController>,
}

impl AdUnitController {
    /// Creates an idle controller. Call [`load`](Self::load) to fetch an ad.
    ///
    /// Retry and reload timers are spawned on `params.runtime`, or the
    /// Tokio runtime current at construction; without either, failed loads
    /// are not retried.
    pub fn new(params: ControllerParams, sdk: Arc<dyn AdSdkAdapter>) -> Arc<Self> {
        let runtime = params
            .runtime
            .or_else(|| RuntimeHandle::try_current().ok());
        if runtime.is_none() {
            warn!(kind = %params.kind, "Ad unit created outside a Tokio runtime, timers disabled");
        }
        Arc::new_cyclic(|weak_self| Self {
            kind: params.kind,
            placement_id: params.placement_id,
            sdk,
            timings: params.timings,
            gate: params.gate,
            on_change: params.on_change,
            runtime,
            state: Mutex::new(UnitState {
                phase: AdPhase::Idle,
                current: None,
                handle: None,
                last_error: None,
                consecutive_failures: 0,
                active: true,
                pending_reward: None,
                timer_seq: 0,
                timer: None,
            }),
            weak_self: weak_self.clone(),
        })
    }

    /// Surface kind.
    #[must_use]
    pub fn kind(&self) -> AdKind {
        self.kind
    }

    /// Placement this controller loads.
    #[must_use]
    pub fn placement_id(&self) -> &str {
        &self.placement_id
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> AdPhase {
        self.lock().phase
    }

    /// Whether an ad is loaded and can be shown now.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        let state = self.lock();
        state.active && state.phase == AdPhase::Ready
    }

    /// Whether the controller has been torn down.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    /// Most recent load or show failure.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    /// Load failures since the last successful load.
    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    /// Identity of the handle currently held, if any.
    #[must_use]
    pub fn current_handle(&self) -> Option<HandleId> {
        self.lock().current
    }

    fn lock(&self) -> MutexGuard<'_, UnitState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn notify(&self) {
        if let Some(cb) = &self.on_change {
            cb();
        }
    }

    /// Requests an ad. No-op while loading, ready, showing, or after teardown.
    pub async fn load(&self) {
        enum Start {
            Fresh(HandleId),
            Reuse(HandleId, Arc<dyn AdUnitHandle>),
        }

        let start = {
            let mut state = self.lock();
            if !state.active {
                return;
            }
            match state.phase {
                AdPhase::Loading | AdPhase::Ready | AdPhase::Showing => {
                    debug!(kind = %self.kind, phase = %state.phase, "Load skipped");
                    return;
                }
                AdPhase::Closed => match (state.current, state.handle.clone()) {
                    (Some(id), Some(handle)) => {
                        state.phase = AdPhase::Loading;
                        Start::Reuse(id, handle)
                    }
                    _ => {
                        let id = HandleId::new();
                        state.phase = AdPhase::Loading;
                        state.current = Some(id);
                        Start::Fresh(id)
                    }
                },
                AdPhase::Idle | AdPhase::Error => {
                    let id = HandleId::new();
                    state.phase = AdPhase::Loading;
                    state.current = Some(id);
                    Start::Fresh(id)
                }
            }
        };
        self.notify();

        let (id, handle) = match start {
            Start::Reuse(id, handle) => (id, handle),
            Start::Fresh(id) => {
                let target: Weak<dyn EventTarget> = self.weak_self.clone();
                let sink = AdEventSink::new(id, target);
                match self.sdk.create_ad_unit(self.kind, &self.placement_id, sink) {
                    Ok(handle) => {
                        let mut state = self.lock();
                        if state.current != Some(id) {
                            debug!(kind = %self.kind, handle = %id, "Torn down while creating ad unit");
                            drop(state);
                            return;
                        }
                        state.handle = Some(handle.clone());
                        if state.phase != AdPhase::Loading {
                            return;
                        }
                        (id, handle)
                    }
                    Err(e) => {
                        self.on_load_failed(id, e.to_string());
                        return;
                    }
                }
            }
        };

        debug!(kind = %self.kind, handle = %id, placement = %self.placement_id, "Requesting ad");
        if let Err(e) = handle.request().await {
            self.on_load_failed(id, e.to_string());
        }
    }

    /// Shows an interstitial. Applies the rate limiter if one is set.
    pub async fn show(&self, context: Option<&str>) -> AdsResult<()> {
        self.present(context, None).await
    }

    /// Shows a rewarded ad; `on_reward` runs at most once.
    pub async fn show_rewarded(&self, on_reward: RewardCallback) -> AdsResult<()> {
        self.present(None, Some(on_reward)).await
    }

    async fn present(
        &self,
        context: Option<&str>,
        reward: Option<RewardCallback>,
    ) -> AdsResult<()> {
        let (id, handle) = {
            let mut state = self.lock();
            if !state.active || state.phase != AdPhase::Ready {
                return Err(AdsError::NotReady(self.kind));
            }
            let (Some(id), Some(handle)) = (state.current, state.handle.clone()) else {
                return Err(AdsError::NotReady(self.kind));
            };
            if let Some(gate) = &self.gate {
                match gate.limiter.try_consume(gate.clock.now_ms()) {
                    RateDecision::Allowed => {}
                    RateDecision::CooldownActive { remaining_ms } => {
                        return Err(AdsError::CooldownActive { remaining_ms });
                    }
                    RateDecision::SessionLimitReached => {
                        return Err(AdsError::SessionLimitReached);
                    }
                }
            }
            state.phase = AdPhase::Showing;
            state.pending_reward = reward;
            (id, handle)
        };
        self.notify();

        info!(kind = %self.kind, handle = %id, context = context.unwrap_or(""), "Showing ad");
        match handle.show(context).await {
            Ok(()) => Ok(()),
            Err(e) => {
                let reason = e.to_string();
                warn!(kind = %self.kind, handle = %id, "Ad show failed: {}", reason);
                let released = {
                    let mut state = self.lock();
                    if state.current == Some(id) && state.phase == AdPhase::Showing {
                        state.phase = AdPhase::Error;
                        state.last_error = Some(reason.clone());
                        state.pending_reward = None;
                        let released = state.release_handle();
                        self.schedule_load(&mut state, self.timings.reload_after_close_delay);
                        released
                    } else {
                        None
                    }
                };
                drop(released);
                self.notify();
                Err(AdsError::ShowFailed(reason))
            }
        }
    }

    /// Drops the handle and returns to `Idle`. Safe from any phase; later
    /// SDK events for the dropped handle are ignored. The controller stays
    /// inert afterwards.
    pub fn teardown(&self) {
        let released = {
            let mut state = self.lock();
            state.active = false;
            state.phase = AdPhase::Idle;
            state.pending_reward = None;
            state.timer_seq += 1;
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            state.release_handle()
        };
        if released.is_some() {
            debug!(kind = %self.kind, "Ad unit torn down");
        }
    }

    fn on_load_failed(&self, id: HandleId, reason: String) {
        let released = {
            let mut state = self.lock();
            if state.current != Some(id) || state.phase != AdPhase::Loading {
                debug!(kind = %self.kind, handle = %id, "Ignoring stale load failure");
                return;
            }
            state.phase = AdPhase::Error;
            state.last_error = Some(reason.clone());
            state.consecutive_failures += 1;
            let failures = state.consecutive_failures;
            let released = state.release_handle();
            if state.active && failures <= self.timings.max_load_retries {
                warn!(
                    kind = %self.kind,
                    attempt = failures,
                    retry_in_ms = self.timings.load_retry_delay.as_millis() as u64,
                    "Ad load failed: {}", reason
                );
                self.schedule_load(&mut state, self.timings.load_retry_delay);
            } else {
                warn!(kind = %self.kind, failures, "Ad load failed, giving up: {}", reason);
            }
            released
        };
        drop(released);
        self.notify();
    }

    fn schedule_load(&self, state: &mut UnitState, delay: Duration) {
        let Some(runtime) = &self.runtime else {
            return;
        };
        state.timer_seq += 1;
        let seq = state.timer_seq;
        let weak = self.weak_self.clone();
        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(this) = weak.upgrade() else {
                return;
            };
            {
                let mut state = this.lock();
                if state.timer_seq != seq || !state.active {
                    return;
                }
                state.timer = None;
            }
            this.load().await;
        });
        if let Some(previous) = state.timer.replace(task) {
            previous.abort();
        }
    }
}

impl EventTarget for AdUnitController {
    fn on_event(&self, handle: HandleId, event: AdEvent) {
        match event {
            AdEvent::Loaded => {
                {
                    let mut state = self.lock();
                    if state.current != Some(handle) || state.phase != AdPhase::Loading {
                        debug!(kind = %self.kind, %handle, "Ignoring stale Loaded");
                        return;
                    }
                    state.phase = AdPhase::Ready;
                    state.consecutive_failures = 0;
                    state.last_error = None;
                }
                info!(kind = %self.kind, %handle, "Ad loaded");
                self.notify();
            }
            AdEvent::LoadFailed { reason } => self.on_load_failed(handle, reason),
            AdEvent::Opened => {
                debug!(kind = %self.kind, %handle, "Ad opened");
            }
            AdEvent::Closed => {
                {
                    let mut state = self.lock();
                    if state.current != Some(handle)
                        || !matches!(state.phase, AdPhase::Showing | AdPhase::Ready)
                    {
                        debug!(kind = %self.kind, %handle, "Ignoring stale Closed");
                        return;
                    }
                    state.phase = AdPhase::Closed;
                    self.schedule_load(&mut state, self.timings.reload_after_close_delay);
                }
                debug!(kind = %self.kind, %handle, "Ad closed, scheduling reload");
                self.notify();
            }
            AdEvent::Rewarded(reward) => {
                let callback = {
                    let mut state = self.lock();
                    if state.current != Some(handle) {
                        debug!(kind = %self.kind, %handle, "Ignoring stale reward");
                        return;
                    }
                    state.pending_reward.take()
                };
                match callback {
                    Some(cb) => {
                        info!(kind = %self.kind, amount = reward.amount, "Reward earned");
                        cb(reward);
                    }
                    None => debug!(kind = %self.kind, "Duplicate reward event ignored"),
                }
            }
        }
    }
}

impl Drop for AdUnitController {
    fn drop(&mut self) {
        let state = self
            .state
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
    }
}
