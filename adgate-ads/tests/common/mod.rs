//! Shared test helpers for ad engine tests.

#![allow(dead_code)]

use adgate_ads::mock::MockAdSdk;
use adgate_ads::{AdEngine, AdEngineConfig, AdUnitController, ControllerParams, UnitTimings};
use adgate_entitlement::{
    EntitlementResult, KeyValueStore, MemoryStore, PREMIUM_KEY, STAFF_OVERRIDE_KEY,
};
use adgate_types::{AdKind, ManualClock, StatusSnapshot};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Lets spawned tasks on the current-thread test runtime run to quiescence.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

/// Advances paused time and lets woken tasks run. Settles first so timers
/// spawned earlier have registered their deadlines.
pub async fn advance(duration: Duration) {
    settle().await;
    tokio::time::advance(duration).await;
    settle().await;
}

pub fn timings() -> UnitTimings {
    UnitTimings {
        load_retry_delay: Duration::from_secs(10),
        reload_after_close_delay: Duration::from_secs(1),
        max_load_retries: 5,
    }
}

pub fn controller(kind: AdKind, sdk: Arc<MockAdSdk>) -> Arc<AdUnitController> {
    controller_with(kind, sdk, timings())
}

pub fn controller_with(
    kind: AdKind,
    sdk: Arc<MockAdSdk>,
    timings: UnitTimings,
) -> Arc<AdUnitController> {
    AdUnitController::new(
        ControllerParams {
            kind,
            placement_id: format!("test-{kind}"),
            timings,
            gate: None,
            on_change: None,
            runtime: None,
        },
        sdk,
    )
}

/// Storage pre-seeded with the given flags, as if persisted last session.
pub fn persisted(premium: bool, staff_override: bool) -> Arc<dyn KeyValueStore> {
    Arc::new(MemoryStore::with_values([
        (PREMIUM_KEY, if premium { "true" } else { "false" }),
        (STAFF_OVERRIDE_KEY, if staff_override { "true" } else { "false" }),
    ]))
}

/// Storage whose batched read takes `read_delay` of (paused) time.
pub struct SlowStore {
    pub inner: MemoryStore,
    pub read_delay: Duration,
}

impl SlowStore {
    pub fn new(read_delay: Duration) -> Arc<dyn KeyValueStore> {
        Arc::new(Self {
            inner: MemoryStore::new(),
            read_delay,
        })
    }
}

#[async_trait]
impl KeyValueStore for SlowStore {
    async fn get(&self, key: &str) -> EntitlementResult<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> EntitlementResult<()> {
        self.inner.set(key, value).await
    }

    async fn multi_get(&self, keys: &[&str]) -> EntitlementResult<Vec<Option<String>>> {
        tokio::time::sleep(self.read_delay).await;
        self.inner.multi_get(keys).await
    }
}

pub struct Harness {
    pub engine: Arc<AdEngine>,
    pub sdk: Arc<MockAdSdk>,
    pub clock: Arc<ManualClock>,
}

pub fn start(sdk: MockAdSdk, kv: Arc<dyn KeyValueStore>) -> Harness {
    start_with_config(AdEngineConfig::default(), sdk, kv)
}

pub fn start_with_config(
    config: AdEngineConfig,
    sdk: MockAdSdk,
    kv: Arc<dyn KeyValueStore>,
) -> Harness {
    let sdk = Arc::new(sdk);
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let engine = AdEngine::start_with_clock(config, kv, sdk.clone(), clock.clone());
    Harness { engine, sdk, clock }
}

/// Collects every snapshot a subscriber receives.
pub fn record(engine: &AdEngine) -> Arc<Mutex<Vec<Arc<StatusSnapshot>>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    engine.on_status_change(move |status| sink.lock().unwrap().push(status.clone()));
    seen
}
