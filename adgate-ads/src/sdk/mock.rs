//! A scripted ad SDK for testing and simulation.
//!
//! Records every call and lets the caller fire SDK callbacks by hand, or
//! have them fire automatically (`auto_fill`, `auto_close`).

use super::{AdEvent, AdEventSink, AdSdkAdapter, AdUnitHandle};
use crate::error::{AdsError, AdsResult};
use adgate_types::{AdKind, HandleId, Reward};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
struct Behavior {
    auto_fill: AtomicBool,
    auto_close: AtomicBool,
    show_failure: Mutex<Option<String>>,
}

/// Everything the mock knows about one created ad unit.
#[derive(Debug)]
pub struct MockUnitRecord {
    kind: AdKind,
    placement_id: String,
    sink: AdEventSink,
    requests: AtomicUsize,
    contexts: Mutex<Vec<Option<String>>>,
    released: AtomicBool,
}

impl MockUnitRecord {
    /// Surface kind.
    pub fn kind(&self) -> AdKind {
        self.kind
    }

    /// Placement the unit was created for.
    pub fn placement_id(&self) -> &str {
        &self.placement_id
    }

    /// Identity of the handle.
    pub fn handle_id(&self) -> HandleId {
        self.sink.handle_id()
    }

    /// Number of `request()` calls.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Number of `show()` calls.
    pub fn shows(&self) -> usize {
        self.contexts.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Contexts passed to `show()`, in order.
    pub fn show_contexts(&self) -> Vec<Option<String>> {
        self.contexts.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Whether the engine dropped this handle.
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    /// Fires an SDK callback for this unit, even if it was released.
    pub fn emit(&self, event: AdEvent) -> bool {
        self.sink.emit(event)
    }
}

/// Scripted [`AdSdkAdapter`].
#[derive(Debug)]
pub struct MockAdSdk {
    available: bool,
    supports_banners: bool,
    init_result: Mutex<Result<(), String>>,
    init_delay: Mutex<Duration>,
    init_calls: AtomicUsize,
    create_failure: Mutex<Option<String>>,
    behavior: Arc<Behavior>,
    units: Mutex<Vec<Arc<MockUnitRecord>>>,
}

impl Default for MockAdSdk {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAdSdk {
    /// An available SDK that initializes successfully and supports banners.
    pub fn new() -> Self {
        Self {
            available: true,
            supports_banners: true,
            init_result: Mutex::new(Ok(())),
            init_delay: Mutex::new(Duration::ZERO),
            init_calls: AtomicUsize::new(0),
            create_failure: Mutex::new(None),
            behavior: Arc::new(Behavior::default()),
            units: Mutex::new(Vec::new()),
        }
    }

    /// An SDK that failed to load into the process.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Makes `initialize()` fail with `reason`.
    pub fn with_init_failure(self, reason: impl Into<String>) -> Self {
        if let Ok(mut r) = self.init_result.lock() {
            *r = Err(reason.into());
        }
        self
    }

    /// Makes `initialize()` take `delay` before settling.
    pub fn with_init_delay(self, delay: Duration) -> Self {
        if let Ok(mut d) = self.init_delay.lock() {
            *d = delay;
        }
        self
    }

    /// Reports no banner support.
    pub fn without_banners(mut self) -> Self {
        self.supports_banners = false;
        self
    }

    /// Fire `Loaded` from inside every `request()`.
    pub fn with_auto_fill(self) -> Self {
        self.set_auto_fill(true);
        self
    }

    /// Fire `Opened` (and `Rewarded` for rewarded units) then `Closed`
    /// from inside every successful `show()`.
    pub fn with_auto_close(self) -> Self {
        self.behavior.auto_close.store(true, Ordering::SeqCst);
        self
    }

    /// Toggles auto fill at runtime.
    pub fn set_auto_fill(&self, enabled: bool) {
        self.behavior.auto_fill.store(enabled, Ordering::SeqCst);
    }

    /// Makes subsequent `show()` calls fail with `reason`, or succeed if `None`.
    pub fn set_show_failure(&self, reason: Option<String>) {
        if let Ok(mut f) = self.behavior.show_failure.lock() {
            *f = reason;
        }
    }

    /// Makes subsequent `create_ad_unit` calls fail with `reason`, or succeed if `None`.
    pub fn set_create_failure(&self, reason: Option<String>) {
        if let Ok(mut f) = self.create_failure.lock() {
            *f = reason;
        }
    }

    /// Number of `initialize()` calls that reached the SDK.
    pub fn initialize_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    /// All units created for `kind`, oldest first.
    pub fn units(&self, kind: AdKind) -> Vec<Arc<MockUnitRecord>> {
        self.units
            .lock()
            .map(|u| u.iter().filter(|r| r.kind == kind).cloned().collect())
            .unwrap_or_default()
    }

    /// The most recently created unit for `kind`.
    pub fn latest(&self, kind: AdKind) -> Option<Arc<MockUnitRecord>> {
        self.units(kind).pop()
    }

    /// Fires `event` on the latest unit of `kind`.
    pub fn fire(&self, kind: AdKind, event: AdEvent) -> bool {
        self.latest(kind).is_some_and(|unit| unit.emit(event))
    }

    /// Total `show()` calls across all units of `kind`.
    pub fn show_calls(&self, kind: AdKind) -> usize {
        self.units(kind).iter().map(|u| u.shows()).sum()
    }
}

#[async_trait]
impl AdSdkAdapter for MockAdSdk {
    fn name(&self) -> &str {
        "mock"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn supports_banners(&self) -> bool {
        self.supports_banners
    }

    async fn initialize(&self) -> AdsResult<()> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        if !self.available {
            return Err(AdsError::SdkUnavailable("mock SDK missing".into()));
        }
        let delay = self.init_delay.lock().map(|d| *d).unwrap_or_default();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let result = self
            .init_result
            .lock()
            .map(|r| r.clone())
            .unwrap_or_else(|_| Err("mock poisoned".into()));
        result.map_err(AdsError::InitializationFailed)
    }

    fn create_ad_unit(
        &self,
        kind: AdKind,
        placement_id: &str,
        sink: AdEventSink,
    ) -> AdsResult<Arc<dyn AdUnitHandle>> {
        if let Some(reason) = self.create_failure.lock().ok().and_then(|f| f.clone()) {
            return Err(AdsError::LoadFailed(reason));
        }
        let record = Arc::new(MockUnitRecord {
            kind,
            placement_id: placement_id.to_string(),
            sink,
            requests: AtomicUsize::new(0),
            contexts: Mutex::new(Vec::new()),
            released: AtomicBool::new(false),
        });
        if let Ok(mut units) = self.units.lock() {
            units.push(record.clone());
        }
        Ok(Arc::new(MockUnit {
            record,
            behavior: self.behavior.clone(),
        }))
    }
}

struct MockUnit {
    record: Arc<MockUnitRecord>,
    behavior: Arc<Behavior>,
}

#[async_trait]
impl AdUnitHandle for MockUnit {
    async fn request(&self) -> AdsResult<()> {
        self.record.requests.fetch_add(1, Ordering::SeqCst);
        if self.behavior.auto_fill.load(Ordering::SeqCst) {
            self.record.emit(AdEvent::Loaded);
        }
        Ok(())
    }

    async fn show(&self, context: Option<&str>) -> AdsResult<()> {
        if let Ok(mut contexts) = self.record.contexts.lock() {
            contexts.push(context.map(str::to_string));
        }
        let failure = self
            .behavior
            .show_failure
            .lock()
            .ok()
            .and_then(|f| f.clone());
        if let Some(reason) = failure {
            return Err(AdsError::ShowFailed(reason));
        }
        if self.behavior.auto_close.load(Ordering::SeqCst) {
            self.record.emit(AdEvent::Opened);
            if self.record.kind == AdKind::Rewarded {
                self.record.emit(AdEvent::Rewarded(Reward::new("coins", 10)));
            }
            self.record.emit(AdEvent::Closed);
        }
        Ok(())
    }
}

impl Drop for MockUnit {
    fn drop(&mut self) {
        self.record.released.store(true, Ordering::SeqCst);
    }
}
