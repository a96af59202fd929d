//! Cached, persisted entitlement.

use crate::kv::KeyValueStore;
use adgate_types::EntitlementState;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info, warn};

/// Storage key for the premium flag.
pub const PREMIUM_KEY: &str = "entitlement.premium";

/// Storage key for the staff override flag.
pub const STAFF_OVERRIDE_KEY: &str = "entitlement.staff_override";

/// Callback fired with the new effective entitlement when it flips.
pub type ChangeListener = Arc<dyn Fn(bool) + Send + Sync>;

#[derive(Debug, Default)]
struct Cached {
    state: EntitlementState,
    /// A runtime `set` has happened; later loads must not overwrite it.
    runtime_set: bool,
}

/// Loads, persists and caches the user's entitlement.
///
/// All mutations go through [`load`](Self::load) and [`set`](Self::set).
/// [`get`](Self::get) never touches storage.
pub struct EntitlementStore {
    kv: Arc<dyn KeyValueStore>,
    cached: Mutex<Cached>,
    /// Serializes `set` calls so persisted and cached values agree.
    write_lock: tokio::sync::Mutex<()>,
    listener: RwLock<Option<ChangeListener>>,
}

impl EntitlementStore {
    /// Creates a store over `kv`. Nothing is read until [`load`](Self::load).
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            cached: Mutex::new(Cached::default()),
            write_lock: tokio::sync::Mutex::new(()),
            listener: RwLock::new(None),
        }
    }

    /// Registers the callback fired when the effective entitlement flips.
    /// Replaces any previous listener.
    pub fn set_change_listener(&self, listener: ChangeListener) {
        if let Ok(mut slot) = self.listener.write() {
            *slot = Some(listener);
        }
    }

    /// Returns the cached state. `loaded` is false until the first
    /// [`load`](Self::load) has completed.
    #[must_use]
    pub fn get(&self) -> EntitlementState {
        self.cached
            .lock()
            .map(|c| c.state)
            .unwrap_or_else(|poisoned| poisoned.into_inner().state)
    }

    /// Reads both flags from storage.
    ///
    /// Never fails: a storage fault is logged and resolves to "not
    /// entitled". If a runtime [`set`](Self::set) already happened, the
    /// runtime values win over what storage returned.
    pub async fn load(&self) -> EntitlementState {
        let (premium, staff_override) =
            match self.kv.multi_get(&[PREMIUM_KEY, STAFF_OVERRIDE_KEY]).await {
                Ok(values) => (
                    parse_flag(values.first().and_then(|v| v.as_deref())),
                    parse_flag(values.get(1).and_then(|v| v.as_deref())),
                ),
                Err(e) => {
                    warn!("Entitlement read failed, defaulting to free tier: {}", e);
                    (false, false)
                }
            };

        let mut cached = self
            .cached
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if cached.runtime_set {
            debug!("Entitlement already set at runtime, ignoring persisted values");
            cached.state.loaded = true;
        } else {
            cached.state = EntitlementState::loaded(premium, staff_override);
        }
        info!(
            premium = cached.state.premium,
            staff_override = cached.state.staff_override,
            "Entitlement loaded"
        );
        cached.state
    }

    /// Persists both flags in one write and updates the cache.
    ///
    /// A persist failure is logged; the cache still takes the new values.
    /// `loaded` is left as is: a set before the first load does not count
    /// as one. If the effective entitlement changed, the change listener
    /// fires after the cache is updated.
    pub async fn set(&self, premium: bool, staff_override: bool) {
        let _guard = self.write_lock.lock().await;

        if let Err(e) = self
            .kv
            .multi_set(&[
                (PREMIUM_KEY, flag_str(premium)),
                (STAFF_OVERRIDE_KEY, flag_str(staff_override)),
            ])
            .await
        {
            warn!("Failed to persist entitlement: {}", e);
        }

        let (was, now) = {
            let mut cached = self
                .cached
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let was = cached.state.is_entitled();
            cached.state = EntitlementState {
                premium,
                staff_override,
                loaded: cached.state.loaded,
            };
            cached.runtime_set = true;
            (was, cached.state.is_entitled())
        };

        info!(premium, staff_override, "Entitlement updated");

        if was != now {
            let listener = self.listener.read().ok().and_then(|l| l.clone());
            if let Some(listener) = listener {
                listener(now);
            }
        }
    }
}

fn parse_flag(value: Option<&str>) -> bool {
    matches!(value, Some("true"))
}

fn flag_str(flag: bool) -> &'static str {
    if flag { "true" } else { "false" }
}
