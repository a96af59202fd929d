mod common;

use adgate_entitlement::{
    EntitlementStore, KeyValueStore, MemoryStore, PREMIUM_KEY, STAFF_OVERRIDE_KEY,
};
use adgate_types::EntitlementState;
use common::FlakyStore;
use pretty_assertions::assert_eq;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

fn recording_listener(store: &EntitlementStore) -> Arc<Mutex<Vec<bool>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    store.set_change_listener(Arc::new(move |entitled| sink.lock().unwrap().push(entitled)));
    seen
}

// ── load ─────────────────────────────────────────────────────────

#[tokio::test]
async fn get_before_load_is_unloaded() {
    let store = EntitlementStore::new(Arc::new(MemoryStore::new()));
    assert_eq!(store.get(), EntitlementState::unloaded());
}

#[tokio::test]
async fn empty_storage_loads_free_tier() {
    let store = EntitlementStore::new(Arc::new(MemoryStore::new()));
    let state = store.load().await;
    assert_eq!(state, EntitlementState::loaded(false, false));
    assert_eq!(store.get(), state);
}

#[tokio::test]
async fn load_reads_persisted_flags() {
    let kv = MemoryStore::with_values([(PREMIUM_KEY, "true"), (STAFF_OVERRIDE_KEY, "false")]);
    let store = EntitlementStore::new(Arc::new(kv));
    assert_eq!(store.load().await, EntitlementState::loaded(true, false));
}

#[tokio::test]
async fn non_true_strings_read_as_false() {
    let kv = MemoryStore::with_values([(PREMIUM_KEY, "yes"), (STAFF_OVERRIDE_KEY, "TRUE")]);
    let store = EntitlementStore::new(Arc::new(kv));
    assert_eq!(store.load().await, EntitlementState::loaded(false, false));
}

#[tokio::test]
async fn read_failure_defaults_without_error() {
    let store = EntitlementStore::new(Arc::new(FlakyStore::failing_reads()));
    let state = store.load().await;
    assert!(state.loaded);
    assert!(!state.is_entitled());
}

#[tokio::test]
async fn load_does_not_fire_listener() {
    let kv = MemoryStore::with_values([(PREMIUM_KEY, "true")]);
    let store = EntitlementStore::new(Arc::new(kv));
    let seen = recording_listener(&store);
    store.load().await;
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn runtime_set_wins_over_later_load() {
    let kv = Arc::new(MemoryStore::new());
    let store = EntitlementStore::new(kv.clone());
    store.set(true, false).await;

    // Storage changed behind our back; the runtime value stays authoritative.
    kv.multi_set(&[(PREMIUM_KEY, "false")]).await.unwrap();
    assert_eq!(store.load().await, EntitlementState::loaded(true, false));
}

#[tokio::test]
async fn set_before_load_leaves_state_unloaded() {
    let store = EntitlementStore::new(Arc::new(MemoryStore::new()));
    store.set(false, true).await;

    let state = store.get();
    assert!(!state.loaded);
    assert!(state.is_entitled());

    assert_eq!(store.load().await, EntitlementState::loaded(false, true));
}

// ── set ──────────────────────────────────────────────────────────

#[tokio::test]
async fn set_persists_in_one_batched_write() {
    let kv = Arc::new(FlakyStore::default());
    let store = EntitlementStore::new(kv.clone());
    store.load().await;
    store.set(false, true).await;

    assert_eq!(kv.multi_set_calls.load(Ordering::SeqCst), 1);
    assert_eq!(kv.inner.get(PREMIUM_KEY).await.unwrap().as_deref(), Some("false"));
    assert_eq!(kv.inner.get(STAFF_OVERRIDE_KEY).await.unwrap().as_deref(), Some("true"));
    assert_eq!(store.get(), EntitlementState::loaded(false, true));
}

#[tokio::test]
async fn listener_fires_only_on_effective_flip() {
    let store = EntitlementStore::new(Arc::new(MemoryStore::new()));
    store.load().await;
    let seen = recording_listener(&store);

    store.set(true, false).await; // false -> true
    store.set(true, true).await; // still entitled
    store.set(false, true).await; // still entitled
    store.set(false, false).await; // true -> false
    store.set(false, false).await; // unchanged

    assert_eq!(*seen.lock().unwrap(), vec![true, false]);
}

#[tokio::test]
async fn write_failure_still_updates_cache() {
    let kv = Arc::new(FlakyStore::default());
    kv.fail_writes.store(true, Ordering::SeqCst);
    let store = EntitlementStore::new(kv);
    store.load().await;
    let seen = recording_listener(&store);

    store.set(true, false).await;
    assert!(store.get().is_entitled());
    assert_eq!(*seen.lock().unwrap(), vec![true]);
}

#[tokio::test]
async fn loaded_never_reverts() {
    let store = EntitlementStore::new(Arc::new(FlakyStore::failing_reads()));
    store.load().await;
    store.set(false, false).await;
    store.load().await;
    assert!(store.get().loaded);
}
