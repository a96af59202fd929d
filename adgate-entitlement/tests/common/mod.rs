//! Shared test helpers for entitlement tests.

#![allow(dead_code)]

use adgate_entitlement::{EntitlementError, EntitlementResult, KeyValueStore, MemoryStore};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Wraps a `MemoryStore` with switchable read/write faults and call counters.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
    pub multi_set_calls: AtomicUsize,
}

impl FlakyStore {
    pub fn failing_reads() -> Self {
        let store = Self::default();
        store.fail_reads.store(true, Ordering::SeqCst);
        store
    }
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> EntitlementResult<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(EntitlementError::StorageReadFailed("injected".into()));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> EntitlementResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(EntitlementError::StorageWriteFailed("injected".into()));
        }
        self.inner.set(key, value).await
    }

    async fn multi_set(&self, pairs: &[(&str, &str)]) -> EntitlementResult<()> {
        self.multi_set_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(EntitlementError::StorageWriteFailed("injected".into()));
        }
        self.inner.multi_set(pairs).await
    }
}
