//! Key-value storage abstraction.
//!
//! Defines the storage seam the entitlement store persists through, plus two
//! implementations: an in-memory map and a single JSON file on disk.

use crate::error::{EntitlementError, EntitlementResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// A string key-value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads one key. Missing keys are `Ok(None)`.
    async fn get(&self, key: &str) -> EntitlementResult<Option<String>>;

    /// Writes one key.
    async fn set(&self, key: &str, value: &str) -> EntitlementResult<()>;

    /// Reads several keys, returning values in the order requested.
    async fn multi_get(&self, keys: &[&str]) -> EntitlementResult<Vec<Option<String>>> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(self.get(key).await?);
        }
        Ok(values)
    }

    /// Writes several keys. Implementations should apply them as one write.
    async fn multi_set(&self, pairs: &[(&str, &str)]) -> EntitlementResult<()> {
        for (key, value) in pairs {
            self.set(key, value).await?;
        }
        Ok(())
    }
}

/// In-memory store. Lost on process exit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `pairs`.
    pub fn with_values<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let values = pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            values: Mutex::new(values),
        }
    }

    fn lock(&self) -> EntitlementResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.values
            .lock()
            .map_err(|_| EntitlementError::StorageReadFailed("memory store poisoned".into()))
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> EntitlementResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> EntitlementResult<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn multi_get(&self, keys: &[&str]) -> EntitlementResult<Vec<Option<String>>> {
        let values = self.lock()?;
        Ok(keys.iter().map(|k| values.get(*k).cloned()).collect())
    }

    async fn multi_set(&self, pairs: &[(&str, &str)]) -> EntitlementResult<()> {
        let mut values = self.lock()?;
        for (key, value) in pairs {
            values.insert((*key).to_string(), (*value).to_string());
        }
        Ok(())
    }
}

/// Store backed by one JSON object on disk.
///
/// Every write rewrites the whole file through a temporary sibling and a
/// rename, so readers never observe a half-written file. A missing file
/// reads as an empty store. A corrupt file fails reads until the next
/// write replaces it.
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonFileStore {
    /// Opens (without creating) a store at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> EntitlementResult<HashMap<String, String>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(HashMap::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                EntitlementError::StorageReadFailed(format!(
                    "{} is not a JSON object of strings: {e}",
                    self.path.display()
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(EntitlementError::StorageReadFailed(format!(
                "failed to read {}: {e}",
                self.path.display()
            ))),
        }
    }

    async fn write_all(&self, values: &HashMap<String, String>) -> EntitlementResult<()> {
        let json = serde_json::to_vec_pretty(values)?;
        let tmp = self.path.with_extension("tmp");
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&tmp, json).await.map_err(|e| {
            EntitlementError::StorageWriteFailed(format!("failed to write {}: {e}", tmp.display()))
        })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            EntitlementError::StorageWriteFailed(format!(
                "failed to replace {}: {e}",
                self.path.display()
            ))
        })?;
        debug!(path = %self.path.display(), keys = values.len(), "persisted key-value file");
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> EntitlementResult<Option<String>> {
        Ok(self.read_all().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> EntitlementResult<()> {
        self.multi_set(&[(key, value)]).await
    }

    async fn multi_get(&self, keys: &[&str]) -> EntitlementResult<Vec<Option<String>>> {
        let values = self.read_all().await?;
        Ok(keys.iter().map(|k| values.get(*k).cloned()).collect())
    }

    async fn multi_set(&self, pairs: &[(&str, &str)]) -> EntitlementResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut values = match self.read_all().await {
            Ok(values) => values,
            Err(e) => {
                warn!("Discarding unreadable key-value file: {}", e);
                HashMap::new()
            }
        };
        for (key, value) in pairs {
            values.insert((*key).to_string(), (*value).to_string());
        }
        self.write_all(&values).await
    }
}
