use adgate_entitlement::{JsonFileStore, KeyValueStore, MemoryStore};
use pretty_assertions::assert_eq;

// ── MemoryStore ──────────────────────────────────────────────────

#[tokio::test]
async fn memory_store_missing_key_is_none() {
    let store = MemoryStore::new();
    assert_eq!(store.get("absent").await.unwrap(), None);
}

#[tokio::test]
async fn memory_store_multi_get_preserves_order() {
    let store = MemoryStore::with_values([("a", "1"), ("c", "3")]);
    let values = store.multi_get(&["c", "b", "a"]).await.unwrap();
    assert_eq!(values, vec![Some("3".into()), None, Some("1".into())]);
}

#[tokio::test]
async fn memory_store_multi_set_then_get() {
    let store = MemoryStore::new();
    store.multi_set(&[("x", "true"), ("y", "false")]).await.unwrap();
    assert_eq!(store.get("x").await.unwrap().as_deref(), Some("true"));
    assert_eq!(store.get("y").await.unwrap().as_deref(), Some("false"));
}

// ── JsonFileStore ────────────────────────────────────────────────

#[tokio::test]
async fn json_store_missing_file_reads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("prefs.json"));
    assert_eq!(store.get("anything").await.unwrap(), None);
}

#[tokio::test]
async fn json_store_persists_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("prefs.json");

    let store = JsonFileStore::new(&path);
    store.multi_set(&[("k1", "v1"), ("k2", "v2")]).await.unwrap();
    store.set("k1", "v1b").await.unwrap();

    let reopened = JsonFileStore::new(&path);
    let values = reopened.multi_get(&["k1", "k2"]).await.unwrap();
    assert_eq!(values, vec![Some("v1b".into()), Some("v2".into())]);
    assert!(!path.with_extension("tmp").exists());
}

#[tokio::test]
async fn json_store_corrupt_file_is_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefs.json");
    std::fs::write(&path, b"not json").unwrap();

    let store = JsonFileStore::new(&path);
    assert!(store.get("k").await.is_err());
}

#[tokio::test]
async fn json_store_write_replaces_corrupt_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefs.json");
    std::fs::write(&path, b"{ truncated").unwrap();

    let store = JsonFileStore::new(&path);
    store.multi_set(&[("k1", "v1"), ("k2", "v2")]).await.unwrap();

    let values = store.multi_get(&["k1", "k2"]).await.unwrap();
    assert_eq!(values, vec![Some("v1".into()), Some("v2".into())]);
    let on_disk: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(on_disk["k1"], "v1");
}
