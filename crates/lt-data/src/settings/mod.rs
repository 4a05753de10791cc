//! Remotely persisted settings cache with optimistic writes
//!
//! Change events announce *proposed* values before persistence confirms
//! them; `SettingsStore::get` only ever reflects committed state. A failed
//! write re-announces the committed value so subscribers converge.

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use lt_core::{EventBus, SubscriptionId};

use crate::backend::SettingsBackend;
use crate::DataError;

/// Settings document payload.
pub type SettingsMap = serde_json::Map<String, Value>;

/// Topic carrying whole-document change events.
pub const TOPIC_CHANGE: &str = "change";

/// Topic carrying change events for one key.
pub fn key_topic(key: &str) -> String {
    format!("change:{key}")
}

/// Remote document coordinates.
#[derive(Debug, Clone)]
pub struct SettingsPath {
    pub resource: String,
    pub document_id: String,
}

impl SettingsPath {
    /// Join namespace and item into a document id, trimming stray slashes.
    pub fn new(resource: impl Into<String>, namespace: &str, item: &str) -> Self {
        let document_id = [namespace, item]
            .iter()
            .map(|part| part.trim_matches('/'))
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("/");
        Self {
            resource: resource.into(),
            document_id,
        }
    }
}

/// Optimistic read/write cache over one remote settings document.
pub struct SettingsStore {
    backend: Arc<dyn SettingsBackend>,
    path: SettingsPath,
    /// Last committed snapshot; replaced wholesale on refresh or write.
    settings: RwLock<SettingsMap>,
    bus: EventBus<Value>,
}

impl SettingsStore {
    pub fn new(
        backend: Arc<dyn SettingsBackend>,
        path: SettingsPath,
        defaults: SettingsMap,
    ) -> Self {
        Self {
            backend,
            path,
            settings: RwLock::new(defaults),
            bus: EventBus::new(),
        }
    }

    /// Load the initial snapshot.
    pub async fn initialize(&self) {
        self.refresh().await;
    }

    /// Replace the snapshot with the remote document.
    ///
    /// On success, emits `change:<key>` for every key whose value differs
    /// (including keys that disappeared, which emit `null`), then always
    /// one global `change` with the full snapshot. On failure the previous
    /// snapshot is kept and nothing is emitted.
    pub async fn refresh(&self) {
        let fetched = self
            .backend
            .read_settings(&self.path.resource, &self.path.document_id)
            .await;
        let new_settings = match fetched {
            Ok(map) => map,
            Err(err) => {
                debug!(document = %self.path.document_id, "settings refresh failed: {err}");
                return;
            }
        };

        let previous = std::mem::replace(&mut *self.settings.write(), new_settings.clone());

        for key in new_settings.keys() {
            if previous.get(key) != new_settings.get(key) {
                self.bus.publish(&key_topic(key), &new_settings[key]);
            }
        }
        for key in previous.keys() {
            if !new_settings.contains_key(key) {
                self.bus.publish(&key_topic(key), &Value::Null);
            }
        }
        self.bus.publish(TOPIC_CHANGE, &Value::Object(new_settings));
    }

    /// Last committed value for a key; never reflects an in-flight write.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.settings.read().get(key).cloned()
    }

    /// Full committed snapshot.
    pub fn snapshot(&self) -> SettingsMap {
        self.settings.read().clone()
    }

    /// Optimistically write one key.
    ///
    /// The per-key and global change events fire with the proposed value
    /// before persistence is attempted. On success the merged document
    /// becomes the committed snapshot; on failure both events fire again
    /// with the previous committed value and the error is returned.
    pub async fn set(&self, key: &str, value: Value) -> Result<(), DataError> {
        let mut merged = self.settings.read().clone();
        merged.insert(key.to_string(), value.clone());

        self.bus.publish(&key_topic(key), &value);
        self.bus
            .publish(TOPIC_CHANGE, &Value::Object(merged.clone()));

        match self
            .backend
            .write_settings(&self.path.resource, &self.path.document_id, &merged)
            .await
        {
            Ok(()) => {
                *self.settings.write() = merged;
                Ok(())
            }
            Err(err) => {
                let committed = self.settings.read().clone();
                let rollback = committed.get(key).cloned().unwrap_or(Value::Null);
                self.bus.publish(&key_topic(key), &rollback);
                self.bus.publish(TOPIC_CHANGE, &Value::Object(committed));
                Err(err)
            }
        }
    }

    /// Subscribe to whole-document change events.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.bus.subscribe(TOPIC_CHANGE, callback)
    }

    /// Subscribe to change events for one key.
    pub fn subscribe_key<F>(&self, key: &str, callback: F) -> SubscriptionId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.bus.subscribe(key_topic(key), callback)
    }

    /// Remove a subscription created by either subscribe form.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    struct MockSettingsBackend {
        document: Mutex<SettingsMap>,
        fail_reads: Mutex<bool>,
        fail_writes: Mutex<bool>,
        /// Shared trace of events and persistence, for ordering checks.
        trace: Arc<Mutex<Vec<String>>>,
    }

    impl MockSettingsBackend {
        fn new(document: SettingsMap) -> Arc<Self> {
            Arc::new(Self {
                document: Mutex::new(document),
                fail_reads: Mutex::new(false),
                fail_writes: Mutex::new(false),
                trace: Arc::new(Mutex::new(Vec::new())),
            })
        }
    }

    #[async_trait]
    impl SettingsBackend for MockSettingsBackend {
        async fn read_settings(
            &self,
            _resource: &str,
            _document_id: &str,
        ) -> Result<SettingsMap, DataError> {
            if *self.fail_reads.lock() {
                return Err(DataError::Transport("read failed".into()));
            }
            Ok(self.document.lock().clone())
        }

        async fn write_settings(
            &self,
            _resource: &str,
            _document_id: &str,
            data: &SettingsMap,
        ) -> Result<(), DataError> {
            if *self.fail_writes.lock() {
                return Err(DataError::Persistence("write failed".into()));
            }
            self.trace.lock().push("persisted".to_string());
            *self.document.lock() = data.clone();
            Ok(())
        }
    }

    fn map(pairs: &[(&str, Value)]) -> SettingsMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn store_with(
        backend: Arc<MockSettingsBackend>,
        defaults: SettingsMap,
    ) -> SettingsStore {
        SettingsStore::new(
            backend,
            SettingsPath::new("dataStore", "tracker", "preferences"),
            defaults,
        )
    }

    #[test]
    fn test_path_join_trims_slashes() {
        let path = SettingsPath::new("dataStore", "/tracker/", "preferences/");
        assert_eq!(path.document_id, "tracker/preferences");
    }

    #[tokio::test]
    async fn test_set_emits_proposed_value_before_persistence() {
        let backend = MockSettingsBackend::new(SettingsMap::new());
        let trace = backend.trace.clone();
        let store = store_with(backend, SettingsMap::new());

        {
            let trace = trace.clone();
            store.subscribe_key("x", move |value| {
                trace.lock().push(format!("key:{value}"));
            });
        }

        store.set("x", json!(42)).await.unwrap();

        assert_eq!(*trace.lock(), vec!["key:42".to_string(), "persisted".to_string()]);
        assert_eq!(store.get("x"), Some(json!(42)));
    }

    #[tokio::test]
    async fn test_set_rolls_back_on_failure() {
        let backend = MockSettingsBackend::new(SettingsMap::new());
        *backend.fail_writes.lock() = true;
        let store = store_with(backend, map(&[("x", json!("old"))]));

        let key_events = Arc::new(Mutex::new(Vec::new()));
        {
            let key_events = key_events.clone();
            store.subscribe_key("x", move |value| key_events.lock().push(value.clone()));
        }
        let global_events = Arc::new(Mutex::new(Vec::new()));
        {
            let global_events = global_events.clone();
            store.subscribe(move |value| global_events.lock().push(value.clone()));
        }

        let err = store.set("x", json!("new")).await.unwrap_err();
        assert!(matches!(err, DataError::Persistence(_)));

        // Proposed value first, committed value re-announced after.
        assert_eq!(*key_events.lock(), vec![json!("new"), json!("old")]);
        assert_eq!(store.get("x"), Some(json!("old")));

        let globals = global_events.lock();
        assert_eq!(globals.len(), 2);
        assert_eq!(globals[1]["x"], json!("old"));
    }

    #[tokio::test]
    async fn test_refresh_emits_per_changed_key_and_one_global() {
        let backend = MockSettingsBackend::new(map(&[
            ("a", json!(1)),
            ("b", json!(3)),
            ("c", json!(4)),
        ]));
        let store = store_with(backend, map(&[("a", json!(1)), ("b", json!(2))]));

        let key_events = Arc::new(Mutex::new(Vec::new()));
        for key in ["a", "b", "c"] {
            let key_events = key_events.clone();
            store.subscribe_key(key, move |value| {
                key_events.lock().push((key, value.clone()));
            });
        }
        let global_count = Arc::new(Mutex::new(0u32));
        {
            let global_count = global_count.clone();
            store.subscribe(move |_| *global_count.lock() += 1);
        }

        store.refresh().await;

        assert_eq!(
            *key_events.lock(),
            vec![("b", json!(3)), ("c", json!(4))]
        );
        assert_eq!(*global_count.lock(), 1);
        assert_eq!(store.get("c"), Some(json!(4)));
    }

    #[tokio::test]
    async fn test_refresh_announces_removed_keys_as_null() {
        let backend = MockSettingsBackend::new(SettingsMap::new());
        let store = store_with(backend, map(&[("gone", json!(7))]));

        let events = Arc::new(Mutex::new(Vec::new()));
        {
            let events = events.clone();
            store.subscribe_key("gone", move |value| events.lock().push(value.clone()));
        }

        store.refresh().await;

        assert_eq!(*events.lock(), vec![Value::Null]);
        assert_eq!(store.get("gone"), None);
    }

    #[tokio::test]
    async fn test_refresh_with_no_changes_still_emits_global() {
        let document = map(&[("a", json!(1))]);
        let backend = MockSettingsBackend::new(document.clone());
        let store = store_with(backend, document);

        let key_events = Arc::new(Mutex::new(0u32));
        {
            let key_events = key_events.clone();
            store.subscribe_key("a", move |_| *key_events.lock() += 1);
        }
        let global_count = Arc::new(Mutex::new(0u32));
        {
            let global_count = global_count.clone();
            store.subscribe(move |_| *global_count.lock() += 1);
        }

        store.refresh().await;

        assert_eq!(*key_events.lock(), 0);
        assert_eq!(*global_count.lock(), 1);
    }

    #[tokio::test]
    async fn test_refresh_failure_is_silent() {
        let backend = MockSettingsBackend::new(SettingsMap::new());
        *backend.fail_reads.lock() = true;
        let store = store_with(backend, map(&[("a", json!(1))]));

        let global_count = Arc::new(Mutex::new(0u32));
        {
            let global_count = global_count.clone();
            store.subscribe(move |_| *global_count.lock() += 1);
        }

        store.refresh().await;

        assert_eq!(*global_count.lock(), 0);
        assert_eq!(store.get("a"), Some(json!(1)));
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_events() {
        let backend = MockSettingsBackend::new(SettingsMap::new());
        let store = store_with(backend, SettingsMap::new());

        let count = Arc::new(Mutex::new(0u32));
        let id = {
            let count = count.clone();
            store.subscribe(move |_| *count.lock() += 1)
        };

        store.set("x", json!(1)).await.unwrap();
        assert!(store.unsubscribe(id));
        store.set("y", json!(2)).await.unwrap();

        assert_eq!(*count.lock(), 1);
    }
}
