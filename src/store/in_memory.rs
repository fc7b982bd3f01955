//! # In-Memory Stores
//!
//! Process-local implementations of the store contracts. Every operation takes
//! a single lock, so `atomic_increment` is atomic with respect to concurrent
//! callers exactly as a store-side increment would be.

use crate::config::ResultStoreConfig;
use crate::error::{Result, TaskhiveError};
use crate::models::ResultLocator;
use crate::store::traits::{EntityStore, ResultStore};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct InMemoryEntityStore {
    hashes: Mutex<HashMap<String, HashMap<String, String>>>,
    sets: Mutex<HashMap<String, BTreeSet<String>>>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn get_field(&self, key: &str, field: &str) -> Result<Option<String>> {
        Ok(self
            .hashes
            .lock()
            .get(key)
            .and_then(|h| h.get(field).cloned()))
    }

    async fn get_fields(&self, key: &str, fields: &[&str]) -> Result<HashMap<String, String>> {
        let hashes = self.hashes.lock();
        let Some(hash) = hashes.get(key) else {
            return Ok(HashMap::new());
        };
        Ok(fields
            .iter()
            .filter_map(|f| hash.get(*f).map(|v| (f.to_string(), v.clone())))
            .collect())
    }

    async fn set_field(&self, key: &str, field: &str, value: &str) -> Result<()> {
        self.hashes
            .lock()
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn set_fields(&self, key: &str, values: &[(&str, String)]) -> Result<()> {
        let mut hashes = self.hashes.lock();
        let hash = hashes.entry(key.to_string()).or_default();
        for (field, value) in values {
            hash.insert(field.to_string(), value.clone());
        }
        Ok(())
    }

    async fn atomic_increment(&self, key: &str, field: &str, delta: i64) -> Result<i64> {
        let mut hashes = self.hashes.lock();
        let hash = hashes.entry(key.to_string()).or_default();
        let current = match hash.get(field) {
            Some(raw) => raw.parse::<i64>().map_err(|e| {
                TaskhiveError::store(
                    "atomic_increment",
                    format!("{key}.{field} is not an integer ({raw}): {e}"),
                )
            })?,
            None => 0,
        };
        let next = current + delta;
        hash.insert(field.to_string(), next.to_string());
        Ok(next)
    }

    async fn add_to_set(&self, set_key: &str, member: &str) -> Result<()> {
        self.sets
            .lock()
            .entry(set_key.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn remove_from_set(&self, set_key: &str, member: &str) -> Result<()> {
        if let Some(set) = self.sets.lock().get_mut(set_key) {
            set.remove(member);
        }
        Ok(())
    }

    async fn members_of(&self, set_key: &str) -> Result<BTreeSet<String>> {
        Ok(self.sets.lock().get(set_key).cloned().unwrap_or_default())
    }
}

/// Result store serving the single instance described by its config
#[derive(Debug)]
pub struct InMemoryResultStore {
    config: ResultStoreConfig,
    values: DashMap<String, Value>,
}

impl InMemoryResultStore {
    pub fn new(config: ResultStoreConfig) -> Self {
        Self {
            config,
            values: DashMap::new(),
        }
    }

    fn locator_for(&self, key: &str) -> ResultLocator {
        ResultLocator::new(
            self.config.kind.clone(),
            self.config.host.clone(),
            self.config.port,
            self.config.namespace.clone(),
            key,
        )
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Default for InMemoryResultStore {
    fn default() -> Self {
        Self::new(ResultStoreConfig::default())
    }
}

#[async_trait]
impl ResultStore for InMemoryResultStore {
    async fn store_result(&self, value: &Value) -> Result<ResultLocator> {
        let key = Uuid::new_v4().to_string();
        self.values.insert(key.clone(), value.clone());
        let locator = self.locator_for(&key);
        debug!(locator = %locator, "💾 Result stored");
        Ok(locator)
    }

    async fn fetch(&self, locator: &ResultLocator) -> Result<Option<Value>> {
        if !locator.same_store(&self.locator_for(&locator.key)) {
            return Err(TaskhiveError::invalid_locator(
                locator.to_string(),
                "locator does not address this store",
            ));
        }
        Ok(self.values.get(&locator.key).map(|v| v.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_fields_round_trip() {
        let store = InMemoryEntityStore::new();
        store.set_field("Job:1", "status", "new").await.unwrap();
        store
            .set_fields("Job:1", &[("notify", "true".to_string()), ("task_count", "3".to_string())])
            .await
            .unwrap();

        assert_eq!(
            store.get_field("Job:1", "status").await.unwrap().as_deref(),
            Some("new")
        );
        assert_eq!(store.get_field("Job:1", "callback").await.unwrap(), None);

        let fields = store
            .get_fields("Job:1", &["status", "task_count", "callback"])
            .await
            .unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["task_count"], "3");
        assert!(store.get_fields("Job:2", &["status"]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_atomic_increment() {
        let store = InMemoryEntityStore::new();
        assert_eq!(store.atomic_increment("Job:1", "completed_task_count", 1).await.unwrap(), 1);
        assert_eq!(store.atomic_increment("Job:1", "completed_task_count", 2).await.unwrap(), 3);
        assert_eq!(store.atomic_increment("Job:1", "completed_task_count", -1).await.unwrap(), 2);

        store.set_field("Job:1", "status", "new").await.unwrap();
        assert!(store.atomic_increment("Job:1", "status", 1).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_not_lost() {
        let store = Arc::new(InMemoryEntityStore::new());
        let handles: Vec<_> = (0..64)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.atomic_increment("Job:x", "n", 1).await.unwrap() })
            })
            .collect();

        let mut seen: Vec<i64> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, (1..=64).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_relation_sets() {
        let store = InMemoryEntityStore::new();
        store.add_to_set("Job:1:tasks", "a").await.unwrap();
        store.add_to_set("Job:1:tasks", "b").await.unwrap();
        store.add_to_set("Job:1:tasks", "a").await.unwrap();
        assert_eq!(store.members_of("Job:1:tasks").await.unwrap().len(), 2);

        store.remove_from_set("Job:1:tasks", "a").await.unwrap();
        let members = store.members_of("Job:1:tasks").await.unwrap();
        assert_eq!(members.into_iter().collect::<Vec<_>>(), vec!["b".to_string()]);
        assert!(store.members_of("Job:2:tasks").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_result_store() {
        let store = InMemoryResultStore::default();
        let locator = store.store_result(&json!(120)).await.unwrap();
        assert_eq!(locator.kind, "memory");
        assert_eq!(locator.host, "127.0.0.1");
        assert_eq!(store.fetch(&locator).await.unwrap(), Some(json!(120)));

        let missing = ResultLocator::new("memory", "127.0.0.1", Some(6379), "0", "nope");
        assert_eq!(store.fetch(&missing).await.unwrap(), None);

        let foreign = ResultLocator::new("redis", "10.0.0.1", Some(6379), "0", &locator.key);
        assert!(matches!(
            store.fetch(&foreign).await,
            Err(TaskhiveError::InvalidLocator { .. })
        ));
    }
}
