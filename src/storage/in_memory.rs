//! In-memory storage backend.
//!
//! Thread-safe reference implementation of [`StorageProvider`] over nested
//! maps behind a `tokio::sync::RwLock`. Suitable for tests and development;
//! the nested structure (tenant → resource type → resource id) gives tenant
//! isolation for free.

use crate::storage::{StorageError, StorageKey, StoragePrefix, StorageProvider};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

type TenantMap = BTreeMap<String, BTreeMap<String, BTreeMap<String, Value>>>;

/// Thread-safe in-memory storage.
///
/// BTreeMaps keep list results consistently ordered by resource id without
/// an explicit sort step.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    data: Arc<RwLock<TenantMap>>,
}

impl InMemoryStorage {
    /// Create a new empty storage instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract a nested attribute value using dot notation, with numeric
    /// segments treated as array indices.
    fn extract_attribute(data: &Value, attribute_path: &str) -> Option<String> {
        let mut current = data;
        for part in attribute_path.split('.') {
            current = match part.parse::<usize>() {
                Ok(index) => current.get(index)?,
                Err(_) => current.get(part)?,
            };
        }
        match current {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

impl StorageProvider for InMemoryStorage {
    type Error = StorageError;

    async fn put(&self, key: StorageKey, data: Value) -> Result<Value, Self::Error> {
        if !data.is_object() {
            return Err(StorageError::invalid_data("record must be a JSON object"));
        }
        let mut guard = self.data.write().await;
        guard
            .entry(key.tenant_id().to_string())
            .or_default()
            .entry(key.resource_type().to_string())
            .or_default()
            .insert(key.resource_id().to_string(), data.clone());
        Ok(data)
    }

    async fn get(&self, key: StorageKey) -> Result<Option<Value>, Self::Error> {
        let guard = self.data.read().await;
        Ok(guard
            .get(key.tenant_id())
            .and_then(|tenant| tenant.get(key.resource_type()))
            .and_then(|records| records.get(key.resource_id()))
            .cloned())
    }

    async fn delete(&self, key: StorageKey) -> Result<bool, Self::Error> {
        let mut guard = self.data.write().await;
        let removed = guard
            .get_mut(key.tenant_id())
            .and_then(|tenant| tenant.get_mut(key.resource_type()))
            .map(|records| records.remove(key.resource_id()).is_some())
            .unwrap_or(false);
        Ok(removed)
    }

    async fn list(&self, prefix: StoragePrefix) -> Result<Vec<(StorageKey, Value)>, Self::Error> {
        let guard = self.data.read().await;
        let results = guard
            .get(prefix.tenant_id())
            .and_then(|tenant| tenant.get(prefix.resource_type()))
            .map(|records| {
                records
                    .iter()
                    .map(|(id, data)| {
                        (
                            StorageKey::new(prefix.tenant_id(), prefix.resource_type(), id),
                            data.clone(),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(results)
    }

    async fn find_by_attribute(
        &self,
        prefix: StoragePrefix,
        attribute: &str,
        value: &str,
    ) -> Result<Vec<(StorageKey, Value)>, Self::Error> {
        let all = self.list(prefix).await?;
        Ok(all
            .into_iter()
            .filter(|(_, data)| {
                Self::extract_attribute(data, attribute).as_deref() == Some(value)
            })
            .collect())
    }

    async fn exists(&self, key: StorageKey) -> Result<bool, Self::Error> {
        let guard = self.data.read().await;
        Ok(guard
            .get(key.tenant_id())
            .and_then(|tenant| tenant.get(key.resource_type()))
            .map(|records| records.contains_key(key.resource_id()))
            .unwrap_or(false))
    }

    async fn count(&self, prefix: StoragePrefix) -> Result<usize, Self::Error> {
        let guard = self.data.read().await;
        Ok(guard
            .get(prefix.tenant_id())
            .and_then(|tenant| tenant.get(prefix.resource_type()))
            .map(|records| records.len())
            .unwrap_or(0))
    }

    async fn delete_prefix(&self, prefix: StoragePrefix) -> Result<usize, Self::Error> {
        let mut guard = self.data.write().await;
        let removed = guard
            .get_mut(prefix.tenant_id())
            .and_then(|tenant| tenant.remove(prefix.resource_type()))
            .map(|records| records.len())
            .unwrap_or(0);
        Ok(removed)
    }

    async fn clear(&self) -> Result<(), Self::Error> {
        let mut guard = self.data.write().await;
        guard.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn put_get_delete_roundtrip() {
        let storage = InMemoryStorage::new();
        let key = StorageKey::new("acme", "User", "u1");
        let data = json!({"id": "u1", "userName": "jdoe"});

        let stored = storage.put(key.clone(), data.clone()).await.unwrap();
        assert_eq!(stored, data);
        assert_eq!(storage.get(key.clone()).await.unwrap(), Some(data));
        assert!(storage.delete(key.clone()).await.unwrap());
        assert!(!storage.delete(key.clone()).await.unwrap());
        assert_eq!(storage.get(key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn rejects_non_object_records() {
        let storage = InMemoryStorage::new();
        let key = StorageKey::new("acme", "User", "u1");
        assert!(storage.put(key, json!([1, 2, 3])).await.is_err());
    }

    #[tokio::test]
    async fn list_is_tenant_and_type_scoped() {
        let storage = InMemoryStorage::new();
        storage
            .put(StorageKey::new("acme", "User", "u1"), json!({"id": "u1"}))
            .await
            .unwrap();
        storage
            .put(StorageKey::new("acme", "Group", "g1"), json!({"id": "g1"}))
            .await
            .unwrap();
        storage
            .put(StorageKey::new("globex", "User", "u2"), json!({"id": "u2"}))
            .await
            .unwrap();

        let users = storage.list(StorageKey::prefix("acme", "User")).await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].0.resource_id(), "u1");
        assert_eq!(
            storage.count(StorageKey::prefix("globex", "User")).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn list_orders_by_resource_id() {
        let storage = InMemoryStorage::new();
        for id in ["c", "a", "b"] {
            storage
                .put(StorageKey::new("acme", "User", id), json!({"id": id}))
                .await
                .unwrap();
        }
        let listed = storage.list(StorageKey::prefix("acme", "User")).await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|(k, _)| k.resource_id()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn find_by_nested_attribute() {
        let storage = InMemoryStorage::new();
        storage
            .put(
                StorageKey::new("acme", "User", "u1"),
                json!({"id": "u1", "emails": [{"value": "j@acme.test"}]}),
            )
            .await
            .unwrap();

        let found = storage
            .find_by_attribute(StorageKey::prefix("acme", "User"), "emails.0.value", "j@acme.test")
            .await
            .unwrap();
        assert_eq!(found.len(), 1);

        let missing = storage
            .find_by_attribute(StorageKey::prefix("acme", "User"), "emails.0.value", "nope")
            .await
            .unwrap();
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn delete_prefix_removes_all_of_type() {
        let storage = InMemoryStorage::new();
        for id in ["u1", "u2"] {
            storage
                .put(StorageKey::new("acme", "User", id), json!({"id": id}))
                .await
                .unwrap();
        }
        storage
            .put(StorageKey::new("acme", "Group", "g1"), json!({"id": "g1"}))
            .await
            .unwrap();

        let removed = storage
            .delete_prefix(StorageKey::prefix("acme", "User"))
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(storage.count(StorageKey::prefix("acme", "User")).await.unwrap(), 0);
        assert_eq!(storage.count(StorageKey::prefix("acme", "Group")).await.unwrap(), 1);
    }
}
