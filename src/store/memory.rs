use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;
use serde_json::Value;

use super::{normalize, Store, StoreError};

/// In-process [Store]. Every operation holds one lock, so [Store::compare_and_set] is atomic.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<(String, String), Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<(String, String), Value>>, StoreError> {
        self.values
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, scope: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let values = self.lock()?;
        Ok(normalize(
            values.get(&(scope.to_owned(), key.to_owned())).cloned(),
        ))
    }

    async fn set(&self, scope: &str, key: &str, value: Value) -> Result<(), StoreError> {
        self.lock()?
            .insert((scope.to_owned(), key.to_owned()), value);
        Ok(())
    }

    async fn compare_and_set(
        &self,
        scope: &str,
        key: &str,
        expected: Option<&Value>,
        value: Value,
    ) -> Result<bool, StoreError> {
        let mut values = self.lock()?;
        let slot = (scope.to_owned(), key.to_owned());
        let current = normalize(values.get(&slot).cloned());
        if current.as_ref() != expected {
            return Ok(false);
        }
        values.insert(slot, value);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use serde_json::json;

    use crate::store::Store;

    use super::MemoryStore;

    #[tokio::test]
    async fn test_absent_and_null_read_as_none() -> Result<()> {
        let store = MemoryStore::new();
        assert_eq!(store.get("card", "missing").await?, None);

        store.set("card", "cleared", json!(null)).await?;
        assert_eq!(store.get("card", "cleared").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_scopes_are_isolated() -> Result<()> {
        let store = MemoryStore::new();
        store.set("card-a", "k", json!(1)).await?;
        store.set("card-b", "k", json!(2)).await?;

        assert_eq!(store.get("card-a", "k").await?, Some(json!(1)));
        assert_eq!(store.get("card-b", "k").await?, Some(json!(2)));
        Ok(())
    }

    #[tokio::test]
    async fn test_compare_and_set_rejects_stale_expectation() -> Result<()> {
        let store = MemoryStore::new();
        assert!(store.compare_and_set("card", "k", None, json!(1)).await?);
        assert!(!store.compare_and_set("card", "k", None, json!(2)).await?);
        assert!(
            store
                .compare_and_set("card", "k", Some(&json!(1)), json!(3))
                .await?
        );
        assert_eq!(store.get("card", "k").await?, Some(json!(3)));
        Ok(())
    }
}
