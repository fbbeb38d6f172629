//! Persistence adapter over the host's scoped key-value store.
//!
//!  - Every value lives under a `scope` (one per card) and a `key`.
//!  - Values are plain JSON. An absent key and a JSON `null` both mean "nothing stored yet".
//!  - No transactions are assumed. [Store::compare_and_set] is the single optimistic check the
//!    engine relies on to avoid lost updates.

pub mod file;
pub mod memory;

use std::{ops::Deref, path::PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store file {path:?} is corrupted: {source}")]
    Corrupted {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("stored value under {scope}/{key} is not valid: {source}")]
    Decode {
        scope: String,
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode value for {scope}/{key}: {source}")]
    Encode {
        scope: String,
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("value under {scope}/{key} kept changing, gave up after {attempts} attempts")]
    Conflict {
        scope: String,
        key: String,
        attempts: usize,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Interface for abstracting the host key-value store.
#[async_trait]
pub trait Store: Send + Sync {
    /// Returns the value stored under `scope`/`key`, [None] when nothing was stored.
    async fn get(&self, scope: &str, key: &str) -> Result<Option<Value>, StoreError>;

    /// Unconditionally overwrites the value under `scope`/`key`.
    async fn set(&self, scope: &str, key: &str, value: Value) -> Result<(), StoreError>;

    /// Writes `value` only if the currently stored value equals `expected`. Returns whether the
    /// write happened. `None` matches a key that was never written.
    async fn compare_and_set(
        &self,
        scope: &str,
        key: &str,
        expected: Option<&Value>,
        value: Value,
    ) -> Result<bool, StoreError>;
}

#[async_trait]
impl<T> Store for T
where
    T: Deref + Send + Sync,
    T::Target: Store,
{
    async fn get(&self, scope: &str, key: &str) -> Result<Option<Value>, StoreError> {
        self.deref().get(scope, key).await
    }

    async fn set(&self, scope: &str, key: &str, value: Value) -> Result<(), StoreError> {
        self.deref().set(scope, key, value).await
    }

    async fn compare_and_set(
        &self,
        scope: &str,
        key: &str,
        expected: Option<&Value>,
        value: Value,
    ) -> Result<bool, StoreError> {
        self.deref()
            .compare_and_set(scope, key, expected, value)
            .await
    }
}

/// Stored `null` is treated the same way as a missing key.
fn normalize(value: Option<Value>) -> Option<Value> {
    value.filter(|v| !v.is_null())
}
