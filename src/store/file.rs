use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use fs4::tokio::AsyncFileExt;
use serde_json::{Map, Value};
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
};
use tracing::debug;

use super::{normalize, Store, StoreError};

type Document = Map<String, Value>;

/// File backed [Store]. Each scope is a single JSON object stored in `<dir>/<scope>.json`.
/// Reads take a shared lock and writes an exclusive one, so [Store::compare_and_set] holds
/// across processes too.
pub struct FileStore {
    store_dir: PathBuf,
}

impl FileStore {
    pub fn new(store_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&store_dir)?;

        Ok(Self { store_dir })
    }

    fn scope_path(&self, scope: &str) -> PathBuf {
        self.store_dir
            .join(format!("{}.json", scope_file_name(scope)))
    }

    async fn read_document(path: &Path) -> Result<Document, StoreError> {
        async fn extract(path: &Path) -> Result<String, std::io::Error> {
            let mut file = File::open(path).await?;
            file.lock_shared()?;
            let mut content = String::new();
            let result = file.read_to_string(&mut content).await;
            file.unlock_async().await?;
            result.map(|_| content)
        }

        debug!("Reading {path:?}");
        match extract(path).await {
            Ok(content) => parse_document(path, &content),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Document::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Runs `update` against the scope document under an exclusive lock. The document is only
    /// written back when `update` returns true.
    async fn update_document<F>(&self, scope: &str, update: F) -> Result<bool, StoreError>
    where
        F: FnOnce(&mut Document) -> bool + Send,
    {
        let path = self.scope_path(scope);
        let mut file = File::options()
            .write(true)
            .create(true)
            .read(true)
            .truncate(false)
            .open(&path)
            .await?;

        // Semi-safe acquire-release for a file
        file.lock_exclusive()?;
        let result = Self::update_with_file(&mut file, &path, update).await;
        file.unlock_async().await?;
        result
    }

    async fn update_with_file<F>(file: &mut File, path: &Path, update: F) -> Result<bool, StoreError>
    where
        F: FnOnce(&mut Document) -> bool + Send,
    {
        file.rewind().await?;
        let mut content = String::new();
        file.read_to_string(&mut content).await?;
        let mut document = parse_document(path, &content)?;

        if !update(&mut document) {
            return Ok(false);
        }

        let buffer = serde_json::to_vec_pretty(&document).map_err(|source| {
            StoreError::Corrupted {
                path: path.to_owned(),
                source,
            }
        })?;
        file.set_len(0).await?;
        file.rewind().await?;
        file.write_all(&buffer).await?;
        file.flush().await?;
        file.sync_data().await?;
        Ok(true)
    }
}

/// Percent-encodes every byte outside `[A-Za-z0-9-]`, so distinct scopes never share a file.
fn scope_file_name(scope: &str) -> String {
    let mut file_name = String::with_capacity(scope.len());
    for byte in scope.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            file_name.push(byte as char);
        } else {
            file_name.push_str(&format!("%{byte:02X}"));
        }
    }
    file_name
}

fn parse_document(path: &Path, content: &str) -> Result<Document, StoreError> {
    if content.trim().is_empty() {
        return Ok(Document::new());
    }
    serde_json::from_str(content).map_err(|source| StoreError::Corrupted {
        path: path.to_owned(),
        source,
    })
}

#[async_trait]
impl Store for FileStore {
    async fn get(&self, scope: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let mut document = Self::read_document(&self.scope_path(scope)).await?;
        Ok(normalize(document.remove(key)))
    }

    async fn set(&self, scope: &str, key: &str, value: Value) -> Result<(), StoreError> {
        self.update_document(scope, |document| {
            document.insert(key.to_owned(), value);
            true
        })
        .await?;
        Ok(())
    }

    async fn compare_and_set(
        &self,
        scope: &str,
        key: &str,
        expected: Option<&Value>,
        value: Value,
    ) -> Result<bool, StoreError> {
        self.update_document(scope, |document| {
            let current = normalize(document.get(key).cloned());
            if current.as_ref() != expected {
                return false;
            }
            document.insert(key.to_owned(), value);
            true
        })
        .await
    }
}
