//! Key-Value Storage backed by a JSON file
//!
//! The persisted surface is a handful of string keys (token, expiry, and
//! the transient PKCE pair), so the store is a flat JSON document rewritten
//! on every mutation.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::KeyValueStore,
};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::debug;

/// JSON-file-backed key-value store
///
/// Values are cached in memory; every mutation rewrites the backing file.
/// Construct with [`JsonFileStore::in_memory`] in tests to skip the file
/// entirely.
pub struct JsonFileStore {
    path: Option<PathBuf>,
    values: Mutex<HashMap<String, String>>,
}

impl JsonFileStore {
    /// Open or create a store at the given path
    pub async fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(BridgeError::Io)?;
        }

        let values = match tokio::fs::read(&path).await {
            Ok(raw) => serde_json::from_slice(&raw).map_err(|e| {
                BridgeError::OperationFailed(format!("corrupt store file: {}", e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(BridgeError::Io(e)),
        };

        debug!(path = ?path, "opened key-value store");

        Ok(Self {
            path: Some(path),
            values: Mutex::new(values),
        })
    }

    /// Create a store that never touches the filesystem (for testing)
    pub fn in_memory() -> Self {
        Self {
            path: None,
            values: Mutex::new(HashMap::new()),
        }
    }

    async fn persist(&self, values: &HashMap<String, String>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let raw = serde_json::to_vec_pretty(values)
            .map_err(|e| BridgeError::OperationFailed(format!("serializing store: {}", e)))?;
        tokio::fs::write(path, raw).await.map_err(BridgeError::Io)
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.lock().await;
        values.insert(key.to_string(), value.to_string());
        self.persist(&values).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.values.lock().await;
        values.remove(key);
        self.persist(&values).await
    }

    async fn clear(&self) -> Result<()> {
        let mut values = self.values.lock().await;
        values.clear();
        self.persist(&values).await
    }
}
