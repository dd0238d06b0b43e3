//! In-memory sink for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::job::StoredObject;
use crate::sink::{validate_key, DurableSink, SinkError};

/// Sink holding objects in memory, keyed like [`crate::sink::FsSink`].
#[derive(Debug, Clone)]
pub struct MemorySink {
    objects: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    base_url: String,
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new("http://mock-cdn")
    }
}

impl MemorySink {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            objects: Arc::new(RwLock::new(HashMap::new())),
            base_url: base_url.into(),
        }
    }

    /// Store bytes directly under `key`.
    pub async fn insert(&self, key: &str, bytes: impl Into<Vec<u8>>) {
        self.objects
            .write()
            .await
            .insert(key.to_string(), bytes.into());
    }

    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl DurableSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn put(&self, local: &Path, key: &str) -> Result<StoredObject, SinkError> {
        validate_key(key)?;
        let bytes = tokio::fs::read(local).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SinkError::SourceNotFound {
                    path: local.to_path_buf(),
                }
            } else {
                SinkError::Io(e)
            }
        })?;
        let size_bytes = bytes.len() as u64;
        self.insert(key, bytes).await;

        Ok(StoredObject {
            key: key.to_string(),
            url: self.public_url(key),
            size_bytes,
        })
    }

    async fn fetch(&self, key: &str, dest: &Path) -> Result<u64, SinkError> {
        validate_key(key)?;
        let bytes = self
            .get(key)
            .await
            .ok_or_else(|| SinkError::NotFound(key.to_string()))?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, &bytes).await?;
        Ok(bytes.len() as u64)
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }

    fn folder_url(&self, prefix: &str) -> String {
        format!("{}/{}/", self.base_url, prefix)
    }
}
