//! File system sink implementation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use super::error::SinkError;
use super::traits::DurableSink;
use super::SinkConfig;
use crate::job::StoredObject;

/// Check that a key is a relative path of non-empty, non-dot segments.
pub fn validate_key(key: &str) -> Result<(), SinkError> {
    if key.is_empty() || key.starts_with('/') || key.contains('\\') {
        return Err(SinkError::InvalidKey(key.to_string()));
    }
    if key
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(SinkError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Sink storing objects as files under a root directory.
pub struct FsSink {
    root: PathBuf,
    cdn_base_url: String,
}

impl FsSink {
    pub fn new(root: impl Into<PathBuf>, cdn_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            cdn_base_url: cdn_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &SinkConfig) -> Self {
        Self::new(config.root.clone(), config.cdn_base_url.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Local path for a key.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, SinkError> {
        validate_key(key)?;
        Ok(key.split('/').fold(self.root.clone(), |path, s| path.join(s)))
    }

    fn encode_key(key: &str) -> String {
        key.split('/')
            .filter(|s| !s.is_empty())
            .map(|s| urlencoding::encode(s).into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }
}

#[async_trait]
impl DurableSink for FsSink {
    fn name(&self) -> &str {
        "fs"
    }

    async fn put(&self, local: &Path, key: &str) -> Result<StoredObject, SinkError> {
        let dest = self.path_for(key)?;

        if !fs::try_exists(local).await? {
            return Err(SinkError::SourceNotFound {
                path: local.to_path_buf(),
            });
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Copy next to the destination, then rename into place so readers
        // never observe a partial object.
        let mut partial = dest.clone().into_os_string();
        partial.push(".partial");
        let partial = PathBuf::from(partial);
        let write_err = |source| SinkError::WriteFailed {
            key: key.to_string(),
            source,
        };
        let size_bytes = fs::copy(local, &partial).await.map_err(write_err)?;
        if let Err(e) = fs::rename(&partial, &dest).await {
            let _ = fs::remove_file(&partial).await;
            return Err(write_err(e));
        }

        debug!(key = %key, size_bytes, "Stored object");

        Ok(StoredObject {
            key: key.to_string(),
            url: self.public_url(key),
            size_bytes,
        })
    }

    async fn fetch(&self, key: &str, dest: &Path) -> Result<u64, SinkError> {
        let source = self.path_for(key)?;

        if !fs::try_exists(&source).await? {
            return Err(SinkError::NotFound(key.to_string()));
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }

        Ok(fs::copy(&source, dest).await?)
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.cdn_base_url, Self::encode_key(key))
    }

    fn folder_url(&self, prefix: &str) -> String {
        format!("{}/{}/", self.cdn_base_url, Self::encode_key(prefix))
    }
}
