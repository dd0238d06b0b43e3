//! Trait definitions for the sink module.

use std::path::Path;

use async_trait::async_trait;

use super::error::SinkError;
use crate::job::StoredObject;

/// Object storage keyed by path, with a public read path.
#[async_trait]
pub trait DurableSink: Send + Sync {
    /// Returns the name of this sink implementation.
    fn name(&self) -> &str;

    /// Store the file at `local` under `key`, replacing any existing object.
    async fn put(&self, local: &Path, key: &str) -> Result<StoredObject, SinkError>;

    /// Copy the object at `key` to `dest`.
    async fn fetch(&self, key: &str, dest: &Path) -> Result<u64, SinkError>;

    /// Public URL of the object at `key`.
    fn public_url(&self, key: &str) -> String;

    /// Public URL of a key prefix, with a trailing slash.
    fn folder_url(&self, prefix: &str) -> String;
}
