// app/src/services/storage.rs

use crate::errors::Result as AppResult;
use async_trait::async_trait;
use std::time::Duration;

/// Private object store holding the issue PDFs.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
  /// Returns a URL that reads `path` without credentials until `ttl` elapses.
  async fn sign_url(&self, path: &str, ttl: Duration) -> AppResult<String>;
}
