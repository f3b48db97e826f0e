// app/src/services/storage_mock.rs

use crate::errors::{AppError, Result as AppResult};
use crate::services::storage::ObjectStorage;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct MockStorage {
  failing: Mutex<bool>,
  signed: Mutex<Vec<String>>,
}

impl MockStorage {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set_failing(&self, failing: bool) {
    *self.failing.lock() = failing;
  }

  /// Paths signed so far, in order.
  pub fn signed_paths(&self) -> Vec<String> {
    self.signed.lock().clone()
  }
}

#[async_trait]
impl ObjectStorage for MockStorage {
  async fn sign_url(&self, path: &str, ttl: Duration) -> AppResult<String> {
    if *self.failing.lock() {
      return Err(AppError::Storage(format!("Could not sign {}", path)));
    }
    self.signed.lock().push(path.to_string());
    Ok(format!(
      "https://storage.mock.local/{}?expires_in={}&token={}",
      path.trim_start_matches('/'),
      ttl.as_secs(),
      Uuid::new_v4().simple()
    ))
  }
}
