// app/src/services/supabase.rs

use crate::errors::{AppError, Result as AppResult};
use crate::services::storage::ObjectStorage;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{instrument, warn};

/// Signs object URLs through the Supabase storage API.
pub struct SupabaseStorage {
  http: Client,
  base_url: String,
  service_key: String,
  bucket: String,
}

impl SupabaseStorage {
  pub fn new(
    http: Client,
    base_url: impl Into<String>,
    service_key: impl Into<String>,
    bucket: impl Into<String>,
  ) -> Self {
    Self {
      http,
      base_url: base_url.into(),
      service_key: service_key.into(),
      bucket: bucket.into(),
    }
  }
}

#[derive(Deserialize)]
struct SignResponse {
  #[serde(rename = "signedURL")]
  signed_url: String,
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
  #[instrument(name = "supabase::sign_url", skip(self, ttl))]
  async fn sign_url(&self, path: &str, ttl: Duration) -> AppResult<String> {
    let endpoint = format!(
      "{}/storage/v1/object/sign/{}/{}",
      self.base_url,
      self.bucket,
      path.trim_start_matches('/')
    );
    let response = self
      .http
      .post(endpoint)
      .bearer_auth(&self.service_key)
      .header("apikey", &self.service_key)
      .json(&json!({ "expiresIn": ttl.as_secs() }))
      .send()
      .await
      .map_err(|e| AppError::Storage(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
      let detail = response.text().await.unwrap_or_default();
      warn!(%status, %detail, "Supabase refused to sign the object.");
      return Err(AppError::Storage(format!("Signing {} failed with {}", path, status)));
    }
    let signed: SignResponse = response.json().await.map_err(|e| AppError::Storage(e.to_string()))?;
    // The API answers with a path relative to /storage/v1.
    Ok(format!("{}/storage/v1{}", self.base_url, signed.signed_url))
  }
}
