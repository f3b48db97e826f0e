// app/src/services/email.rs

use crate::errors::Result as AppResult;
use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
  pub to: String,
  pub subject: String,
  pub html: String,
}

#[derive(Debug, Clone)]
pub struct SentEmailInfo {
  pub message_id: String,
}

/// Transactional email provider. Fire and forget from the caller's side:
/// no delivery tracking beyond the provider's message id.
#[async_trait]
pub trait Mailer: Send + Sync {
  async fn send(&self, email: &OutgoingEmail) -> AppResult<SentEmailInfo>;
}
