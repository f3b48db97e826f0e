// app/src/services/email_mock.rs

use crate::errors::{AppError, Result as AppResult};
use crate::services::email::{Mailer, OutgoingEmail, SentEmailInfo};
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{info, warn};

/// Records every message instead of sending it.
#[derive(Debug, Default)]
pub struct MockMailer {
  outbox: Mutex<Vec<OutgoingEmail>>,
  failing: Mutex<bool>,
}

impl MockMailer {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set_failing(&self, failing: bool) {
    *self.failing.lock() = failing;
  }

  pub fn sent(&self) -> Vec<OutgoingEmail> {
    self.outbox.lock().clone()
  }

  pub fn sent_to(&self, recipient: &str) -> Vec<OutgoingEmail> {
    self.outbox.lock().iter().filter(|e| e.to == recipient).cloned().collect()
  }
}

#[async_trait]
impl Mailer for MockMailer {
  async fn send(&self, email: &OutgoingEmail) -> AppResult<SentEmailInfo> {
    info!("Simulating sending email: To='{}', Subject='{}'", email.to, email.subject);
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    if *self.failing.lock() {
      warn!("Simulated email failure for subject: {}", email.subject);
      return Err(AppError::Email("Simulated email send failure".to_string()));
    }

    self.outbox.lock().push(email.clone());
    let message_id = format!("mock_email_{}", uuid::Uuid::new_v4());
    info!("Mock email sent successfully. Message ID: {}", message_id);
    Ok(SentEmailInfo { message_id })
  }
}
