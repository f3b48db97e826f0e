// app/src/services/brevo.rs

use crate::errors::{AppError, Result as AppResult};
use crate::services::email::{Mailer, OutgoingEmail, SentEmailInfo};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

const BREVO_SEND_URL: &str = "https://api.brevo.com/v3/smtp/email";

pub struct BrevoMailer {
  http: Client,
  api_key: String,
  sender_email: String,
  sender_name: String,
}

impl BrevoMailer {
  pub fn new(http: Client, api_key: impl Into<String>, sender_email: impl Into<String>) -> Self {
    Self {
      http,
      api_key: api_key.into(),
      sender_email: sender_email.into(),
      sender_name: "Kiosque".to_string(),
    }
  }
}

#[derive(Serialize)]
struct Contact<'a> {
  email: &'a str,
  #[serde(skip_serializing_if = "Option::is_none")]
  name: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendRequest<'a> {
  sender: Contact<'a>,
  to: Vec<Contact<'a>>,
  subject: &'a str,
  html_content: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendResponse {
  message_id: String,
}

#[async_trait]
impl Mailer for BrevoMailer {
  #[instrument(name = "brevo::send", skip_all, fields(to = %email.to))]
  async fn send(&self, email: &OutgoingEmail) -> AppResult<SentEmailInfo> {
    let body = SendRequest {
      sender: Contact {
        email: &self.sender_email,
        name: Some(&self.sender_name),
      },
      to: vec![Contact {
        email: &email.to,
        name: None,
      }],
      subject: &email.subject,
      html_content: &email.html,
    };
    let response = self
      .http
      .post(BREVO_SEND_URL)
      .header("api-key", &self.api_key)
      .json(&body)
      .send()
      .await?;
    let status = response.status();
    if !status.is_success() {
      let detail = response.text().await.unwrap_or_default();
      warn!(%status, %detail, "Brevo rejected the message.");
      return Err(AppError::Email(format!("Brevo returned {}: {}", status, detail)));
    }
    let sent: SendResponse = response.json().await?;
    Ok(SentEmailInfo {
      message_id: sent.message_id,
    })
  }
}
