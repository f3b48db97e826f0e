// app/src/services/payment.rs

//! Payment processor boundary.

use crate::errors::Result as AppResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
  Payment,
  Subscription,
}

impl SessionMode {
  pub fn as_str(self) -> &'static str {
    match self {
      SessionMode::Payment => "payment",
      SessionMode::Subscription => "subscription",
    }
  }
}

/// A line of a session request. Lines without a price reference are priced
/// inline from `description` and `unit_amount`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLineItem {
  pub price_reference: Option<String>,
  pub description: String,
  pub unit_amount: i64,
  pub quantity: i64,
}

#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
  pub mode: SessionMode,
  pub line_items: Vec<SessionLineItem>,
  pub customer_email: String,
  pub currency: String,
  pub metadata: BTreeMap<String, String>,
  pub success_url: String,
  pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
  pub id: String,
  pub url: String,
}

/// A line item as the processor charged it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargedLineItem {
  pub description: String,
  pub quantity: i64,
  /// Cents, for the whole line.
  pub amount_total: i64,
}

#[derive(Debug, Clone)]
pub struct RetrievedSession {
  pub id: String,
  /// Processor's raw status: `paid`, `unpaid` or `no_payment_required`.
  pub payment_status: String,
  pub mode: SessionMode,
  pub customer_name: Option<String>,
  pub customer_email: Option<String>,
  pub amount_total: i64,
  pub currency: String,
  pub payment_intent_id: Option<String>,
  pub subscription_id: Option<String>,
  pub line_items: Vec<ChargedLineItem>,
  pub metadata: BTreeMap<String, String>,
}

impl RetrievedSession {
  pub fn is_paid(&self) -> bool {
    self.payment_status == "paid"
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionPeriod {
  pub current_period_start: DateTime<Utc>,
  pub current_period_end: DateTime<Utc>,
  pub default_payment_method: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  async fn create_checkout_session(&self, request: &CheckoutSessionRequest) -> AppResult<CheckoutSession>;

  async fn retrieve_checkout_session(&self, session_id: &str) -> AppResult<RetrievedSession>;

  async fn retrieve_subscription(&self, subscription_id: &str) -> AppResult<SubscriptionPeriod>;
}
