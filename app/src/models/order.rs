// app/src/models/order.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_status_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
  Pending,
  Paid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  Pending,
  Confirmed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "billing_mode_enum", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BillingMode {
  OneTime,
  Recurring,
}

/// Persisted line, priced from the catalog at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
  pub id: String,
  pub quantity: i32,
  /// Cents.
  pub unit_price: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
  pub line1: String,
  #[serde(default)]
  pub line2: Option<String>,
  pub postal_code: String,
  pub city: String,
  /// ISO country code.
  pub country: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
  pub id: Uuid,
  pub stripe_session_id: String,
  pub first_name: String,
  pub last_name: String,
  pub email: String,
  pub phone: Option<String>,
  pub shipping_address: Json<Address>,
  pub billing_address: Option<Json<Address>>,
  pub items: Json<Vec<OrderLine>>,
  pub total_amount: i64,
  pub shipping_amount: i64,
  pub currency: String,
  pub billing_mode: BillingMode,
  pub payment_status: PaymentStatus,
  pub status: OrderStatus,
  pub is_recurring: bool,
  pub subscription_start: Option<DateTime<Utc>>,
  pub subscription_end: Option<DateTime<Utc>>,
  pub stripe_payment_intent_id: Option<String>,
  pub stripe_subscription_id: Option<String>,
  pub comment: Option<String>,
  pub processed: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Row written at checkout, before the customer is sent to the processor.
#[derive(Debug, Clone)]
pub struct NewOrder {
  pub stripe_session_id: String,
  pub first_name: String,
  pub last_name: String,
  pub email: String,
  pub phone: Option<String>,
  pub shipping_address: Address,
  pub billing_address: Option<Address>,
  pub items: Vec<OrderLine>,
  pub total_amount: i64,
  pub shipping_amount: i64,
  pub currency: String,
  pub billing_mode: BillingMode,
  pub comment: Option<String>,
}

impl NewOrder {
  pub fn is_recurring(&self) -> bool {
    self.billing_mode == BillingMode::Recurring
  }
}

/// Values written by reconciliation when the processor reports the session paid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentConfirmation {
  pub payment_intent_id: Option<String>,
  pub subscription_id: Option<String>,
  pub is_recurring: bool,
  pub subscription_start: Option<DateTime<Utc>>,
  pub subscription_end: Option<DateTime<Utc>>,
}

/// Result of the guarded `pending -> paid` update.
#[derive(Debug, Clone)]
pub enum MarkPaidOutcome {
  /// This call moved the order to paid.
  Transitioned(Order),
  AlreadyPaid,
  /// No order row for the session.
  Missing,
}

impl MarkPaidOutcome {
  pub fn transitioned_order(&self) -> Option<&Order> {
    match self {
      MarkPaidOutcome::Transitioned(order) => Some(order),
      _ => None,
    }
  }
}
