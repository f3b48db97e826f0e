// app/src/store/mod.rs

//! Persistence boundary: orders, access grants and issue stock.

pub mod memory;
pub mod postgres;

use crate::errors::Result as AppResult;
use crate::models::{
  DigitalAccessGrant, Issue, MarkPaidOutcome, NewGrant, NewOrder, Order, PaymentConfirmation, StockDecrement,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use memory::InMemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait OrderStore: Send + Sync {
  async fn insert_order(&self, order: &NewOrder) -> AppResult<Order>;

  /// Moves the order for `session_id` to paid/confirmed unless it is already
  /// paid. Only one caller ever observes `Transitioned` for a given order.
  async fn mark_paid(&self, session_id: &str, confirmation: &PaymentConfirmation) -> AppResult<MarkPaidOutcome>;

  async fn find_by_session(&self, session_id: &str) -> AppResult<Option<Order>>;
}

#[async_trait]
pub trait GrantStore: Send + Sync {
  async fn insert_grant(&self, grant: &NewGrant) -> AppResult<DigitalAccessGrant>;

  /// True when at least one grant for `email` covers `issue_id` at `now`.
  /// With `require_paid_session`, the grant's session must have a paid order.
  async fn has_valid_grant(
    &self,
    email: &str,
    issue_id: &str,
    now: DateTime<Utc>,
    require_paid_session: bool,
  ) -> AppResult<bool>;
}

#[async_trait]
pub trait IssueStore: Send + Sync {
  async fn find_issue(&self, issue_id: &str) -> AppResult<Option<Issue>>;

  /// Removes `quantity` copies in one conditional write. Never drives stock
  /// below zero.
  async fn decrement_stock(&self, issue_id: &str, quantity: i32) -> AppResult<StockDecrement>;
}
