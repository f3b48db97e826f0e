// app/src/store/memory.rs

use crate::errors::{AppError, Result as AppResult};
use crate::models::{
  DigitalAccessGrant, Issue, MarkPaidOutcome, NewGrant, NewOrder, Order, OrderStatus, PaymentConfirmation,
  PaymentStatus, StockDecrement,
};
use crate::store::{GrantStore, IssueStore, OrderStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use sqlx::types::Json;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
  orders: HashMap<String, Order>,
  grants: Vec<DigitalAccessGrant>,
  issues: HashMap<String, Issue>,
}

/// Process-local store with the same guarantees as the SQL one: one lock
/// covers every conditional write.
#[derive(Default)]
pub struct InMemoryStore {
  tables: Mutex<Tables>,
  fail_order_writes: Mutex<bool>,
  fail_grant_writes: Mutex<bool>,
}

impl InMemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_issues(issues: impl IntoIterator<Item = Issue>) -> Self {
    let store = Self::new();
    for issue in issues {
      store.upsert_issue(issue);
    }
    store
  }

  /// A few issues so a local server has something to sell and read.
  pub fn seeded() -> Self {
    Self::with_issues((40..=42).map(|n| Issue {
      id: format!("n{}", n),
      title: format!("Numéro {}", n),
      pdf_path: format!("issues/n{}.pdf", n),
      stock: 25,
      preview_pages: if n == 42 { Some(5) } else { None },
    }))
  }

  pub fn upsert_issue(&self, issue: Issue) {
    self.tables.lock().issues.insert(issue.id.clone(), issue);
  }

  pub fn issue_stock(&self, issue_id: &str) -> Option<i32> {
    self.tables.lock().issues.get(issue_id).map(|i| i.stock)
  }

  pub fn grants_for(&self, email: &str) -> Vec<DigitalAccessGrant> {
    self.tables.lock().grants.iter().filter(|g| g.email == email).cloned().collect()
  }

  /// Stores a grant as-is, including past expiries.
  pub fn put_grant(&self, grant: DigitalAccessGrant) {
    self.tables.lock().grants.push(grant);
  }

  pub fn set_fail_order_writes(&self, fail: bool) {
    *self.fail_order_writes.lock() = fail;
  }

  pub fn set_fail_grant_writes(&self, fail: bool) {
    *self.fail_grant_writes.lock() = fail;
  }
}

#[async_trait]
impl OrderStore for InMemoryStore {
  async fn insert_order(&self, new: &NewOrder) -> AppResult<Order> {
    if *self.fail_order_writes.lock() {
      return Err(AppError::Internal("order table unavailable".to_string()));
    }
    let mut tables = self.tables.lock();
    if tables.orders.contains_key(&new.stripe_session_id) {
      return Err(AppError::Internal(format!(
        "duplicate order for session {}",
        new.stripe_session_id
      )));
    }
    let now = Utc::now();
    let order = Order {
      id: Uuid::new_v4(),
      stripe_session_id: new.stripe_session_id.clone(),
      first_name: new.first_name.clone(),
      last_name: new.last_name.clone(),
      email: new.email.clone(),
      phone: new.phone.clone(),
      shipping_address: Json(new.shipping_address.clone()),
      billing_address: new.billing_address.clone().map(Json),
      items: Json(new.items.clone()),
      total_amount: new.total_amount,
      shipping_amount: new.shipping_amount,
      currency: new.currency.clone(),
      billing_mode: new.billing_mode,
      payment_status: PaymentStatus::Pending,
      status: OrderStatus::Pending,
      is_recurring: new.is_recurring(),
      subscription_start: None,
      subscription_end: None,
      stripe_payment_intent_id: None,
      stripe_subscription_id: None,
      comment: new.comment.clone(),
      processed: false,
      created_at: now,
      updated_at: now,
    };
    tables.orders.insert(order.stripe_session_id.clone(), order.clone());
    Ok(order)
  }

  async fn mark_paid(&self, session_id: &str, confirmation: &PaymentConfirmation) -> AppResult<MarkPaidOutcome> {
    if *self.fail_order_writes.lock() {
      return Err(AppError::Internal("order table unavailable".to_string()));
    }
    let mut tables = self.tables.lock();
    let Some(order) = tables.orders.get_mut(session_id) else {
      return Ok(MarkPaidOutcome::Missing);
    };
    if order.payment_status == PaymentStatus::Paid {
      return Ok(MarkPaidOutcome::AlreadyPaid);
    }
    order.payment_status = PaymentStatus::Paid;
    order.status = OrderStatus::Confirmed;
    order.stripe_payment_intent_id = confirmation.payment_intent_id.clone();
    order.stripe_subscription_id = confirmation.subscription_id.clone();
    order.is_recurring = confirmation.is_recurring;
    order.subscription_start = confirmation.subscription_start;
    order.subscription_end = confirmation.subscription_end;
    order.updated_at = Utc::now();
    Ok(MarkPaidOutcome::Transitioned(order.clone()))
  }

  async fn find_by_session(&self, session_id: &str) -> AppResult<Option<Order>> {
    Ok(self.tables.lock().orders.get(session_id).cloned())
  }
}

#[async_trait]
impl GrantStore for InMemoryStore {
  async fn insert_grant(&self, new: &NewGrant) -> AppResult<DigitalAccessGrant> {
    if *self.fail_grant_writes.lock() {
      return Err(AppError::Internal("digital_access table unavailable".to_string()));
    }
    let grant = DigitalAccessGrant {
      id: Uuid::new_v4(),
      email: new.email.clone(),
      kind: new.kind,
      issue_id: new.issue_id.clone(),
      expires_at: new.expires_at,
      stripe_session_id: new.stripe_session_id.clone(),
      created_at: Utc::now(),
    };
    self.tables.lock().grants.push(grant.clone());
    Ok(grant)
  }

  async fn has_valid_grant(
    &self,
    email: &str,
    issue_id: &str,
    now: DateTime<Utc>,
    require_paid_session: bool,
  ) -> AppResult<bool> {
    let tables = self.tables.lock();
    let session_paid = |session_id: &str| {
      tables
        .orders
        .get(session_id)
        .is_some_and(|o| o.payment_status == PaymentStatus::Paid)
    };
    Ok(tables.grants.iter().any(|g| {
      g.email == email && g.covers(issue_id, now) && (!require_paid_session || session_paid(&g.stripe_session_id))
    }))
  }
}

#[async_trait]
impl IssueStore for InMemoryStore {
  async fn find_issue(&self, issue_id: &str) -> AppResult<Option<Issue>> {
    Ok(self.tables.lock().issues.get(issue_id).cloned())
  }

  async fn decrement_stock(&self, issue_id: &str, quantity: i32) -> AppResult<StockDecrement> {
    let mut tables = self.tables.lock();
    match tables.issues.get_mut(issue_id) {
      Some(issue) if quantity > 0 && issue.stock >= quantity => {
        issue.stock -= quantity;
        Ok(StockDecrement::Applied { remaining: issue.stock })
      }
      _ => Ok(StockDecrement::Rejected),
    }
  }
}
