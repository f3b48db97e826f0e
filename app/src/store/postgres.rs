// app/src/store/postgres.rs

use crate::errors::Result as AppResult;
use crate::models::{
  DigitalAccessGrant, Issue, MarkPaidOutcome, NewGrant, NewOrder, Order, PaymentConfirmation, StockDecrement,
};
use crate::store::{GrantStore, IssueStore, OrderStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::instrument;

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  pub fn pool(&self) -> &PgPool {
    &self.pool
  }

  pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(&self.pool).await
  }
}

#[async_trait]
impl OrderStore for PgStore {
  #[instrument(name = "pg::insert_order", skip_all, fields(session_id = %new.stripe_session_id))]
  async fn insert_order(&self, new: &NewOrder) -> AppResult<Order> {
    let order = sqlx::query_as::<_, Order>(
      r#"
      INSERT INTO orders (
        stripe_session_id, first_name, last_name, email, phone,
        shipping_address, billing_address, items,
        total_amount, shipping_amount, currency, billing_mode,
        payment_status, status, is_recurring, comment
      )
      VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 'pending', 'pending', $13, $14)
      RETURNING *
      "#,
    )
    .bind(&new.stripe_session_id)
    .bind(&new.first_name)
    .bind(&new.last_name)
    .bind(&new.email)
    .bind(&new.phone)
    .bind(Json(&new.shipping_address))
    .bind(new.billing_address.as_ref().map(Json))
    .bind(Json(&new.items))
    .bind(new.total_amount)
    .bind(new.shipping_amount)
    .bind(&new.currency)
    .bind(new.billing_mode)
    .bind(new.is_recurring())
    .bind(&new.comment)
    .fetch_one(&self.pool)
    .await?;
    Ok(order)
  }

  #[instrument(name = "pg::mark_paid", skip(self, confirmation))]
  async fn mark_paid(&self, session_id: &str, confirmation: &PaymentConfirmation) -> AppResult<MarkPaidOutcome> {
    let updated = sqlx::query_as::<_, Order>(
      r#"
      UPDATE orders
      SET payment_status = 'paid',
          status = 'confirmed',
          stripe_payment_intent_id = $2,
          stripe_subscription_id = $3,
          is_recurring = $4,
          subscription_start = $5,
          subscription_end = $6,
          updated_at = now()
      WHERE stripe_session_id = $1 AND payment_status <> 'paid'
      RETURNING *
      "#,
    )
    .bind(session_id)
    .bind(&confirmation.payment_intent_id)
    .bind(&confirmation.subscription_id)
    .bind(confirmation.is_recurring)
    .bind(confirmation.subscription_start)
    .bind(confirmation.subscription_end)
    .fetch_optional(&self.pool)
    .await?;

    if let Some(order) = updated {
      return Ok(MarkPaidOutcome::Transitioned(order));
    }
    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM orders WHERE stripe_session_id = $1)")
      .bind(session_id)
      .fetch_one(&self.pool)
      .await?;
    Ok(if exists {
      MarkPaidOutcome::AlreadyPaid
    } else {
      MarkPaidOutcome::Missing
    })
  }

  async fn find_by_session(&self, session_id: &str) -> AppResult<Option<Order>> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE stripe_session_id = $1")
      .bind(session_id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(order)
  }
}

#[async_trait]
impl GrantStore for PgStore {
  #[instrument(name = "pg::insert_grant", skip_all, fields(kind = ?grant.kind, issue_id = ?grant.issue_id))]
  async fn insert_grant(&self, grant: &NewGrant) -> AppResult<DigitalAccessGrant> {
    let row = sqlx::query_as::<_, DigitalAccessGrant>(
      r#"
      INSERT INTO digital_access (email, kind, issue_id, expires_at, stripe_session_id)
      VALUES ($1, $2, $3, $4, $5)
      RETURNING *
      "#,
    )
    .bind(&grant.email)
    .bind(grant.kind)
    .bind(&grant.issue_id)
    .bind(grant.expires_at)
    .bind(&grant.stripe_session_id)
    .fetch_one(&self.pool)
    .await?;
    Ok(row)
  }

  #[instrument(name = "pg::has_valid_grant", skip(self, email))]
  async fn has_valid_grant(
    &self,
    email: &str,
    issue_id: &str,
    now: DateTime<Utc>,
    require_paid_session: bool,
  ) -> AppResult<bool> {
    let valid: bool = sqlx::query_scalar(
      r#"
      SELECT EXISTS (
        SELECT 1
        FROM digital_access g
        WHERE g.email = $1
          AND g.expires_at > $3
          AND (g.kind = 'time_pass' OR g.issue_id = $2)
          AND (
            NOT $4
            OR EXISTS (
              SELECT 1 FROM orders o
              WHERE o.stripe_session_id = g.stripe_session_id AND o.payment_status = 'paid'
            )
          )
      )
      "#,
    )
    .bind(email)
    .bind(issue_id)
    .bind(now)
    .bind(require_paid_session)
    .fetch_one(&self.pool)
    .await?;
    Ok(valid)
  }
}

#[async_trait]
impl IssueStore for PgStore {
  async fn find_issue(&self, issue_id: &str) -> AppResult<Option<Issue>> {
    let issue = sqlx::query_as::<_, Issue>(
      "SELECT id, title, pdf_path, stock, preview_pages FROM issues WHERE id = $1",
    )
    .bind(issue_id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(issue)
  }

  #[instrument(name = "pg::decrement_stock", skip(self))]
  async fn decrement_stock(&self, issue_id: &str, quantity: i32) -> AppResult<StockDecrement> {
    let remaining: Option<i32> = sqlx::query_scalar(
      "UPDATE issues SET stock = stock - $2 WHERE id = $1 AND $2 > 0 AND stock >= $2 RETURNING stock",
    )
    .bind(issue_id)
    .bind(quantity)
    .fetch_optional(&self.pool)
    .await?;
    Ok(match remaining {
      Some(remaining) => StockDecrement::Applied { remaining },
      None => StockDecrement::Rejected,
    })
  }
}
