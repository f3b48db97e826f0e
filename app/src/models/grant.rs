// app/src/models/grant.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "grant_kind_enum", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GrantKind {
  SingleIssue,
  /// Covers every issue until it expires.
  TimePass,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DigitalAccessGrant {
  pub id: Uuid,
  pub email: String,
  pub kind: GrantKind,
  pub issue_id: Option<String>,
  pub expires_at: DateTime<Utc>,
  pub stripe_session_id: String,
  pub created_at: DateTime<Utc>,
}

impl DigitalAccessGrant {
  /// Expiry and scope only; whether the originating order is paid is
  /// checked by the store.
  pub fn covers(&self, issue_id: &str, now: DateTime<Utc>) -> bool {
    now < self.expires_at
      && match self.kind {
        GrantKind::TimePass => true,
        GrantKind::SingleIssue => self.issue_id.as_deref() == Some(issue_id),
      }
  }
}

#[derive(Debug, Clone)]
pub struct NewGrant {
  /// Lower-cased.
  pub email: String,
  pub kind: GrantKind,
  pub issue_id: Option<String>,
  pub expires_at: DateTime<Utc>,
  pub stripe_session_id: String,
}
