// app/src/services/entitlement.rs

//! "May this email read this issue right now", and the public preview link.

use crate::errors::{AppError, Result as AppResult};
use crate::services::bounded;
use crate::state::AppState;
use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntitlementDecision {
  Granted { url: String, expires_in: u64 },
  /// No grant covers the issue. A normal outcome, not an error.
  Denied,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewLink {
  pub signed_url: String,
  pub preview_page_count: i32,
}

pub fn normalize_email(email: &str) -> String {
  email.trim().to_lowercase()
}

#[instrument(name = "entitlement::get_entitled_url", skip(state, email))]
pub async fn get_entitled_url(state: &AppState, email: &str, issue_id: &str) -> AppResult<EntitlementDecision> {
  let email = normalize_email(email);
  if !email.contains('@') {
    return Err(AppError::Validation("a valid email is required".to_string()));
  }
  let limit = state.config.external_call_timeout;

  let granted = bounded(
    limit,
    "grant lookup",
    state
      .grants
      .has_valid_grant(&email, issue_id, Utc::now(), state.config.entitlement_require_paid),
  )
  .await?;
  if !granted {
    info!("No valid access grant; denying.");
    return Ok(EntitlementDecision::Denied);
  }

  let issue = bounded(limit, "issue lookup", state.issues.find_issue(issue_id))
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Unknown issue '{}'", issue_id)))?;
  let ttl = state.config.signed_url_ttl;
  let url = bounded(limit, "url signing", state.storage.sign_url(&issue.pdf_path, ttl)).await?;
  info!(expires_in = ttl.as_secs(), "Access granted.");
  Ok(EntitlementDecision::Granted {
    url,
    expires_in: ttl.as_secs(),
  })
}

/// Unauthenticated; never looks at grants.
#[instrument(name = "entitlement::get_preview_url", skip(state))]
pub async fn get_preview_url(state: &AppState, issue_id: &str) -> AppResult<PreviewLink> {
  let limit = state.config.external_call_timeout;
  let issue = bounded(limit, "issue lookup", state.issues.find_issue(issue_id))
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Unknown issue '{}'", issue_id)))?;
  let signed_url = bounded(
    limit,
    "url signing",
    state.storage.sign_url(&issue.pdf_path, state.config.signed_url_ttl),
  )
  .await?;
  Ok(PreviewLink {
    signed_url,
    preview_page_count: issue.preview_page_count(),
  })
}
