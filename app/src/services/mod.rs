// app/src/services/mod.rs

//! External collaborators (payment processor, email provider, object storage)
//! behind traits, with a real HTTP client and an in-process mock for each,
//! plus the entitlement service built on top of them.

pub mod brevo;
pub mod email;
pub mod email_mock;
pub mod entitlement;
pub mod payment;
pub mod payment_mock;
pub mod storage;
pub mod storage_mock;
pub mod stripe;
pub mod supabase;

use crate::errors::{AppError, Result as AppResult};
use std::future::Future;
use std::time::Duration;

/// Awaits `fut` for at most `limit`; an elapsed limit becomes `AppError::Timeout`.
pub async fn bounded<T>(limit: Duration, what: &str, fut: impl Future<Output = AppResult<T>>) -> AppResult<T> {
  match tokio::time::timeout(limit, fut).await {
    Ok(result) => result,
    Err(_elapsed) => Err(AppError::Timeout(format!("{} did not finish within {:?}", what, limit))),
  }
}
