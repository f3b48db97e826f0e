// app/src/errors.rs

use actix_web::{HttpResponse, ResponseError};
use kiosque_flow::FlowError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  /// Payment processor rejected or failed a call.
  #[error("Payment Provider Error: {0}")]
  Payment(String),

  #[error("Email Provider Error: {0}")]
  Email(String),

  #[error("Object Storage Error: {0}")]
  Storage(String),

  #[error("External call timed out: {0}")]
  Timeout(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("HTTP Client Error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl AppError {
  pub fn is_timeout(&self) -> bool {
    match self {
      AppError::Timeout(_) => true,
      AppError::Workflow { source } => source.is_timeout(),
      AppError::Http(e) => e.is_timeout(),
      _ => false,
    }
  }
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<sqlx::Error>() {
      Ok(sqlx_err) => AppError::Sqlx(sqlx_err),
      Err(err) => AppError::Internal(err.to_string()),
    }
  }
}

impl ResponseError for AppError {
  fn error_response(&self) -> HttpResponse {
    tracing::error!(application_error = %self, "Responding with error");
    if self.is_timeout() {
      return HttpResponse::GatewayTimeout().json(json!({"error": "An upstream service did not answer in time"}));
    }
    match self {
      AppError::Validation(m) => HttpResponse::BadRequest().json(json!({"error": m})),
      AppError::NotFound(m) => HttpResponse::NotFound().json(json!({"error": m})),
      AppError::Payment(m) => HttpResponse::BadGateway().json(json!({"error": "Payment provider error", "detail": m})),
      AppError::Email(m) => HttpResponse::BadGateway().json(json!({"error": "Email service error", "detail": m})),
      AppError::Storage(m) => HttpResponse::BadGateway().json(json!({"error": "Storage service error", "detail": m})),
      AppError::Http(e) => {
        HttpResponse::BadGateway().json(json!({"error": "Upstream service error", "detail": e.to_string()}))
      }
      AppError::Config(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "Configuration issue", "detail": m}))
      }
      AppError::Sqlx(_) => HttpResponse::InternalServerError().json(json!({"error": "Database operation failed"})),
      AppError::Workflow { source } => {
        tracing::error!(flow_error_source = ?source, "Workflow error details");
        HttpResponse::InternalServerError()
          .json(json!({"error": "Workflow processing error", "detail": source.to_string()}))
      }
      AppError::Internal(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "An internal error occurred", "detail": m}))
      }
      AppError::Timeout(_) => HttpResponse::GatewayTimeout().json(json!({"error": "An upstream service did not answer in time"})),
    }
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::http::StatusCode;
  use std::time::Duration;

  #[test]
  fn flow_timeouts_map_to_gateway_timeout() {
    let err = AppError::from(FlowError::StepTimedOut {
      step_name: "create_processor_session".to_string(),
      after: Duration::from_secs(10),
    });
    assert!(err.is_timeout());
    assert_eq!(err.error_response().status(), StatusCode::GATEWAY_TIMEOUT);
  }

  #[test]
  fn client_errors_keep_their_status() {
    assert_eq!(
      AppError::Validation("no items provided".into()).error_response().status(),
      StatusCode::BAD_REQUEST
    );
    assert_eq!(AppError::NotFound("issue".into()).error_response().status(), StatusCode::NOT_FOUND);
    assert_eq!(AppError::Payment("declined".into()).error_response().status(), StatusCode::BAD_GATEWAY);
    assert_eq!(AppError::Storage("sign".into()).error_response().status(), StatusCode::BAD_GATEWAY);
  }
}
