// app/src/web/routes.rs

use crate::errors::AppError;
use crate::web::handlers::{catalog_handlers, checkout_handlers, issue_handlers, shipping_handlers};
use actix_web::error::JsonPayloadError;
use actix_web::{web, HttpRequest};

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Malformed request bodies answer with the same `{"error": ...}` shape as
/// every other validation failure.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
  AppError::Validation(format!("Invalid request body: {}", err)).into()
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      .route("/catalog", web::get().to(catalog_handlers::list_catalog_handler))
      .service(
        web::scope("/checkout")
          .route("", web::post().to(checkout_handlers::start_checkout_handler))
          .route("/confirm", web::get().to(checkout_handlers::confirm_checkout_handler)),
      )
      .service(
        web::scope("/issues")
          .route("/{issue_id}/read", web::get().to(issue_handlers::read_issue_handler))
          .route("/{issue_id}/preview", web::get().to(issue_handlers::preview_issue_handler)),
      )
      .route("/shipping/quote", web::post().to(shipping_handlers::quote_shipping_handler)),
  );
}
