// app/src/web/handlers/issue_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::services::entitlement::{get_entitled_url, get_preview_url, EntitlementDecision};
use crate::state::AppState;

#[derive(Deserialize, Debug)]
pub struct ReadQuery {
  #[serde(default)]
  pub email: String,
}

#[instrument(name = "handler::read_issue", skip(app_state, path, query), fields(issue_id = %path.as_str()))]
pub async fn read_issue_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
  query: web::Query<ReadQuery>,
) -> Result<HttpResponse, AppError> {
  let issue_id = path.into_inner();
  match get_entitled_url(app_state.get_ref(), &query.email, &issue_id).await? {
    EntitlementDecision::Granted { url, expires_in } => Ok(HttpResponse::Ok().json(json!({
      "signedUrl": url,
      "expiresIn": expires_in,
    }))),
    EntitlementDecision::Denied => {
      info!("Reader has no access to this issue.");
      Ok(HttpResponse::Forbidden().json(json!({
        "error": "No active access to this issue for this email."
      })))
    }
  }
}

#[instrument(name = "handler::preview_issue", skip(app_state, path), fields(issue_id = %path.as_str()))]
pub async fn preview_issue_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let preview = get_preview_url(app_state.get_ref(), &path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(preview))
}
