// app/src/web/handlers/checkout_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::models::CheckoutRequest;
use crate::pipelines::checkout_pipeline::create_checkout;
use crate::pipelines::reconciliation_pipeline::reconcile_payment;
use crate::state::AppState;

#[instrument(
  name = "handler::start_checkout",
  skip(app_state, payload),
  fields(lines = payload.items.len())
)]
pub async fn start_checkout_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<CheckoutRequest>,
) -> Result<HttpResponse, AppError> {
  match create_checkout(app_state.get_ref(), payload.into_inner()).await {
    Ok(redirect) => {
      info!(session_id = %redirect.session_id, order_id = ?redirect.order_id, "Checkout session created.");
      Ok(HttpResponse::Ok().json(json!({
        "url": redirect.url,
        "sessionId": redirect.session_id,
      })))
    }
    Err(app_err) => {
      warn!(error = %app_err, "Checkout failed.");
      Err(app_err)
    }
  }
}

#[derive(Deserialize, Debug)]
pub struct ConfirmQuery {
  #[serde(default)]
  pub session_id: String,
}

#[instrument(name = "handler::confirm_checkout", skip(app_state, query), fields(session_id = %query.session_id))]
pub async fn confirm_checkout_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ConfirmQuery>,
) -> Result<HttpResponse, AppError> {
  let result = reconcile_payment(app_state.get_ref(), &query.session_id).await?;
  if !result.is_paid() {
    info!("Payment still pending; the client may retry.");
  }
  Ok(HttpResponse::Ok().json(result))
}
