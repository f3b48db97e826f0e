// app/src/web/handlers/shipping_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::instrument;

use crate::errors::AppError;
use crate::shipping::{calculate_shipping, ShippableItem, MAX_LINE_QUANTITY};

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ShippingQuoteRequest {
  #[serde(default)]
  pub items: Vec<ShippableItem>,
  #[serde(default)]
  pub country_code: String,
}

#[instrument(name = "handler::quote_shipping", skip(payload), fields(country = %payload.country_code))]
pub async fn quote_shipping_handler(payload: web::Json<ShippingQuoteRequest>) -> Result<HttpResponse, AppError> {
  if let Some(item) = payload.items.iter().find(|item| i64::from(item.quantity) > MAX_LINE_QUANTITY) {
    return Err(AppError::Validation(format!("invalid quantity for item '{}'", item.id)));
  }
  let quote = calculate_shipping(
    payload.items.iter().map(|item| (item.id.as_str(), u64::from(item.quantity))),
    &payload.country_code,
  );
  Ok(HttpResponse::Ok().json(quote))
}
