// app/src/models/cart.rs

use crate::models::order::Address;
use serde::Deserialize;

/// A cart line as posted by the storefront.
#[derive(Debug, Clone, Deserialize)]
pub struct CartLine {
  pub id: String,
  pub quantity: i64,
  /// Whatever price the browser had. Never read; prices come from the catalog.
  #[serde(default)]
  pub price: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
  #[serde(default)]
  pub first_name: String,
  #[serde(default)]
  pub last_name: String,
  #[serde(default)]
  pub email: String,
  #[serde(default)]
  pub phone: Option<String>,
  pub address: Address,
  #[serde(default)]
  pub billing_address: Option<Address>,
  #[serde(default)]
  pub comment: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
  #[serde(default)]
  pub items: Vec<CartLine>,
  pub customer: CustomerInfo,
}
