// app/src/services/stripe.rs

//! Stripe REST client: form-encoded requests, JSON responses.

use crate::errors::{AppError, Result as AppResult};
use crate::services::payment::{
  ChargedLineItem, CheckoutSession, CheckoutSessionRequest, PaymentGateway, RetrievedSession, SessionMode,
  SubscriptionPeriod,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};

pub struct StripeGateway {
  http: Client,
  api_base: String,
  secret_key: String,
}

impl StripeGateway {
  pub fn new(http: Client, api_base: impl Into<String>, secret_key: impl Into<String>) -> Self {
    Self {
      http,
      api_base: api_base.into(),
      secret_key: secret_key.into(),
    }
  }

  async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> AppResult<T> {
    let status = response.status();
    if status.is_success() {
      return Ok(response.json::<T>().await?);
    }
    let message = match response.json::<StripeErrorBody>().await {
      Ok(body) => body.error.message.unwrap_or_else(|| status.to_string()),
      Err(_) => status.to_string(),
    };
    warn!(%status, %message, "Stripe request failed.");
    if status == StatusCode::NOT_FOUND {
      Err(AppError::NotFound(message))
    } else {
      Err(AppError::Payment(message))
    }
  }
}

/// Flattens a session request into Stripe's bracketed form fields.
pub(crate) fn session_form(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
  let mut form = vec![
    ("mode".to_string(), request.mode.as_str().to_string()),
    ("success_url".to_string(), request.success_url.clone()),
    ("cancel_url".to_string(), request.cancel_url.clone()),
    ("customer_email".to_string(), request.customer_email.clone()),
  ];
  for (i, item) in request.line_items.iter().enumerate() {
    match &item.price_reference {
      Some(price) => form.push((format!("line_items[{}][price]", i), price.clone())),
      None => {
        form.push((format!("line_items[{}][price_data][currency]", i), request.currency.clone()));
        form.push((format!("line_items[{}][price_data][unit_amount]", i), item.unit_amount.to_string()));
        form.push((
          format!("line_items[{}][price_data][product_data][name]", i),
          item.description.clone(),
        ));
      }
    }
    form.push((format!("line_items[{}][quantity]", i), item.quantity.to_string()));
  }
  for (key, value) in &request.metadata {
    form.push((format!("metadata[{}]", key), value.clone()));
    if request.mode == SessionMode::Subscription {
      form.push((format!("subscription_data[metadata][{}]", key), value.clone()));
    }
  }
  form
}

#[derive(Deserialize)]
struct StripeErrorBody {
  error: StripeErrorDetail,
}

#[derive(Deserialize)]
struct StripeErrorDetail {
  message: Option<String>,
}

#[derive(Deserialize)]
struct CreatedSession {
  id: String,
  url: Option<String>,
}

#[derive(Deserialize)]
struct CustomerDetails {
  name: Option<String>,
  email: Option<String>,
}

#[derive(Deserialize)]
struct StripeLineItem {
  description: Option<String>,
  quantity: Option<i64>,
  amount_total: i64,
}

#[derive(Deserialize)]
struct StripeList<T> {
  data: Vec<T>,
}

#[derive(Deserialize)]
struct StripeSession {
  id: String,
  payment_status: String,
  mode: String,
  customer_details: Option<CustomerDetails>,
  customer_email: Option<String>,
  amount_total: Option<i64>,
  currency: Option<String>,
  payment_intent: Option<String>,
  subscription: Option<String>,
  line_items: Option<StripeList<StripeLineItem>>,
  #[serde(default)]
  metadata: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct StripeSubscriptionItem {
  current_period_start: Option<i64>,
  current_period_end: Option<i64>,
}

#[derive(Deserialize)]
struct StripeSubscription {
  current_period_start: Option<i64>,
  current_period_end: Option<i64>,
  default_payment_method: Option<String>,
  items: Option<StripeList<StripeSubscriptionItem>>,
}

fn timestamp(secs: i64) -> AppResult<DateTime<Utc>> {
  DateTime::<Utc>::from_timestamp(secs, 0).ok_or_else(|| AppError::Payment(format!("Invalid timestamp {}", secs)))
}

impl StripeSession {
  fn into_retrieved(self) -> RetrievedSession {
    let (customer_name, details_email) = match self.customer_details {
      Some(d) => (d.name, d.email),
      None => (None, None),
    };
    let mode = if self.mode == "subscription" {
      SessionMode::Subscription
    } else {
      SessionMode::Payment
    };
    RetrievedSession {
      customer_name: customer_name.or_else(|| self.metadata.get("customer_name").cloned()),
      customer_email: details_email.or(self.customer_email),
      amount_total: self.amount_total.unwrap_or(0),
      currency: self.currency.unwrap_or_else(|| crate::money::CURRENCY.to_string()),
      payment_intent_id: self.payment_intent,
      subscription_id: self.subscription,
      line_items: self
        .line_items
        .map(|list| list.data)
        .unwrap_or_default()
        .into_iter()
        .map(|li| ChargedLineItem {
          description: li.description.unwrap_or_default(),
          quantity: li.quantity.unwrap_or(1),
          amount_total: li.amount_total,
        })
        .collect(),
      id: self.id,
      payment_status: self.payment_status,
      mode,
      metadata: self.metadata,
    }
  }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
  #[instrument(name = "stripe::create_session", skip_all, fields(mode = request.mode.as_str(), lines = request.line_items.len()))]
  async fn create_checkout_session(&self, request: &CheckoutSessionRequest) -> AppResult<CheckoutSession> {
    let response = self
      .http
      .post(format!("{}/v1/checkout/sessions", self.api_base))
      .bearer_auth(&self.secret_key)
      .form(&session_form(request))
      .send()
      .await?;
    let created: CreatedSession = Self::parse(response).await?;
    let url = created
      .url
      .ok_or_else(|| AppError::Payment(format!("Session {} has no redirect URL", created.id)))?;
    debug!(session_id = %created.id, "Stripe session created.");
    Ok(CheckoutSession { id: created.id, url })
  }

  #[instrument(name = "stripe::retrieve_session", skip(self))]
  async fn retrieve_checkout_session(&self, session_id: &str) -> AppResult<RetrievedSession> {
    let response = self
      .http
      .get(format!("{}/v1/checkout/sessions/{}", self.api_base, session_id))
      .bearer_auth(&self.secret_key)
      .query(&[("expand[]", "line_items")])
      .send()
      .await?;
    let session: StripeSession = Self::parse(response).await?;
    Ok(session.into_retrieved())
  }

  #[instrument(name = "stripe::retrieve_subscription", skip(self))]
  async fn retrieve_subscription(&self, subscription_id: &str) -> AppResult<SubscriptionPeriod> {
    let response = self
      .http
      .get(format!("{}/v1/subscriptions/{}", self.api_base, subscription_id))
      .bearer_auth(&self.secret_key)
      .send()
      .await?;
    let sub: StripeSubscription = Self::parse(response).await?;
    // Newer API versions only report the period on the subscription items.
    let first_item = sub.items.and_then(|list| list.data.into_iter().next());
    let start = sub
      .current_period_start
      .or_else(|| first_item.as_ref().and_then(|i| i.current_period_start));
    let end = sub
      .current_period_end
      .or_else(|| first_item.as_ref().and_then(|i| i.current_period_end));
    match (start, end) {
      (Some(start), Some(end)) => Ok(SubscriptionPeriod {
        current_period_start: timestamp(start)?,
        current_period_end: timestamp(end)?,
        default_payment_method: sub.default_payment_method,
      }),
      _ => Err(AppError::Payment(format!(
        "Subscription {} has no current period",
        subscription_id
      ))),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::services::payment::SessionLineItem;

  fn request(mode: SessionMode) -> CheckoutSessionRequest {
    CheckoutSessionRequest {
      mode,
      line_items: vec![
        SessionLineItem {
          price_reference: Some("price_abo_1_an".to_string()),
          description: "Abonnement 1 an".to_string(),
          unit_amount: 3300,
          quantity: 1,
        },
        SessionLineItem {
          price_reference: None,
          description: "Frais de port".to_string(),
          unit_amount: 450,
          quantity: 1,
        },
      ],
      customer_email: "lea@example.com".to_string(),
      currency: "eur".to_string(),
      metadata: [("shipping_cents".to_string(), "450".to_string())].into_iter().collect(),
      success_url: "https://kiosque.example/merci".to_string(),
      cancel_url: "https://kiosque.example/panier".to_string(),
    }
  }

  fn field<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
    form.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
  }

  #[test]
  fn form_uses_price_references_and_inline_shipping() {
    let form = session_form(&request(SessionMode::Payment));
    assert_eq!(field(&form, "mode"), Some("payment"));
    assert_eq!(field(&form, "line_items[0][price]"), Some("price_abo_1_an"));
    assert_eq!(field(&form, "line_items[1][price]"), None);
    assert_eq!(field(&form, "line_items[1][price_data][unit_amount]"), Some("450"));
    assert_eq!(field(&form, "line_items[1][price_data][product_data][name]"), Some("Frais de port"));
    assert_eq!(field(&form, "metadata[shipping_cents]"), Some("450"));
    assert_eq!(field(&form, "subscription_data[metadata][shipping_cents]"), None);
  }

  #[test]
  fn subscription_metadata_is_copied_to_the_subscription() {
    let form = session_form(&request(SessionMode::Subscription));
    assert_eq!(field(&form, "mode"), Some("subscription"));
    assert_eq!(field(&form, "subscription_data[metadata][shipping_cents]"), Some("450"));
  }

  #[test]
  fn retrieved_session_prefers_customer_details() {
    let raw = serde_json::json!({
      "id": "cs_1",
      "payment_status": "paid",
      "mode": "subscription",
      "customer_details": {"name": "Léa Martin", "email": "lea@example.com"},
      "amount_total": 3300,
      "currency": "eur",
      "payment_intent": null,
      "subscription": "sub_1",
      "line_items": {"data": [{"description": "Abonnement 1 an", "quantity": 1, "amount_total": 3300}]},
      "metadata": {"shipping_cents": "0"}
    });
    let session: StripeSession = serde_json::from_value(raw).unwrap();
    let retrieved = session.into_retrieved();
    assert!(retrieved.is_paid());
    assert_eq!(retrieved.mode, SessionMode::Subscription);
    assert_eq!(retrieved.customer_name.as_deref(), Some("Léa Martin"));
    assert_eq!(retrieved.subscription_id.as_deref(), Some("sub_1"));
    assert_eq!(retrieved.line_items[0].amount_total, 3300);
  }
}
