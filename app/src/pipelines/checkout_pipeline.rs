// app/src/pipelines/checkout_pipeline.rs

//! Cart + customer form -> processor session, provisional order, access grants.
//!
//! Only the processor session is required. The order row and the grants are
//! written best-effort after it: the session is the record of truth and the
//! customer must still be redirected to pay when the database hiccups.

use crate::catalog::{digital_issue_ref, Catalog};
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::{BillingMode, CheckoutRequest, GrantKind, NewGrant, NewOrder, OrderLine};
use crate::money::CURRENCY;
use crate::pipelines::contexts::{CheckoutCtxData, PricedLine};
use crate::services::entitlement::normalize_email;
use crate::services::payment::{CheckoutSessionRequest, SessionLineItem, SessionMode};
use crate::shipping::{calculate_shipping, classify, ItemClass, ShippingQuote, MAX_LINE_QUANTITY};
use crate::state::AppState;
use chrono::{Duration as ChronoDuration, Utc};
use kiosque_flow::{Flow, FlowContext, FlowOutcome, FlowRegistry, SkipCondition, StepControl, StepPolicy};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub const SHIPPING_LINE_LABEL: &str = "Frais de port";

/// Checks the request and prices every line from the catalog. Runs before
/// any external call.
pub fn validate_and_price(request: &CheckoutRequest, catalog: &Catalog) -> Result<Vec<PricedLine>, AppError> {
  if request.items.is_empty() {
    return Err(AppError::Validation("no items provided".to_string()));
  }
  let customer = &request.customer;
  if !customer.email.trim().contains('@') {
    return Err(AppError::Validation("a valid email is required".to_string()));
  }
  if customer.first_name.trim().is_empty() || customer.last_name.trim().is_empty() {
    return Err(AppError::Validation("first and last name are required".to_string()));
  }

  request
    .items
    .iter()
    .map(|item| {
      let id = item.id.trim();
      if id.is_empty() {
        return Err(AppError::Validation("item id is required".to_string()));
      }
      let quantity = i32::try_from(item.quantity)
        .ok()
        .filter(|q| *q >= 1 && i64::from(*q) <= MAX_LINE_QUANTITY)
        .ok_or_else(|| AppError::Validation(format!("invalid quantity for item '{}'", id)))?;
      // Only physical ids may fall back to the back-issue offer.
      let entry = match classify(id) {
        ItemClass::Physical => catalog.resolve(id),
        ItemClass::Subscription | ItemClass::Digital => catalog
          .lookup(id)
          .ok_or_else(|| AppError::Validation(format!("unknown product '{}'", id)))?,
      };
      if !entry.has_price_reference() {
        return Err(AppError::Validation(format!("missing price reference for item '{}'", id)));
      }
      Ok(PricedLine { entry, quantity })
    })
    .collect()
}

/// Recurring as soon as one line is. Mixed carts are billed as a subscription.
pub fn billing_mode_for(lines: &[PricedLine]) -> BillingMode {
  if lines.iter().any(|l| l.entry.is_recurring()) {
    BillingMode::Recurring
  } else {
    BillingMode::OneTime
  }
}

fn session_request(ctx: &CheckoutCtxData) -> CheckoutSessionRequest {
  let customer = &ctx.request.customer;
  let base_url = &ctx.app_state.config.app_base_url;
  let mut line_items: Vec<SessionLineItem> = ctx
    .lines
    .iter()
    .map(|l| SessionLineItem {
      price_reference: Some(l.entry.price_reference.clone()),
      description: l.entry.name.clone(),
      unit_amount: l.entry.price_cents,
      quantity: i64::from(l.quantity),
    })
    .collect();
  let shipping_cents = ctx.shipping_cents();
  if shipping_cents > 0 {
    line_items.push(SessionLineItem {
      price_reference: None,
      description: SHIPPING_LINE_LABEL.to_string(),
      unit_amount: shipping_cents,
      quantity: 1,
    });
  }

  let mut metadata = BTreeMap::new();
  metadata.insert("shipping_cents".to_string(), shipping_cents.to_string());
  if let Some(quote) = ctx.shipping {
    metadata.insert("shipping_zone".to_string(), quote.zone.as_str().to_string());
  }
  metadata.insert(
    "customer_name".to_string(),
    format!("{} {}", customer.first_name.trim(), customer.last_name.trim()),
  );
  metadata.insert("items_total_cents".to_string(), ctx.items_total_cents.to_string());

  CheckoutSessionRequest {
    mode: match ctx.billing_mode {
      BillingMode::Recurring => SessionMode::Subscription,
      BillingMode::OneTime => SessionMode::Payment,
    },
    line_items,
    customer_email: customer.email.trim().to_string(),
    currency: CURRENCY.to_string(),
    metadata,
    success_url: format!("{}/checkout/success?session_id={{CHECKOUT_SESSION_ID}}", base_url),
    cancel_url: format!("{}/panier", base_url),
  }
}

fn new_order(ctx: &CheckoutCtxData, session_id: &str) -> NewOrder {
  let customer = &ctx.request.customer;
  NewOrder {
    stripe_session_id: session_id.to_string(),
    first_name: customer.first_name.trim().to_string(),
    last_name: customer.last_name.trim().to_string(),
    email: customer.email.trim().to_string(),
    phone: customer.phone.clone().filter(|p| !p.trim().is_empty()),
    shipping_address: customer.address.clone(),
    billing_address: customer.billing_address.clone(),
    items: ctx
      .lines
      .iter()
      .map(|l| OrderLine {
        id: l.entry.id.clone(),
        quantity: l.quantity,
        unit_price: l.entry.price_cents,
      })
      .collect(),
    total_amount: ctx.items_total_cents,
    shipping_amount: ctx.shipping_cents(),
    currency: CURRENCY.to_string(),
    billing_mode: ctx.billing_mode,
    comment: customer.comment.clone().filter(|c| !c.trim().is_empty()),
  }
}

fn new_grants(ctx: &CheckoutCtxData, session_id: &str) -> Vec<NewGrant> {
  let email = normalize_email(&ctx.request.customer.email);
  let now = Utc::now();
  ctx
    .lines
    .iter()
    .filter_map(|l| {
      let template = l.entry.access_grant?;
      let issue_id = match template.kind {
        GrantKind::TimePass => None,
        GrantKind::SingleIssue => Some(digital_issue_ref(&l.entry.id).unwrap_or(&l.entry.id).to_string()),
      };
      Some(NewGrant {
        email: email.clone(),
        kind: template.kind,
        issue_id,
        expires_at: now + ChronoDuration::days(template.days),
        stripe_session_id: session_id.to_string(),
      })
    })
    .collect()
}

fn skip_without_grants() -> SkipCondition<CheckoutCtxData> {
  Arc::new(|ctx: FlowContext<CheckoutCtxData>| !ctx.read().has_access_grants())
}

pub fn build_checkout_flow(config: &AppConfig) -> Flow<CheckoutCtxData, AppError> {
  let mut p = Flow::<CheckoutCtxData, AppError>::new(&[
    ("validate_cart", StepPolicy::Required, None),
    ("quote_shipping", StepPolicy::Required, None),
    ("create_processor_session", StepPolicy::Required, None),
    ("persist_order", StepPolicy::BestEffort, None),
    ("insert_access_grants", StepPolicy::BestEffort, Some(skip_without_grants())),
  ])
  .with_default_timeout(config.external_call_timeout);

  p.on_step("validate_cart", |ctx: FlowContext<CheckoutCtxData>| async move {
    let (request, catalog) = {
      let guard = ctx.read();
      (guard.request.clone(), guard.app_state.catalog.clone())
    };
    let lines = validate_and_price(&request, &catalog)?;
    let billing_mode = billing_mode_for(&lines);
    let items_total_cents: i64 = lines.iter().map(PricedLine::line_total).sum();
    info!(
      lines = lines.len(),
      items_total_cents,
      billing_mode = ?billing_mode,
      "Cart validated and priced from the catalog."
    );
    ctx.update(|c| {
      c.lines = lines;
      c.billing_mode = billing_mode;
      c.items_total_cents = items_total_cents;
    });
    Ok::<_, AppError>(StepControl::Continue)
  });

  p.on_step("quote_shipping", |ctx: FlowContext<CheckoutCtxData>| async move {
    let quote = {
      let guard = ctx.read();
      calculate_shipping(
        guard.lines.iter().map(|l| (l.entry.id.as_str(), l.quantity as u64)),
        &guard.request.customer.address.country,
      )
    };
    info!(
      zone = quote.zone.as_str(),
      physical_units = quote.physical_units,
      cost_cents = quote.cost_cents,
      "Shipping quoted."
    );
    ctx.write().shipping = Some(quote);
    Ok::<_, AppError>(StepControl::Continue)
  });

  p.on_step("create_processor_session", |ctx: FlowContext<CheckoutCtxData>| async move {
    let (request, payments) = {
      let guard = ctx.read();
      (session_request(&guard), guard.app_state.payments.clone())
    };
    let session = payments.create_checkout_session(&request).await?;
    info!(session_id = %session.id, mode = request.mode.as_str(), "Processor session created.");
    ctx.write().session = Some(session);
    Ok::<_, AppError>(StepControl::Continue)
  });

  p.on_step("persist_order", |ctx: FlowContext<CheckoutCtxData>| async move {
    let (new_order, orders) = {
      let guard = ctx.read();
      let session = guard
        .session
        .as_ref()
        .ok_or_else(|| AppError::Internal("persist_order ran without a session".to_string()))?;
      (new_order(&guard, &session.id), guard.app_state.orders.clone())
    };
    let order = orders.insert_order(&new_order).await.map_err(|e| {
      warn!(session_id = %new_order.stripe_session_id, error = %e, "Provisional order could not be written.");
      e
    })?;
    info!(order_id = %order.id, is_recurring = order.is_recurring, "Provisional order written.");
    ctx.write().order_id = Some(order.id);
    Ok::<_, AppError>(StepControl::Continue)
  });

  p.on_step("insert_access_grants", |ctx: FlowContext<CheckoutCtxData>| async move {
    let (grants, store) = {
      let guard = ctx.read();
      let session_id = guard.session.as_ref().map(|s| s.id.clone()).unwrap_or_default();
      (new_grants(&guard, &session_id), guard.app_state.grants.clone())
    };
    let mut first_error = None;
    let mut created = 0;
    for grant in &grants {
      match store.insert_grant(grant).await {
        Ok(row) => {
          created += 1;
          info!(grant_id = %row.id, kind = ?row.kind, issue_id = ?row.issue_id, "Access grant inserted.");
        }
        Err(e) => {
          warn!(kind = ?grant.kind, issue_id = ?grant.issue_id, error = %e, "Access grant could not be inserted.");
          first_error.get_or_insert(e);
        }
      }
    }
    ctx.write().grants_created = created;
    match first_error {
      Some(e) => Err(e),
      None => Ok(StepControl::Continue),
    }
  });

  p
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRedirect {
  pub url: String,
  pub session_id: String,
  pub shipping: Option<ShippingQuote>,
  pub items_total_cents: i64,
  /// None when the provisional order could not be written.
  #[serde(skip)]
  pub order_id: Option<Uuid>,
  #[serde(skip)]
  pub grants_created: usize,
}

/// Runs the checkout flow and returns where to send the customer.
#[instrument(name = "checkout::create_checkout", skip_all, fields(lines = request.items.len()))]
pub async fn create_checkout(state: &AppState, request: CheckoutRequest) -> Result<CheckoutRedirect, AppError> {
  let ctx = FlowContext::new(CheckoutCtxData::new(state.clone(), request));
  let report = state.flows.run(ctx.clone()).await?;
  for degraded in &report.degraded {
    warn!(step = %degraded.step_name, error = %degraded.error, "Checkout continued past a failed side effect.");
  }
  if report.outcome == FlowOutcome::Stopped {
    return Err(AppError::Internal("Checkout was halted before a session was created.".to_string()));
  }
  let guard = ctx.read();
  let session = guard
    .session
    .clone()
    .ok_or_else(|| AppError::Internal("Checkout completed without a processor session.".to_string()))?;
  Ok(CheckoutRedirect {
    url: session.url,
    session_id: session.id,
    shipping: guard.shipping,
    items_total_cents: guard.items_total_cents,
    order_id: guard.order_id,
    grants_created: guard.grants_created,
  })
}

pub fn register_checkout_flow(registry: &FlowRegistry<AppError>, config: &AppConfig) {
  registry.register_flow(build_checkout_flow(config));
  info!("Checkout flow registered.");
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::{Address, CartLine, CustomerInfo};

  fn request(items: &[(&str, i64)]) -> CheckoutRequest {
    CheckoutRequest {
      items: items
        .iter()
        .map(|(id, quantity)| CartLine {
          id: id.to_string(),
          quantity: *quantity,
          price: None,
        })
        .collect(),
      customer: CustomerInfo {
        first_name: "Léa".to_string(),
        last_name: "Martin".to_string(),
        email: "lea@example.com".to_string(),
        phone: None,
        address: Address {
          line1: "1 rue de la Paix".to_string(),
          line2: None,
          postal_code: "75002".to_string(),
          city: "Paris".to_string(),
          country: "FR".to_string(),
        },
        billing_address: None,
        comment: None,
      },
    }
  }

  fn validation_message(result: Result<Vec<PricedLine>, AppError>) -> String {
    match result {
      Err(AppError::Validation(m)) => m,
      Err(other) => panic!("expected a validation error, got {:?}", other),
      Ok(_) => panic!("expected a validation error"),
    }
  }

  #[test]
  fn rejects_empty_carts_and_bad_customers() {
    let catalog = Catalog::standard();
    assert_eq!(validation_message(validate_and_price(&request(&[]), &catalog)), "no items provided");

    let mut no_email = request(&[("abo-1-an", 1)]);
    no_email.customer.email = "lea.example.com".to_string();
    assert!(validation_message(validate_and_price(&no_email, &catalog)).contains("email"));

    let mut no_name = request(&[("abo-1-an", 1)]);
    no_name.customer.last_name = "  ".to_string();
    assert!(validation_message(validate_and_price(&no_name, &catalog)).contains("name"));

    assert!(validation_message(validate_and_price(&request(&[("n42", 0)]), &catalog)).contains("quantity"));
    assert!(validation_message(validate_and_price(&request(&[("n42", -3)]), &catalog)).contains("quantity"));
  }

  #[test]
  fn rejects_unresolvable_price_references() {
    let overrides = [("abo-2-ans".to_string(), String::new())].into_iter().collect();
    let catalog = Catalog::standard().with_price_references(&overrides);
    let message = validation_message(validate_and_price(&request(&[("n42", 1), ("abo-2-ans", 1)]), &catalog));
    assert!(message.starts_with("missing price reference"));
  }

  #[test]
  fn unknown_digital_and_pass_ids_are_rejected() {
    let catalog = Catalog::standard();
    for id in ["pass-7-jours", "digital-", "digital-  "] {
      let message = validation_message(validate_and_price(&request(&[(id, 1)]), &catalog));
      assert!(message.starts_with("unknown product"), "{}: {}", id, message);
    }
    let lines = validate_and_price(&request(&[("pass-30-jours", 1), ("digital-n41", 1)]), &catalog).unwrap();
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|l| l.entry.access_grant.is_some()));
  }

  #[test]
  fn quantities_above_the_line_limit_are_rejected() {
    let catalog = Catalog::standard();
    let too_many = request(&[("n42", MAX_LINE_QUANTITY + 1)]);
    assert!(validation_message(validate_and_price(&too_many, &catalog)).contains("quantity"));
    assert!(validate_and_price(&request(&[("n42", MAX_LINE_QUANTITY)]), &catalog).is_ok());
  }

  #[test]
  fn any_recurring_line_makes_the_cart_recurring() {
    let catalog = Catalog::standard();
    let one_time = validate_and_price(&request(&[("n42", 2), ("digital-n40", 1)]), &catalog).unwrap();
    assert_eq!(billing_mode_for(&one_time), BillingMode::OneTime);

    let mixed = validate_and_price(&request(&[("n42", 1), ("abo-1-an", 1)]), &catalog).unwrap();
    assert_eq!(billing_mode_for(&mixed), BillingMode::Recurring);
  }

  #[test]
  fn prices_come_from_the_catalog() {
    let mut req = request(&[("abo-1-an", 1), ("physical-xyz", 2)]);
    req.items[0].price = Some(serde_json::json!(1));
    req.items[1].price = Some(serde_json::json!("0.01"));
    let lines = validate_and_price(&req, &Catalog::standard()).unwrap();
    let total: i64 = lines.iter().map(PricedLine::line_total).sum();
    assert_eq!(total, 3300 + 2 * 990);
  }
}
