// tests/checkout_tests.rs

mod common;

use common::{checkout_request, config_with, customer_json, test_app, test_app_with, test_config};
use kiosque::errors::AppError;
use kiosque::models::{BillingMode, GrantKind, PaymentStatus};
use kiosque::pipelines::checkout_pipeline::{create_checkout, SHIPPING_LINE_LABEL};
use kiosque::services::payment::SessionMode;
use kiosque::store::OrderStore;
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn subscription_checkout_creates_recurring_session_and_pending_order() {
  let app = test_app();
  let request = checkout_request(&[("abo-1-an", 1)], "camille@example.fr", "FR");

  let redirect = create_checkout(&app.state, request).await.expect("checkout succeeds");
  assert!(redirect.url.contains(&redirect.session_id));

  let session = app.payments.session_request(&redirect.session_id).expect("session recorded");
  assert_eq!(session.mode, SessionMode::Subscription);
  assert_eq!(session.line_items.len(), 1);
  assert_eq!(session.line_items[0].price_reference.as_deref(), Some("price_abo_1_an"));
  assert_eq!(session.line_items[0].unit_amount, 3300);
  assert_eq!(session.customer_email, "camille@example.fr");
  assert_eq!(
    session.success_url,
    "https://shop.test/checkout/success?session_id={CHECKOUT_SESSION_ID}"
  );
  assert_eq!(session.metadata.get("shipping_cents").map(String::as_str), Some("0"));

  let order = app
    .store
    .find_by_session(&redirect.session_id)
    .await
    .unwrap()
    .expect("provisional order written");
  assert_eq!(order.payment_status, PaymentStatus::Pending);
  assert_eq!(order.billing_mode, BillingMode::Recurring);
  assert_eq!(order.total_amount, 3300);
  assert_eq!(order.shipping_amount, 0);
  assert_eq!(order.items.0.len(), 1);
  assert_eq!(redirect.order_id, Some(order.id));
}

#[tokio::test]
async fn physical_items_abroad_add_shipping_line_outside_the_items_total() {
  let app = test_app();
  let request = checkout_request(&[("physical-xyz", 2)], "lea@example.be", "BE");

  let redirect = create_checkout(&app.state, request).await.expect("checkout succeeds");
  let quote = redirect.shipping.expect("shipping quoted");
  assert_eq!(quote.physical_units, 2);
  assert_eq!(quote.cost_cents, 1660);

  let session = app.payments.session_request(&redirect.session_id).unwrap();
  assert_eq!(session.mode, SessionMode::Payment);
  let shipping_line = session
    .line_items
    .iter()
    .find(|li| li.description == SHIPPING_LINE_LABEL)
    .expect("shipping line present");
  assert_eq!(shipping_line.unit_amount, 1660);
  assert_eq!(shipping_line.quantity, 1);
  assert!(shipping_line.price_reference.is_none());
  assert_eq!(session.metadata.get("shipping_cents").map(String::as_str), Some("1660"));

  let order = app.store.find_by_session(&redirect.session_id).await.unwrap().unwrap();
  assert_eq!(order.total_amount, 2 * 990);
  assert_eq!(order.shipping_amount, 1660);
  assert_eq!(order.billing_mode, BillingMode::OneTime);
}

#[tokio::test]
async fn client_supplied_prices_are_ignored() {
  let app = test_app();
  let request = serde_json::from_value(json!({
    "items": [{ "id": "abo-1-an", "quantity": 1, "price": 1 }],
    "customer": customer_json("camille@example.fr", "FR"),
  }))
  .unwrap();

  let redirect = create_checkout(&app.state, request).await.unwrap();
  let session = app.payments.session_request(&redirect.session_id).unwrap();
  assert_eq!(session.line_items[0].unit_amount, 3300);
  assert_eq!(redirect.items_total_cents, 3300);
}

#[tokio::test]
async fn invalid_carts_are_rejected_before_any_processor_call() {
  let app = test_app();

  let empty = checkout_request(&[], "camille@example.fr", "FR");
  let bad_email = checkout_request(&[("abo-1-an", 1)], "not-an-email", "FR");
  let zero_quantity = checkout_request(&[("physical-xyz", 0)], "camille@example.fr", "FR");

  for request in [empty, bad_email, zero_quantity] {
    let err = create_checkout(&app.state, request).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "unexpected error: {:?}", err);
  }
  assert_eq!(app.payments.session_count(), 0);
}

#[tokio::test]
async fn missing_price_reference_is_a_validation_error() {
  let app = test_app_with(config_with(&[("PRICE_REFERENCES", "abo-1-an=")]));
  let request = checkout_request(&[("abo-1-an", 1)], "camille@example.fr", "FR");

  let err = create_checkout(&app.state, request).await.unwrap_err();
  match err {
    AppError::Validation(msg) => assert!(msg.contains("abo-1-an")),
    other => panic!("expected a validation error, got {:?}", other),
  }
  assert_eq!(app.payments.session_count(), 0);
}

#[tokio::test]
async fn processor_failure_leaves_no_order_behind() {
  let app = test_app();
  app.payments.set_fail_create(true);
  let request = checkout_request(&[("abo-1-an", 1)], "camille@example.fr", "FR");

  let err = create_checkout(&app.state, request).await.unwrap_err();
  assert!(matches!(err, AppError::Payment(_)));
  assert_eq!(app.payments.session_count(), 0);
}

#[tokio::test]
async fn order_write_failure_still_redirects_to_payment() {
  let app = test_app();
  app.store.set_fail_order_writes(true);
  let request = checkout_request(&[("abo-1-an", 1)], "camille@example.fr", "FR");

  let redirect = create_checkout(&app.state, request).await.expect("redirect despite db failure");
  assert!(redirect.order_id.is_none());
  assert_eq!(app.payments.session_count(), 1);
  assert!(app.store.find_by_session(&redirect.session_id).await.unwrap().is_none());
}

#[tokio::test]
async fn digital_purchases_create_access_grants() {
  let app = test_app();
  let request = checkout_request(
    &[("digital-n42", 1), ("pass-30-jours", 1)],
    "Reader@Example.FR",
    "FR",
  );

  let redirect = create_checkout(&app.state, request).await.unwrap();
  assert_eq!(redirect.grants_created, 2);
  assert_eq!(redirect.shipping.map(|q| q.cost_cents), Some(0));

  let grants = app.store.grants_for("reader@example.fr");
  assert_eq!(grants.len(), 2);
  let single = grants.iter().find(|g| g.kind == GrantKind::SingleIssue).unwrap();
  assert_eq!(single.issue_id.as_deref(), Some("n42"));
  assert_eq!(single.stripe_session_id, redirect.session_id);
  let pass = grants.iter().find(|g| g.kind == GrantKind::TimePass).unwrap();
  assert!(pass.issue_id.is_none());
}

#[tokio::test]
async fn grant_write_failure_does_not_fail_checkout() {
  let app = test_app();
  app.store.set_fail_grant_writes(true);
  let request = checkout_request(&[("digital-n41", 1)], "reader@example.fr", "FR");

  let redirect = create_checkout(&app.state, request).await.unwrap();
  assert_eq!(redirect.grants_created, 0);
  assert!(app.store.grants_for("reader@example.fr").is_empty());
}

#[tokio::test]
async fn slow_processor_surfaces_as_timeout() {
  let mut config = test_config();
  config.external_call_timeout = Duration::from_millis(50);
  let app = test_app_with(config);
  app.payments.set_latency(Some(Duration::from_millis(300)));
  let request = checkout_request(&[("abo-1-an", 1)], "camille@example.fr", "FR");

  let err = create_checkout(&app.state, request).await.unwrap_err();
  assert!(err.is_timeout(), "expected a timeout, got {:?}", err);
}
