// app/src/services/payment_mock.rs

//! In-process payment processor for local runs and tests. Sessions start
//! unpaid; `mark_session_paid` plays the customer completing payment.

use crate::errors::{AppError, Result as AppResult};
use crate::services::payment::{
  ChargedLineItem, CheckoutSession, CheckoutSessionRequest, PaymentGateway, RetrievedSession, SessionMode,
  SubscriptionPeriod,
};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone)]
struct MockSession {
  request: CheckoutSessionRequest,
  payment_status: String,
  payment_intent_id: Option<String>,
  subscription_id: Option<String>,
}

#[derive(Debug, Default)]
pub struct MockPaymentGateway {
  sessions: Mutex<HashMap<String, MockSession>>,
  subscriptions: Mutex<HashMap<String, SubscriptionPeriod>>,
  latency: Mutex<Option<Duration>>,
  fail_create: Mutex<bool>,
}

impl MockPaymentGateway {
  pub fn new() -> Self {
    Self::default()
  }

  /// Delay applied to every call, to exercise timeouts.
  pub fn set_latency(&self, latency: Option<Duration>) {
    *self.latency.lock() = latency;
  }

  pub fn set_fail_create(&self, fail: bool) {
    *self.fail_create.lock() = fail;
  }

  /// Marks a session paid. Subscription sessions get a subscription whose
  /// first period starts now and lasts a year.
  pub fn mark_session_paid(&self, session_id: &str) -> bool {
    let mut sessions = self.sessions.lock();
    let Some(session) = sessions.get_mut(session_id) else {
      return false;
    };
    session.payment_status = "paid".to_string();
    session.payment_intent_id = Some(format!("pi_mock_{}", Uuid::new_v4().simple()));
    if session.request.mode == SessionMode::Subscription {
      let subscription_id = format!("sub_mock_{}", Uuid::new_v4().simple());
      let start = Utc::now();
      self.subscriptions.lock().insert(
        subscription_id.clone(),
        SubscriptionPeriod {
          current_period_start: start,
          current_period_end: start + ChronoDuration::days(365),
          default_payment_method: Some("pm_mock_card".to_string()),
        },
      );
      session.subscription_id = Some(subscription_id);
    }
    true
  }

  /// Copy of the request a session was created from.
  pub fn session_request(&self, session_id: &str) -> Option<CheckoutSessionRequest> {
    self.sessions.lock().get(session_id).map(|s| s.request.clone())
  }

  pub fn session_count(&self) -> usize {
    self.sessions.lock().len()
  }

  async fn simulate_latency(&self) {
    let latency = *self.latency.lock();
    if let Some(latency) = latency {
      tokio::time::sleep(latency).await;
    }
  }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
  #[instrument(name = "mock_payments::create_session", skip_all, fields(mode = request.mode.as_str()))]
  async fn create_checkout_session(&self, request: &CheckoutSessionRequest) -> AppResult<CheckoutSession> {
    self.simulate_latency().await;
    if *self.fail_create.lock() {
      return Err(AppError::Payment("Mock processor refused the session".to_string()));
    }
    if request.line_items.is_empty() {
      return Err(AppError::Payment("A session needs at least one line item".to_string()));
    }
    let id = format!("cs_test_{}", Uuid::new_v4().simple());
    self.sessions.lock().insert(
      id.clone(),
      MockSession {
        request: request.clone(),
        payment_status: "unpaid".to_string(),
        payment_intent_id: None,
        subscription_id: None,
      },
    );
    info!(session_id = %id, "Mock checkout session created.");
    Ok(CheckoutSession {
      url: format!("https://checkout.mock.local/pay/{}", id),
      id,
    })
  }

  #[instrument(name = "mock_payments::retrieve_session", skip(self))]
  async fn retrieve_checkout_session(&self, session_id: &str) -> AppResult<RetrievedSession> {
    self.simulate_latency().await;
    let session = self
      .sessions
      .lock()
      .get(session_id)
      .cloned()
      .ok_or_else(|| AppError::NotFound(format!("No such checkout session: {}", session_id)))?;
    let line_items: Vec<ChargedLineItem> = session
      .request
      .line_items
      .iter()
      .map(|li| ChargedLineItem {
        description: li.description.clone(),
        quantity: li.quantity,
        amount_total: li.unit_amount * li.quantity,
      })
      .collect();
    Ok(RetrievedSession {
      id: session_id.to_string(),
      payment_status: session.payment_status,
      mode: session.request.mode,
      customer_name: session.request.metadata.get("customer_name").cloned(),
      customer_email: Some(session.request.customer_email.clone()),
      amount_total: line_items.iter().map(|li| li.amount_total).sum(),
      currency: session.request.currency.clone(),
      payment_intent_id: session.payment_intent_id,
      subscription_id: session.subscription_id,
      line_items,
      metadata: session.request.metadata,
    })
  }

  #[instrument(name = "mock_payments::retrieve_subscription", skip(self))]
  async fn retrieve_subscription(&self, subscription_id: &str) -> AppResult<SubscriptionPeriod> {
    self.simulate_latency().await;
    self
      .subscriptions
      .lock()
      .get(subscription_id)
      .cloned()
      .ok_or_else(|| AppError::NotFound(format!("No such subscription: {}", subscription_id)))
  }
}
