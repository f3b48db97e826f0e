// app/src/pipelines/contexts.rs

//! Data carried through each flow. Handlers receive these wrapped in
//! `kiosque_flow::FlowContext`.

use crate::catalog::CatalogEntry;
use crate::models::{BillingMode, CheckoutRequest, MarkPaidOutcome, Order};
use crate::services::payment::{CheckoutSession, RetrievedSession, SessionMode, SubscriptionPeriod};
use crate::shipping::ShippingQuote;
use crate::state::AppState;
use uuid::Uuid;

/// A cart line after validation, priced from the catalog.
#[derive(Debug, Clone)]
pub struct PricedLine {
  pub entry: CatalogEntry,
  pub quantity: i32,
}

impl PricedLine {
  pub fn line_total(&self) -> i64 {
    self.entry.price_cents * i64::from(self.quantity)
  }
}

#[derive(Clone)]
pub struct CheckoutCtxData {
  pub app_state: AppState,
  pub request: CheckoutRequest,
  pub lines: Vec<PricedLine>,
  pub billing_mode: BillingMode,
  /// Items only; shipping is carried separately.
  pub items_total_cents: i64,
  pub shipping: Option<ShippingQuote>,
  pub session: Option<CheckoutSession>,
  pub order_id: Option<Uuid>,
  pub grants_created: usize,
}

impl CheckoutCtxData {
  pub fn new(app_state: AppState, request: CheckoutRequest) -> Self {
    Self {
      app_state,
      request,
      lines: Vec::new(),
      billing_mode: BillingMode::OneTime,
      items_total_cents: 0,
      shipping: None,
      session: None,
      order_id: None,
      grants_created: 0,
    }
  }

  pub fn shipping_cents(&self) -> i64 {
    self.shipping.map(|q| q.cost_cents).unwrap_or(0)
  }

  pub fn has_access_grants(&self) -> bool {
    self.lines.iter().any(|l| l.entry.access_grant.is_some())
  }
}

#[derive(Clone)]
pub struct ReconcileCtxData {
  pub app_state: AppState,
  pub session_id: String,
  pub session: Option<RetrievedSession>,
  pub subscription_period: Option<SubscriptionPeriod>,
  pub mark_paid: Option<MarkPaidOutcome>,
  /// Issue ids whose decrement was refused for lack of stock.
  pub oversold: Vec<String>,
  pub receipt_sent: bool,
  pub admin_alert_sent: bool,
  pub unrecorded_alert_sent: bool,
}

impl ReconcileCtxData {
  pub fn new(app_state: AppState, session_id: impl Into<String>) -> Self {
    Self {
      app_state,
      session_id: session_id.into(),
      session: None,
      subscription_period: None,
      mark_paid: None,
      oversold: Vec::new(),
      receipt_sent: false,
      admin_alert_sent: false,
      unrecorded_alert_sent: false,
    }
  }

  pub fn is_paid(&self) -> bool {
    self.session.as_ref().is_some_and(|s| s.is_paid())
  }

  pub fn subscription_to_fetch(&self) -> Option<String> {
    self
      .session
      .as_ref()
      .filter(|s| s.mode == SessionMode::Subscription)
      .and_then(|s| s.subscription_id.clone())
  }

  /// Paid at the processor, but no order row exists for the session.
  pub fn order_missing(&self) -> bool {
    matches!(self.mark_paid, Some(MarkPaidOutcome::Missing))
  }

  /// The order, if this run is the one that marked it paid.
  pub fn transitioned_order(&self) -> Option<&Order> {
    self.mark_paid.as_ref().and_then(MarkPaidOutcome::transitioned_order)
  }
}
