// app/src/pipelines/reconciliation_pipeline.rs

//! Completed session reference -> authoritative processor state -> paid order,
//! subscription window, stock decrement, notification emails.
//!
//! Safe to run any number of times for the same session: stock and emails
//! only follow the run whose guarded update actually moved the order to paid.

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::{MarkPaidOutcome, PaymentConfirmation, StockDecrement};
use crate::money::format_eur;
use crate::pipelines::common_steps::{admin_alert, customer_receipt, send_email_step, unrecorded_payment_alert};
use crate::pipelines::contexts::ReconcileCtxData;
use crate::services::payment::{ChargedLineItem, SessionMode};
use crate::shipping::{classify, ItemClass};
use crate::state::AppState;
use kiosque_flow::{Flow, FlowContext, FlowRegistry, SkipCondition, StepControl, StepPolicy};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaidSummary {
  pub session_id: String,
  pub customer_name: Option<String>,
  pub customer_email: Option<String>,
  pub total: String,
  pub amount_total: i64,
  pub currency: String,
  pub line_items: Vec<ChargedLineItem>,
}

/// Body of the confirmation endpoint. Both shapes are successful responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationResult {
  pub success: bool,
  /// `paid` or `pending`.
  pub status: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
  #[serde(flatten)]
  pub summary: Option<PaidSummary>,
}

impl ReconciliationResult {
  pub fn is_paid(&self) -> bool {
    self.success
  }
}

fn skip_without_subscription() -> SkipCondition<ReconcileCtxData> {
  Arc::new(|ctx: FlowContext<ReconcileCtxData>| ctx.read().subscription_to_fetch().is_none())
}

fn skip_unless_transitioned() -> SkipCondition<ReconcileCtxData> {
  Arc::new(|ctx: FlowContext<ReconcileCtxData>| ctx.read().transitioned_order().is_none())
}

fn skip_unless_order_missing() -> SkipCondition<ReconcileCtxData> {
  Arc::new(|ctx: FlowContext<ReconcileCtxData>| !ctx.read().order_missing())
}

pub fn build_reconciliation_flow(config: &AppConfig) -> Flow<ReconcileCtxData, AppError> {
  let mut p = Flow::<ReconcileCtxData, AppError>::new(&[
    ("validate_session_id", StepPolicy::Required, None),
    ("retrieve_session", StepPolicy::Required, None),
    ("fetch_subscription_period", StepPolicy::BestEffort, Some(skip_without_subscription())),
    ("mark_order_paid", StepPolicy::BestEffort, None),
    ("decrement_stock", StepPolicy::BestEffort, Some(skip_unless_transitioned())),
    ("send_customer_receipt", StepPolicy::BestEffort, Some(skip_unless_transitioned())),
    ("send_admin_alert", StepPolicy::BestEffort, Some(skip_unless_transitioned())),
    ("alert_unrecorded_payment", StepPolicy::BestEffort, Some(skip_unless_order_missing())),
  ])
  .with_default_timeout(config.external_call_timeout);

  p.on_step("validate_session_id", |ctx: FlowContext<ReconcileCtxData>| async move {
    let trimmed = ctx.read().session_id.trim().to_string();
    if trimmed.is_empty() {
      return Err(AppError::Validation("session_id is required".to_string()));
    }
    if !trimmed.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
      return Err(AppError::Validation("session_id is malformed".to_string()));
    }
    ctx.write().session_id = trimmed;
    Ok::<_, AppError>(StepControl::Continue)
  });

  p.on_step("retrieve_session", |ctx: FlowContext<ReconcileCtxData>| async move {
    let (session_id, payments) = {
      let guard = ctx.read();
      (guard.session_id.clone(), guard.app_state.payments.clone())
    };
    let session = payments.retrieve_checkout_session(&session_id).await?;
    let paid = session.is_paid();
    info!(
      session_id = %session_id,
      payment_status = %session.payment_status,
      mode = session.mode.as_str(),
      "Processor session retrieved."
    );
    ctx.write().session = Some(session);
    if !paid {
      return Ok::<_, AppError>(StepControl::Stop);
    }
    Ok(StepControl::Continue)
  });

  p.on_step("fetch_subscription_period", |ctx: FlowContext<ReconcileCtxData>| async move {
    let (subscription_id, payments) = {
      let guard = ctx.read();
      (guard.subscription_to_fetch(), guard.app_state.payments.clone())
    };
    let Some(subscription_id) = subscription_id else {
      return Ok::<_, AppError>(StepControl::Continue);
    };
    let period = payments.retrieve_subscription(&subscription_id).await?;
    info!(
      subscription_id = %subscription_id,
      start = %period.current_period_start,
      end = %period.current_period_end,
      "Subscription period captured."
    );
    ctx.write().subscription_period = Some(period);
    Ok(StepControl::Continue)
  });

  p.on_step("mark_order_paid", |ctx: FlowContext<ReconcileCtxData>| async move {
    let (session_id, confirmation, orders) = {
      let guard = ctx.read();
      let session = guard
        .session
        .as_ref()
        .ok_or_else(|| AppError::Internal("mark_order_paid ran without a session".to_string()))?;
      let is_recurring = session.mode == SessionMode::Subscription;
      let period = guard.subscription_period.as_ref().filter(|_| is_recurring);
      let confirmation = PaymentConfirmation {
        payment_intent_id: session.payment_intent_id.clone(),
        subscription_id: session.subscription_id.clone(),
        is_recurring,
        subscription_start: period.map(|p| p.current_period_start),
        subscription_end: period.map(|p| p.current_period_end),
      };
      (guard.session_id.clone(), confirmation, guard.app_state.orders.clone())
    };

    let outcome = match orders.mark_paid(&session_id, &confirmation).await {
      Ok(outcome) => outcome,
      Err(e) => {
        error!(session_id = %session_id, error = %e, reconciliation_failure = true, "Order could not be marked paid.");
        return Err(e);
      }
    };
    match &outcome {
      MarkPaidOutcome::Transitioned(order) => {
        info!(session_id = %session_id, order_id = %order.id, "Order marked paid.")
      }
      MarkPaidOutcome::AlreadyPaid => info!(session_id = %session_id, "Order already paid; nothing to do."),
      MarkPaidOutcome::Missing => {
        warn!(session_id = %session_id, reconciliation_failure = true, "No order row for a paid session.")
      }
    }
    ctx.write().mark_paid = Some(outcome);
    Ok::<_, AppError>(StepControl::Continue)
  });

  p.on_step("decrement_stock", |ctx: FlowContext<ReconcileCtxData>| async move {
    let (physical_lines, issues) = {
      let guard = ctx.read();
      let lines: Vec<(String, i32)> = guard
        .transitioned_order()
        .map(|order| {
          order
            .items
            .iter()
            .filter(|l| classify(&l.id) == ItemClass::Physical)
            .map(|l| (l.id.clone(), l.quantity))
            .collect()
        })
        .unwrap_or_default();
      (lines, guard.app_state.issues.clone())
    };

    let mut first_error = None;
    for (issue_id, quantity) in physical_lines {
      let decrement = issues.decrement_stock(&issue_id, quantity).await;
      match decrement {
        Ok(StockDecrement::Applied { remaining }) => {
          info!(issue_id = %issue_id, quantity, remaining, "Stock decremented.")
        }
        Ok(StockDecrement::Rejected) => {
          warn!(issue_id = %issue_id, quantity, oversell = true, "Insufficient stock; decrement refused.");
          ctx.write().oversold.push(issue_id);
        }
        Err(e) => {
          error!(issue_id = %issue_id, error = %e, "Stock decrement failed.");
          first_error.get_or_insert(e);
        }
      }
    }
    match first_error {
      Some(e) => Err(e),
      None => Ok(StepControl::Continue),
    }
  });

  p.on_step("send_customer_receipt", |ctx: FlowContext<ReconcileCtxData>| async move {
    let (email, mailer) = {
      let guard = ctx.read();
      let session = guard
        .session
        .as_ref()
        .ok_or_else(|| AppError::Internal("receipt step ran without a session".to_string()))?;
      let fallback = guard.transitioned_order().map(|o| o.email.as_str());
      (customer_receipt(session, fallback)?, guard.app_state.mailer.clone())
    };
    send_email_step(mailer.as_ref(), &email).await?;
    ctx.write().receipt_sent = true;
    Ok::<_, AppError>(StepControl::Continue)
  });

  p.on_step("send_admin_alert", |ctx: FlowContext<ReconcileCtxData>| async move {
    let (email, mailer) = {
      let guard = ctx.read();
      let session = guard
        .session
        .as_ref()
        .ok_or_else(|| AppError::Internal("admin alert step ran without a session".to_string()))?;
      (
        admin_alert(session, &guard.app_state.config.admin_email),
        guard.app_state.mailer.clone(),
      )
    };
    send_email_step(mailer.as_ref(), &email).await?;
    ctx.write().admin_alert_sent = true;
    Ok::<_, AppError>(StepControl::Continue)
  });

  // Sent on every confirmation of such a session until the row exists.
  p.on_step("alert_unrecorded_payment", |ctx: FlowContext<ReconcileCtxData>| async move {
    let (email, mailer) = {
      let guard = ctx.read();
      let session = guard
        .session
        .as_ref()
        .ok_or_else(|| AppError::Internal("unrecorded payment alert ran without a session".to_string()))?;
      (
        unrecorded_payment_alert(session, &guard.app_state.config.admin_email),
        guard.app_state.mailer.clone(),
      )
    };
    send_email_step(mailer.as_ref(), &email).await?;
    let mut guard = ctx.write();
    warn!(session_id = %guard.session_id, reconciliation_failure = true, "Admin alerted about a paid session without an order row.");
    guard.unrecorded_alert_sent = true;
    Ok::<_, AppError>(StepControl::Continue)
  });

  p
}

/// Runs the reconciliation flow for `session_id`. Repeatable: a session that
/// is already reconciled yields the same result and no new side effects.
#[instrument(name = "reconciliation::reconcile_payment", skip(state))]
pub async fn reconcile_payment(state: &AppState, session_id: &str) -> Result<ReconciliationResult, AppError> {
  let ctx = FlowContext::new(ReconcileCtxData::new(state.clone(), session_id));
  let report = state.flows.run(ctx.clone()).await?;
  for degraded in &report.degraded {
    warn!(step = %degraded.step_name, error = %degraded.error, "Reconciliation continued past a failed side effect.");
  }

  let guard = ctx.read();
  let session = guard
    .session
    .as_ref()
    .ok_or_else(|| AppError::Internal("Reconciliation finished without a processor session.".to_string()))?;
  if !session.is_paid() {
    return Ok(ReconciliationResult {
      success: false,
      status: "pending".to_string(),
      message: Some(format!(
        "Payment not confirmed yet (processor status: {}). Please try again in a moment.",
        session.payment_status
      )),
      summary: None,
    });
  }
  info!(
    receipt_sent = guard.receipt_sent,
    admin_alert_sent = guard.admin_alert_sent,
    unrecorded_alert_sent = guard.unrecorded_alert_sent,
    oversold = guard.oversold.len(),
    "Payment reconciled."
  );
  Ok(ReconciliationResult {
    success: true,
    status: "paid".to_string(),
    message: None,
    summary: Some(PaidSummary {
      session_id: session.id.clone(),
      customer_name: session.customer_name.clone(),
      customer_email: session.customer_email.clone(),
      total: format_eur(session.amount_total),
      amount_total: session.amount_total,
      currency: session.currency.clone(),
      line_items: session.line_items.clone(),
    }),
  })
}

pub fn register_reconciliation_flow(registry: &FlowRegistry<AppError>, config: &AppConfig) {
  registry.register_flow(build_reconciliation_flow(config));
  info!("Reconciliation flow registered.");
}
