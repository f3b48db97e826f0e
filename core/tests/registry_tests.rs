// tests/registry_tests.rs
mod common;

use common::*;
use kiosque_flow::{Flow, FlowContext, FlowOutcome, FlowRegistry, StepControl, StepPolicy};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct CheckoutLikeContext {
  val: String,
}
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct ReconcileLikeContext {
  num: i32,
}

#[tokio::test]
async fn test_registry_runs_flow_for_context_type() {
  setup_tracing();
  let registry = FlowRegistry::<TestError>::new();

  let mut checkout = Flow::<CheckoutLikeContext, TestError>::new(&[("create", StepPolicy::Required, None)]);
  checkout.on_step("create", |ctx: FlowContext<CheckoutLikeContext>| async move {
    ctx.write().val = "created".to_string();
    Ok::<StepControl, TestError>(StepControl::Continue)
  });
  registry.register_flow(checkout);

  let mut reconcile = Flow::<ReconcileLikeContext, TestError>::new(&[("confirm", StepPolicy::Required, None)]);
  reconcile.on_step("confirm", |ctx: FlowContext<ReconcileLikeContext>| async move {
    ctx.write().num = 100;
    Ok::<StepControl, TestError>(StepControl::Continue)
  });
  registry.register_flow(reconcile);

  assert!(registry.is_registered::<CheckoutLikeContext>());
  assert!(registry.is_registered::<ReconcileLikeContext>());

  let ctx_a = FlowContext::new(CheckoutLikeContext::default());
  let report = registry.run(ctx_a.clone()).await.unwrap();
  assert_eq!(report.outcome, FlowOutcome::Completed);
  assert_eq!(ctx_a.read().val, "created");

  let ctx_b = FlowContext::new(ReconcileLikeContext::default());
  registry.run(ctx_b.clone()).await.unwrap();
  assert_eq!(ctx_b.read().num, 100);
}

#[tokio::test]
async fn test_registry_flow_not_found() {
  setup_tracing();
  let registry = FlowRegistry::<TestError>::new();
  let result = registry.run(FlowContext::new(CheckoutLikeContext::default())).await;
  match result.unwrap_err() {
    TestError::Flow(s) => {
      assert!(s.contains("ConfigurationError"));
      assert!(s.contains("No flow registered"));
    }
    other => panic!("Expected TestError::Flow, got {:?}", other),
  }
}
