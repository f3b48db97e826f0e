// tests/error_handling_tests.rs
mod common;
use common::*;
use kiosque_flow::{Flow, FlowContext, FlowError, StepControl, StepPolicy};
use serial_test::serial;

#[tokio::test]
#[serial]
async fn test_flow_run_catches_handler_missing() {
  setup_tracing();
  let flow = Flow::<TestContext, TestError>::new(&[("missing", StepPolicy::Required, None)]);
  let result = flow.run(FlowContext::new(TestContext::default())).await;
  match result.unwrap_err() {
    TestError::Flow(s) => {
      assert!(s.contains("HandlerMissing"));
      assert!(s.contains("missing"));
    }
    other => panic!("Expected TestError::Flow(HandlerMissing), got {:?}", other),
  }
}

// A best-effort step still needs a handler: a missing one is a wiring bug,
// not a runtime side-effect failure.
#[tokio::test]
#[serial]
async fn test_best_effort_step_without_handler_is_still_an_error() {
  setup_tracing();
  let flow = Flow::<TestContext, TestError>::new(&[("unwired", StepPolicy::BestEffort, None)]);
  let result = flow.run(FlowContext::new(TestContext::default())).await;
  assert!(matches!(result, Err(TestError::Flow(s)) if s.contains("HandlerMissing")));
}

#[tokio::test]
#[serial]
async fn test_flow_with_flow_error_type() {
  setup_tracing();
  let mut flow = Flow::<TestContext, FlowError>::new(&[("task", StepPolicy::Required, None)]);
  flow.on_step("task", |ctx: FlowContext<TestContext>| async move {
    ctx.write().counter = 1;
    Ok::<StepControl, FlowError>(StepControl::Continue)
  });
  let ctx = FlowContext::new(TestContext::default());
  assert!(flow.run(ctx.clone()).await.is_ok());
  assert_eq!(ctx.read().counter, 1);

  let mut failing = Flow::<TestContext, FlowError>::new(&[("fail_task", StepPolicy::Required, None)]);
  failing.on_step("fail_task", |_ctx| async move {
    Err::<StepControl, FlowError>(FlowError::Internal("Intentional".to_string()))
  });
  match failing.run(FlowContext::new(TestContext::default())).await {
    Err(FlowError::Internal(s)) => assert_eq!(s, "Intentional"),
    other => panic!("Expected FlowError::Internal, got {:?}", other),
  }
}

#[test]
fn test_anyhow_converts_to_handler_error() {
  let err: FlowError = anyhow::anyhow!("socket closed").into();
  assert!(matches!(err, FlowError::HandlerError { .. }));
  assert!(err.to_string().contains("socket closed"));
  assert!(!err.is_timeout());
}
