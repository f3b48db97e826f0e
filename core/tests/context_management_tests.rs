// tests/context_management_tests.rs
mod common;

use common::*;
use kiosque_flow::{Flow, FlowContext, StepControl, StepPolicy};
use serial_test::serial;

#[tokio::test]
#[serial]
async fn test_context_is_shared_between_steps() {
  setup_tracing();
  let mut flow = Flow::<TestContext, TestError>::new(&[
    ("step1_modify", StepPolicy::Required, None),
    ("step2_read_modify", StepPolicy::Required, None),
  ]);

  flow.on_step("step1_modify", |ctx: FlowContext<TestContext>| async move {
    ctx.update(|c| {
      c.counter = 10;
      c.message = "SetByStep1".to_string();
    });
    Ok::<StepControl, TestError>(StepControl::Continue)
  });

  flow.on_step("step2_read_modify", |ctx: FlowContext<TestContext>| async move {
    let mut guard = ctx.write();
    assert_eq!(guard.counter, 10);
    guard.counter += 5;
    guard.message.push_str("_ThenStep2");
    Ok::<StepControl, TestError>(StepControl::Continue)
  });

  let ctx = FlowContext::new(TestContext::default());
  flow.run(ctx.clone()).await.unwrap();

  let snapshot = ctx.snapshot();
  assert_eq!(snapshot.counter, 15);
  assert_eq!(snapshot.message, "SetByStep1_ThenStep2");
}

#[tokio::test]
#[serial]
async fn test_context_clone_shares_data() {
  let original = FlowContext::new(TestContext::default());
  let cloned = original.clone();

  original.write().counter = 5;
  assert_eq!(cloned.read().counter, 5);

  cloned.write().counter = 10;
  assert_eq!(*original.map_read(|c| &c.counter), 10);
}

#[tokio::test]
#[serial]
async fn test_context_locks_dropped_around_await() {
  let ctx = FlowContext::new(TestContext::default());

  let handler_logic = async {
    let initial = ctx.read().counter;
    tokio::time::sleep(std::time::Duration::from_millis(1)).await;
    ctx.update(|c| c.counter = initial + 1);
  };

  handler_logic.await;
  assert_eq!(ctx.read().counter, 1);
}
