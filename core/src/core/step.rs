// core/src/core/step.rs

use super::FlowContext;
use std::sync::Arc;
use std::time::Duration;

/// Evaluated before a step runs; `true` skips the step.
pub type SkipCondition<TData> = Arc<dyn Fn(FlowContext<TData>) -> bool + Send + Sync + 'static>;

/// What a failure of the step means for the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPolicy {
  /// Failure (including timeout) aborts the flow and is returned to the caller.
  Required,
  /// Failure is logged and recorded in the report; the flow continues.
  BestEffort,
}

#[derive(Clone)]
pub struct StepDef<T: 'static + Send + Sync> {
  pub name: String,
  pub policy: StepPolicy,
  pub skip_if: Option<SkipCondition<T>>,
  pub timeout: Option<Duration>,
}

impl<T: 'static + Send + Sync> StepDef<T> {
  pub fn is_best_effort(&self) -> bool {
    self.policy == StepPolicy::BestEffort
  }
}

impl<T: 'static + Send + Sync> std::fmt::Debug for StepDef<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StepDef")
      .field("name", &self.name)
      .field("policy", &self.policy)
      .field("skip_if_present", &self.skip_if.is_some())
      .field("timeout", &self.timeout)
      .finish()
  }
}
