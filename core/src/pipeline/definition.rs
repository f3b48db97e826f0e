// core/src/pipeline/definition.rs

//! The `Flow<TData, Err>` struct and the methods that shape its step list.

use crate::core::context::Handler;
use crate::core::step::{SkipCondition, StepDef, StepPolicy};
use std::collections::HashMap;
use std::time::Duration;

/// An ordered list of named steps over a shared `TData`, whose handlers fail
/// with `Err`.
///
/// `Err` must be constructible from [`crate::FlowError`] so that engine-level
/// failures (missing handlers, timeouts) surface in the caller's error type.
pub struct Flow<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<crate::error::FlowError> + Send + Sync + 'static,
{
  pub(crate) steps: Vec<StepDef<TData>>,
  pub(crate) handlers: HashMap<String, Vec<Handler<TData, Err>>>,
}

impl<TData, Err> Flow<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<crate::error::FlowError> + Send + Sync + 'static,
{
  /// Creates a flow from `(name, policy, skip_if)` triples, in execution order.
  pub fn new(step_defs: &[(&str, StepPolicy, Option<SkipCondition<TData>>)]) -> Self {
    let steps = step_defs
      .iter()
      .map(|(name, policy, skip_cond_opt)| StepDef {
        name: (*name).to_string(),
        policy: *policy,
        skip_if: skip_cond_opt.clone(),
        timeout: None,
      })
      .collect();

    Self {
      steps,
      handlers: HashMap::new(),
    }
  }

  /// Panics on an unknown step name. Step names are fixed at wiring time, so
  /// a miss here is a programming error rather than a runtime condition.
  pub(crate) fn ensure_step_exists(&self, step_name: &str) {
    if !self.steps.iter().any(|s| s.name == step_name) {
      panic!("Flow setup error: step '{}' not found in flow definition.", step_name);
    }
  }

  fn ensure_step_not_exists(&self, step_name: &str) {
    if self.steps.iter().any(|s| s.name == step_name) {
      panic!("Flow setup error: step '{}' already exists in flow definition.", step_name);
    }
  }

  fn step_mut(&mut self, step_name: &str) -> &mut StepDef<TData> {
    self.ensure_step_exists(step_name);
    self
      .steps
      .iter_mut()
      .find(|s| s.name == step_name)
      .unwrap_or_else(|| unreachable!("checked by ensure_step_exists"))
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  pub fn insert_after_step<S: Into<String>>(
    &mut self,
    existing_step_name: &str,
    new_step_name: S,
    policy: StepPolicy,
    skip_if: Option<SkipCondition<TData>>,
  ) {
    self.ensure_step_exists(existing_step_name);
    let name_str: String = new_step_name.into();
    self.ensure_step_not_exists(&name_str);
    let idx = self
      .steps
      .iter()
      .position(|s| s.name == existing_step_name)
      .unwrap_or(self.steps.len() - 1);
    self.steps.insert(
      idx + 1,
      StepDef {
        name: name_str,
        policy,
        skip_if,
        timeout: None,
      },
    );
  }

  /// Removing an unknown step is a no-op.
  pub fn remove_step(&mut self, step_name: &str) {
    if let Some(idx) = self.steps.iter().position(|s| s.name == step_name) {
      self.steps.remove(idx);
      self.handlers.remove(step_name);
    }
  }

  pub fn set_policy(&mut self, step_name: &str, policy: StepPolicy) {
    self.step_mut(step_name).policy = policy;
  }

  pub fn set_skip_condition(&mut self, step_name: &str, skip_if: Option<SkipCondition<TData>>) {
    self.step_mut(step_name).skip_if = skip_if;
  }

  pub fn set_timeout(&mut self, step_name: &str, timeout: Option<Duration>) {
    self.step_mut(step_name).timeout = timeout;
  }

  /// Gives every step that has no timeout of its own the `timeout` budget.
  pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
    for step in self.steps.iter_mut().filter(|s| s.timeout.is_none()) {
      step.timeout = Some(timeout);
    }
    self
  }
}
