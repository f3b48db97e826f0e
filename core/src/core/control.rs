// core/src/core/control.rs

//! Signals returned by step handlers and the report produced by a flow run.

/// Returned by a handler to continue with the next step or end the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepControl {
  Continue,
  /// End the flow now. Later steps do not run. This is not an error.
  Stop,
}

/// How a flow run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowOutcome {
  /// Every step ran, was skipped, or failed under a best-effort policy.
  Completed,
  /// A handler returned [`StepControl::Stop`].
  Stopped,
}

/// A best-effort step that failed (or timed out) and was stepped over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DegradedStep {
  pub step_name: String,
  pub error: String,
}

/// Result of a flow run that did not fail outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowReport {
  pub outcome: FlowOutcome,
  pub degraded: Vec<DegradedStep>,
}

impl FlowReport {
  pub(crate) fn new(outcome: FlowOutcome, degraded: Vec<DegradedStep>) -> Self {
    Self { outcome, degraded }
  }

  pub fn is_completed(&self) -> bool {
    self.outcome == FlowOutcome::Completed
  }

  pub fn is_stopped(&self) -> bool {
    self.outcome == FlowOutcome::Stopped
  }

  /// True when no best-effort step failed.
  pub fn is_clean(&self) -> bool {
    self.degraded.is_empty()
  }

  pub fn degraded_step(&self, step_name: &str) -> Option<&DegradedStep> {
    self.degraded.iter().find(|d| d.step_name == step_name)
  }
}
