// core/src/error.rs
use anyhow::Error as AnyhowError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
  #[error("Step not found: {step_name}")]
  StepNotFound { step_name: String },

  #[error("Handler missing for step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("Step '{step_name}' timed out after {after:?}")]
  StepTimedOut { step_name: String, after: Duration },

  #[error("Error in step handler or external operation. Source: {source}")]
  HandlerError {
    #[source]
    source: AnyhowError,
  },

  #[error("Configuration error for '{step_name}': {message}")]
  ConfigurationError { step_name: String, message: String },

  #[error("Internal flow error: {0}")]
  Internal(String),
}

impl FlowError {
  /// True when the failure was produced by a step exceeding its time budget.
  pub fn is_timeout(&self) -> bool {
    matches!(self, FlowError::StepTimedOut { .. })
  }
}

impl From<AnyhowError> for FlowError {
  fn from(err: AnyhowError) -> Self {
    FlowError::HandlerError { source: err }
  }
}

pub type FlowResult<T, E = FlowError> = std::result::Result<T, E>;
