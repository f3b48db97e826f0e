// core/src/pipeline/execution.rs

//! `Flow::run()`: executes steps in order and applies each step's policy.

use crate::core::context::Handler;
use crate::core::context_data::FlowContext;
use crate::core::control::{DegradedStep, FlowOutcome, FlowReport, StepControl};
use crate::core::step::StepDef;
use crate::error::FlowError;
use crate::pipeline::definition::Flow;
use tracing::{event, instrument, span, Instrument, Level};

impl<TData, Err> Flow<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Runs the flow against `ctx_data`.
  ///
  /// Returns `Err` only when a `Required` step fails, times out, or has no
  /// handler. Best-effort failures are logged and listed in
  /// [`FlowReport::degraded`].
  #[instrument(
        name = "Flow::run",
        skip_all,
        fields(
            flow_context_type = %std::any::type_name::<TData>(),
            num_steps = self.steps.len(),
        ),
        err(Display)
    )]
  pub async fn run(&self, ctx_data: FlowContext<TData>) -> Result<FlowReport, Err> {
    event!(Level::DEBUG, "Flow execution starting.");
    let mut degraded = Vec::new();

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();
      let step_span = span!(
        Level::INFO,
        "flow_step",
        step_name = step_name,
        step_index = step_idx,
        policy = ?step_def.policy
      );

      if let Some(skip_cond_fn) = &step_def.skip_if {
        if skip_cond_fn(ctx_data.clone()) {
          event!(parent: &step_span, Level::DEBUG, "Step skipped by its skip condition.");
          continue;
        }
      }

      let handlers = match self.handlers.get(step_name) {
        Some(handlers) if !handlers.is_empty() => handlers,
        _ => {
          event!(parent: &step_span, Level::ERROR, "Step has no handlers.");
          return Err(Err::from(FlowError::HandlerMissing {
            step_name: step_def.name.clone(),
          }));
        }
      };

      let step_result = self
        .run_step(step_def, handlers, ctx_data.clone())
        .instrument(step_span.clone())
        .await;

      match step_result {
        Ok(StepControl::Continue) => {
          event!(parent: &step_span, Level::DEBUG, "Step finished.");
        }
        Ok(StepControl::Stop) => {
          event!(parent: &step_span, Level::INFO, "Flow stopped by step handler.");
          return Ok(FlowReport::new(FlowOutcome::Stopped, degraded));
        }
        Err(e) if step_def.is_best_effort() => {
          event!(
            parent: &step_span,
            Level::ERROR,
            error = %e,
            side_effect_failure = true,
            "Best-effort step failed; continuing."
          );
          degraded.push(DegradedStep {
            step_name: step_def.name.clone(),
            error: e.to_string(),
          });
        }
        Err(e) => {
          event!(parent: &step_span, Level::ERROR, error = %e, "Required step failed.");
          return Err(e);
        }
      }
    }

    event!(Level::DEBUG, degraded_steps = degraded.len(), "Flow execution completed.");
    Ok(FlowReport::new(FlowOutcome::Completed, degraded))
  }

  async fn run_step(
    &self,
    step_def: &StepDef<TData>,
    handlers: &[Handler<TData, Err>],
    ctx_data: FlowContext<TData>,
  ) -> Result<StepControl, Err> {
    let all_handlers = async {
      for handler_fn in handlers {
        match handler_fn(ctx_data.clone()).await {
          Ok(StepControl::Continue) => {}
          Ok(StepControl::Stop) => return Ok(StepControl::Stop),
          Err(e) => return Err(e),
        }
      }
      Ok::<StepControl, Err>(StepControl::Continue)
    };

    match step_def.timeout {
      Some(limit) => match tokio::time::timeout(limit, all_handlers).await {
        Ok(result) => result,
        Err(_elapsed) => Err(Err::from(FlowError::StepTimedOut {
          step_name: step_def.name.clone(),
          after: limit,
        })),
      },
      None => all_handlers.await,
    }
  }
}
