// core/src/core/context.rs

//! The boxed handler type stored for every step.

use crate::core::context_data::FlowContext;
use crate::core::control::StepControl;
use std::future::Future;
use std::pin::Pin;

/// A step handler.
///
/// Receives a clone of the shared [`FlowContext`] and resolves to a
/// [`StepControl`] or the flow's error type. Lock guards taken on the context
/// must be dropped before the handler awaits anything.
pub type Handler<TData, Err> = Box<
  dyn Fn(FlowContext<TData>) -> Pin<Box<dyn Future<Output = Result<StepControl, Err>> + Send>> + Send + Sync,
>;
