// core/src/lib.rs

//! Kiosque flow: the small step engine behind the checkout and payment
//! reconciliation pipelines.
//!
//! A flow is an ordered list of named steps that share one context value:
//!  - Each step is either `Required` (a failure aborts the flow and is returned
//!    to the caller) or `BestEffort` (a failure is logged, recorded in the
//!    [`FlowReport`] and the flow moves on).
//!  - A step may carry a skip condition evaluated against the context.
//!  - A step may carry a timeout; an elapsed timeout counts as a failure of
//!    that step and follows the step's policy.
//!  - Handlers can end the flow early with [`StepControl::Stop`].
//!  - A type-keyed [`FlowRegistry`] dispatches a context to the flow that was
//!    registered for its type.

pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use crate::core::context::Handler;
pub use crate::core::context_data::FlowContext;
pub use crate::core::control::{DegradedStep, FlowOutcome, FlowReport, StepControl};
pub use crate::core::step::{SkipCondition, StepDef, StepPolicy};

pub use crate::pipeline::definition::Flow;

pub use crate::error::{FlowError, FlowResult};

pub use crate::registry::FlowRegistry;
