pub mod context;
pub mod context_data;
pub mod control;
pub mod step;

pub use context::Handler;
pub use context_data::FlowContext;
pub use control::{DegradedStep, FlowOutcome, FlowReport, StepControl};
pub use step::{StepDef, StepPolicy};
