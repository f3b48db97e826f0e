// core/src/registry.rs

//! `FlowRegistry<E>`: flows keyed by the type of context they run over.
//! Callers hand over a `FlowContext<T>` and the registry picks the flow that
//! was registered for `T`.

use crate::core::context_data::FlowContext;
use crate::core::control::FlowReport;
use crate::error::FlowError;
use crate::pipeline::definition::Flow;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{event, Level};

#[async_trait]
trait AnyFlowRunner<ApplicationError>: Send + Sync
where
  ApplicationError: std::error::Error + Send + Sync + 'static,
{
  /// `ctx_obj` holds a `FlowContext<TData>` for the wrapped flow's `TData`.
  async fn run_erased(&self, ctx_obj: Box<dyn Any + Send>) -> Result<FlowReport, ApplicationError>;
}

struct FlowWrapper<TData, FlowErr, ApplicationError>
where
  TData: 'static + Send + Sync,
  FlowErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
  ApplicationError: std::error::Error + From<FlowErr> + From<FlowError> + Send + Sync + 'static,
{
  flow: Arc<Flow<TData, FlowErr>>,
  _phantom: PhantomData<fn() -> ApplicationError>,
}

#[async_trait]
impl<TData, FlowErr, ApplicationError> AnyFlowRunner<ApplicationError> for FlowWrapper<TData, FlowErr, ApplicationError>
where
  TData: 'static + Send + Sync,
  FlowErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
  ApplicationError: std::error::Error + From<FlowErr> + From<FlowError> + Send + Sync + 'static,
{
  async fn run_erased(&self, ctx_obj: Box<dyn Any + Send>) -> Result<FlowReport, ApplicationError> {
    let typed_ctx = match ctx_obj.downcast::<FlowContext<TData>>() {
      Ok(boxed) => *boxed,
      Err(_) => {
        let expected = std::any::type_name::<FlowContext<TData>>();
        event!(Level::ERROR, "Context object type mismatch. Expected {}.", expected);
        return Err(ApplicationError::from(FlowError::Internal(format!(
          "registry dispatch expected {}",
          expected
        ))));
      }
    };
    self.flow.run(typed_ctx).await.map_err(ApplicationError::from)
  }
}

/// Registry of flows; `ApplicationError` is what [`FlowRegistry::run`] returns.
pub struct FlowRegistry<ApplicationError = FlowError>
where
  ApplicationError: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  registry: RwLock<HashMap<TypeId, Arc<dyn AnyFlowRunner<ApplicationError>>>>,
}

impl<ApplicationError> Default for FlowRegistry<ApplicationError>
where
  ApplicationError: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}

impl<ApplicationError> FlowRegistry<ApplicationError>
where
  ApplicationError: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      registry: RwLock::new(HashMap::new()),
    }
  }

  /// Registers `flow` for its context type. A later registration for the same
  /// type replaces the earlier one.
  pub fn register_flow<TData, FlowErr>(&self, flow: Flow<TData, FlowErr>)
  where
    TData: 'static + Send + Sync,
    FlowErr: std::error::Error + From<FlowError> + Send + Sync + 'static,
    ApplicationError: From<FlowErr>,
  {
    event!(
      Level::DEBUG,
      context_type = %std::any::type_name::<TData>(),
      steps = ?flow.step_names(),
      "Registering flow."
    );
    let wrapper = FlowWrapper::<TData, FlowErr, ApplicationError> {
      flow: Arc::new(flow),
      _phantom: PhantomData,
    };
    self.registry.write().insert(TypeId::of::<TData>(), Arc::new(wrapper));
  }

  pub fn is_registered<TData: 'static>(&self) -> bool {
    self.registry.read().contains_key(&TypeId::of::<TData>())
  }

  /// Runs the flow registered for `TData`.
  pub async fn run<TData>(&self, ctx_data: FlowContext<TData>) -> Result<FlowReport, ApplicationError>
  where
    TData: 'static + Send + Sync,
  {
    let runner = self.registry.read().get(&TypeId::of::<TData>()).cloned();
    let runner = runner.ok_or_else(|| {
      let type_name = std::any::type_name::<TData>();
      event!(Level::ERROR, "No flow registered for context type {}.", type_name);
      ApplicationError::from(FlowError::ConfigurationError {
        step_name: "FlowRegistry::run".to_string(),
        message: format!("No flow registered for context type {}", type_name),
      })
    })?;

    runner.run_erased(Box::new(ctx_data)).await
  }
}
