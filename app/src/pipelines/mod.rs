// app/src/pipelines/mod.rs

//! Builds and registers the application's flows.

use crate::config::AppConfig;
use crate::errors::AppError;
use kiosque_flow::FlowRegistry;

pub mod common_steps;
pub mod contexts;

pub mod checkout_pipeline;
pub mod reconciliation_pipeline;

/// Registers every flow with `registry`. Called once while building `AppState`.
pub fn register_all_flows(registry: &FlowRegistry<AppError>, config: &AppConfig) {
  tracing::info!("Registering flows...");

  checkout_pipeline::register_checkout_flow(registry, config);
  reconciliation_pipeline::register_reconciliation_flow(registry, config);

  tracing::info!("All application flows registered.");
}
