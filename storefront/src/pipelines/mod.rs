// payhula-storefront/src/pipelines/mod.rs

//! The order-creation pipelines and their registration.

use crate::errors::{AppError, Result as AppResult};
use payhula_flow::{ContextData, FlowRegistry, PipelineResult};

pub mod common_steps;
pub mod contexts;

pub mod digital_order;
pub mod dispatcher;
pub mod generic_order;
pub mod physical_order;
pub mod service_order;

use contexts::{OrderConfirmation, OrderWorkflowData};

/// Registers every order pipeline with `registry`. Called once at start-up.
pub fn register_all_pipelines(registry: &FlowRegistry<AppError>) {
  tracing::info!("Registering order pipelines...");

  digital_order::register_digital_order_pipeline(registry);
  physical_order::register_physical_order_pipeline(registry);
  service_order::register_service_order_pipeline(registry);
  generic_order::register_generic_order_pipeline(registry);
  dispatcher::register_order_dispatch_pipeline(registry);

  tracing::info!("All order pipelines registered.");
}

/// Runs the pipeline registered for `T` and returns what the shopper needs to
/// go and pay.
pub async fn place_order<T: OrderWorkflowData>(flows: &FlowRegistry<AppError>, data: T) -> AppResult<OrderConfirmation> {
  let ctx_data = ContextData::new(data);
  match flows.run(ctx_data.clone()).await? {
    PipelineResult::Completed => {
      let confirmation = ctx_data.write().take_confirmation();
      confirmation.ok_or_else(|| AppError::Internal("Order workflow completed without a confirmation".to_string()))
    }
    PipelineResult::Stopped => Err(AppError::Internal(
      "Order workflow stopped before completion".to_string(),
    )),
  }
}
