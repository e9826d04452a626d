// payhula-storefront/src/web/handlers/orders.rs

use actix_web::{web, HttpResponse};
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::pipelines::contexts::{
  CreateOrderRequest, DigitalOrderData, DigitalOrderRequest, OrderConfirmation, OrderDispatchData, OrderWorkflowData,
  PhysicalOrderData, PhysicalOrderRequest, ServiceOrderData, ServiceOrderRequest,
};
use crate::pipelines::place_order;
use crate::state::AppState;

async fn run_workflow<T: OrderWorkflowData>(app_state: &AppState, data: T) -> Result<HttpResponse, AppError> {
  let confirmation: OrderConfirmation = place_order(&app_state.flows, data).await?;
  info!(
    order_id = %confirmation.order_id,
    order_number = %confirmation.order_number,
    amount_to_pay = confirmation.amount_to_pay,
    "Order placed."
  );
  Ok(HttpResponse::Created().json(confirmation))
}

#[instrument(
  name = "handler::create_order",
  skip(app_state, body),
  fields(product_id = %body.product_id, store_id = %body.store_id)
)]
pub async fn create_order_handler(
  app_state: web::Data<AppState>,
  body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, AppError> {
  let data = OrderDispatchData::new(app_state.services.clone(), body.into_inner());
  run_workflow(&app_state, data).await
}

#[instrument(
  name = "handler::create_digital_order",
  skip(app_state, body),
  fields(product_id = %body.product_id, digital_product_id = %body.digital_product_id)
)]
pub async fn create_digital_order_handler(
  app_state: web::Data<AppState>,
  body: web::Json<DigitalOrderRequest>,
) -> Result<HttpResponse, AppError> {
  let data = DigitalOrderData::new(app_state.services.clone(), body.into_inner());
  run_workflow(&app_state, data).await
}

#[instrument(
  name = "handler::create_physical_order",
  skip(app_state, body),
  fields(product_id = %body.product_id, quantity = body.quantity)
)]
pub async fn create_physical_order_handler(
  app_state: web::Data<AppState>,
  body: web::Json<PhysicalOrderRequest>,
) -> Result<HttpResponse, AppError> {
  let data = PhysicalOrderData::new(app_state.services.clone(), body.into_inner());
  run_workflow(&app_state, data).await
}

#[instrument(
  name = "handler::create_service_order",
  skip(app_state, body),
  fields(product_id = %body.product_id, booking_start = %body.booking_start)
)]
pub async fn create_service_order_handler(
  app_state: web::Data<AppState>,
  body: web::Json<ServiceOrderRequest>,
) -> Result<HttpResponse, AppError> {
  let data = ServiceOrderData::new(app_state.services.clone(), body.into_inner());
  run_workflow(&app_state, data).await
}
