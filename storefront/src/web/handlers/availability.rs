// payhula-storefront/src/web/handlers/availability.rs

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use crate::availability::{check_stock_availability, check_time_slot_availability};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StockQuery {
  #[serde(default)]
  pub quantity: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct SlotQuery {
  pub start: DateTime<Utc>,
  pub end: DateTime<Utc>,
  #[serde(default)]
  pub staff_id: Option<Uuid>,
}

#[instrument(name = "handler::stock", skip(app_state, path, query), fields(physical_product_id = %path.as_ref()))]
pub async fn stock_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  query: web::Query<StockQuery>,
) -> Result<HttpResponse, AppError> {
  let quantity = query.quantity.unwrap_or(1);
  let stock = check_stock_availability(app_state.services.store.as_ref(), path.into_inner(), quantity).await?;
  Ok(HttpResponse::Ok().json(stock))
}

#[instrument(name = "handler::slot_availability", skip(app_state, path, query), fields(service_id = %path.as_ref()))]
pub async fn slot_availability_handler(
  app_state: web::Data<AppState>,
  path: web::Path<Uuid>,
  query: web::Query<SlotQuery>,
) -> Result<HttpResponse, AppError> {
  let SlotQuery { start, end, staff_id } = query.into_inner();
  if end <= start {
    return Err(AppError::Validation("La fin du créneau doit suivre son début".to_string()));
  }
  let service_id = path.into_inner();
  let slot = check_time_slot_availability(app_state.services.store.as_ref(), service_id, staff_id, start, end).await?;
  Ok(HttpResponse::Ok().json(slot))
}
