// payhula-storefront/src/availability.rs

//! Read-only availability checks shown before checkout.

use crate::errors::Result;
use crate::models::Booking;
use crate::store::DataStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct StockAvailability {
  pub available: bool,
  /// Unreserved units summed over tracked locations.
  pub total_available: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotAvailability {
  pub available: bool,
  pub conflicts: Vec<Booking>,
}

#[instrument(skip(store), err(Display))]
pub async fn check_stock_availability(
  store: &dyn DataStore,
  physical_product_id: Uuid,
  quantity: i32,
) -> Result<StockAvailability> {
  let records = store.list_tracked_inventory(physical_product_id).await?;
  let total_available: i64 = records.iter().map(|r| i64::from(r.unreserved())).sum();
  Ok(StockAvailability {
    available: total_available >= i64::from(quantity),
    total_available,
  })
}

#[instrument(skip(store), err(Display))]
pub async fn check_time_slot_availability(
  store: &dyn DataStore,
  service_id: Uuid,
  staff_id: Option<Uuid>,
  start: DateTime<Utc>,
  end: DateTime<Utc>,
) -> Result<SlotAvailability> {
  let conflicts = store.list_overlapping_bookings(service_id, staff_id, start, end).await?;
  Ok(SlotAvailability {
    available: conflicts.is_empty(),
    conflicts,
  })
}
