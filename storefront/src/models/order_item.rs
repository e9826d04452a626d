// payhula-storefront/src/models/order_item.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use super::product::ProductType;

/// One purchased line. Exactly one group of type-specific keys is set,
/// matching `product_type`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OrderItem {
  pub id: Uuid,
  pub order_id: Uuid,
  pub product_id: Uuid,
  pub product_type: ProductType,
  pub digital_product_id: Option<Uuid>,
  pub license_id: Option<Uuid>,
  pub physical_product_id: Option<Uuid>,
  pub variant_id: Option<Uuid>,
  pub service_product_id: Option<Uuid>,
  pub booking_id: Option<Uuid>,
  pub quantity: i32,
  pub unit_price: i64,
  pub total_price: i64,
  pub item_metadata: Json<serde_json::Value>,
  pub created_at: DateTime<Utc>,
}

impl OrderItem {
  /// A line with no type-specific keys; callers fill in the ones they own.
  /// `total_price` is the priced line total, already checked by the caller.
  pub fn line(
    order_id: Uuid,
    product_id: Uuid,
    product_type: ProductType,
    quantity: i32,
    unit_price: i64,
    total_price: i64,
  ) -> Self {
    Self {
      id: Uuid::new_v4(),
      order_id,
      product_id,
      product_type,
      digital_product_id: None,
      license_id: None,
      physical_product_id: None,
      variant_id: None,
      service_product_id: None,
      booking_id: None,
      quantity,
      unit_price,
      total_price,
      item_metadata: Json(serde_json::Value::Object(Default::default())),
      created_at: Utc::now(),
    }
  }
}
