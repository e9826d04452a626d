// payhula-storefront/src/models/customer.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingAddress {
  pub full_name: Option<String>,
  pub address_line1: String,
  pub address_line2: Option<String>,
  pub city: String,
  pub state: Option<String>,
  pub postal_code: Option<String>,
  pub country: String,
  pub phone: Option<String>,
}

/// Shopper details supplied with an order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerInfo {
  pub email: String,
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub phone: Option<String>,
}

/// `customers` row, unique per (store_id, email).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Customer {
  pub id: Uuid,
  pub store_id: Uuid,
  pub email: String,
  pub name: Option<String>,
  pub phone: Option<String>,
  pub address: Option<Json<ShippingAddress>>,
  pub created_at: DateTime<Utc>,
}
