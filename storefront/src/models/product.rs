// payhula-storefront/src/models/product.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

use super::license::LicenseType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "product_type_enum", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
  Digital,
  Physical,
  Service,
  Course,
  Generic,
}

impl ProductType {
  pub fn as_str(&self) -> &'static str {
    match self {
      ProductType::Digital => "digital",
      ProductType::Physical => "physical",
      ProductType::Service => "service",
      ProductType::Course => "course",
      ProductType::Generic => "generic",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_type_enum", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
  #[default]
  Full,
  /// Deposit now, the rest later.
  Percentage,
  /// Charged in full but held until delivery or service completion.
  DeliverySecured,
}

/// `products.payment_options` JSON column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentOptions {
  #[serde(default)]
  pub payment_type: PaymentType,
  #[serde(default)]
  pub percentage_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
  pub id: Uuid,
  pub store_id: Uuid,
  pub name: String,
  pub price: i64,
  pub promotional_price: Option<i64>,
  pub currency: Option<String>,
  pub product_type: ProductType,
  pub payment_options: Option<Json<PaymentOptions>>,
  pub created_at: DateTime<Utc>,
}

impl Product {
  /// Promotional price when it is set, positive and below the list price.
  pub fn base_price(&self) -> i64 {
    match self.promotional_price {
      Some(promo) if promo > 0 && promo < self.price => promo,
      _ => self.price,
    }
  }

  pub fn payment_options(&self) -> PaymentOptions {
    self
      .payment_options
      .as_ref()
      .map(|json| json.0.clone())
      .unwrap_or_default()
  }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DigitalProduct {
  pub id: Uuid,
  pub product_id: Uuid,
  pub license_type: LicenseType,
  pub max_activations: Option<i32>,
  pub license_expiry_days: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PhysicalProduct {
  pub id: Uuid,
  pub product_id: Uuid,
  pub sku: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProductVariant {
  pub id: Uuid,
  pub physical_product_id: Uuid,
  pub name: String,
  /// Added to the base price; may be negative.
  pub price_adjustment: i64,
  pub is_available: bool,
}

/// One stock location of a physical product (`physical_product_inventory`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct InventoryRecord {
  pub id: Uuid,
  pub physical_product_id: Uuid,
  pub quantity_available: i32,
  pub quantity_reserved: i32,
  pub track_inventory: bool,
  pub location: Option<String>,
}

impl InventoryRecord {
  pub fn unreserved(&self) -> i32 {
    self.quantity_available - self.quantity_reserved
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "service_pricing_type_enum", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PricingType {
  Flat,
  PerParticipant,
  PerHour,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ServiceProduct {
  pub id: Uuid,
  pub product_id: Uuid,
  pub duration_minutes: i32,
  pub max_participants: i32,
  pub pricing_type: PricingType,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StaffMember {
  pub id: Uuid,
  pub service_product_id: Uuid,
  pub name: String,
  pub is_active: bool,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn product(price: i64, promotional_price: Option<i64>) -> Product {
    Product {
      id: Uuid::new_v4(),
      store_id: Uuid::new_v4(),
      name: "Ebook".to_string(),
      price,
      promotional_price,
      currency: None,
      product_type: ProductType::Digital,
      payment_options: None,
      created_at: Utc::now(),
    }
  }

  #[test]
  fn base_price_prefers_a_real_discount() {
    assert_eq!(product(1000, Some(800)).base_price(), 800);
    assert_eq!(product(1000, Some(1200)).base_price(), 1000);
    assert_eq!(product(1000, Some(0)).base_price(), 1000);
    assert_eq!(product(1000, None).base_price(), 1000);
  }

  #[test]
  fn payment_options_default_to_full() {
    assert_eq!(product(10, None).payment_options().payment_type, PaymentType::Full);
    let parsed: PaymentOptions = serde_json::from_str(r#"{"payment_type":"percentage","percentage_rate":40}"#).unwrap();
    assert_eq!(parsed.payment_type, PaymentType::Percentage);
    assert_eq!(parsed.percentage_rate, Some(40.0));
  }
}
