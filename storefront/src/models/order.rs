// payhula-storefront/src/models/order.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

use super::product::PaymentType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status_enum", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
  Pending,
  Processing,
  Completed,
  Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_status_enum", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
  Pending,
  Paid,
  Failed,
  Refunded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "delivery_status_enum", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
  Pending,
  Shipped,
  Delivered,
  NotApplicable,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Order {
  pub id: Uuid,
  pub store_id: Uuid,
  pub customer_id: Uuid,
  pub order_number: String,
  pub total_amount: i64,
  pub currency: String,
  pub status: OrderStatus,
  pub payment_status: PaymentStatus,
  pub payment_type: PaymentType,
  pub percentage_paid: f64,
  pub remaining_amount: i64,
  pub delivery_status: DeliveryStatus,
  pub affiliate_tracking_cookie: Option<String>,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "secured_payment_status_enum", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SecuredPaymentStatus {
  Held,
  Released,
  Refunded,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReleaseConditions {
  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub requires_delivery_confirmation: bool,
  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub requires_service_completion: bool,
  pub auto_release_days: i64,
}

/// Escrow record for `delivery_secured` orders.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SecuredPayment {
  pub id: Uuid,
  pub order_id: Uuid,
  pub total_amount: i64,
  pub held_amount: i64,
  pub status: SecuredPaymentStatus,
  pub release_conditions: Json<ReleaseConditions>,
  pub created_at: DateTime<Utc>,
}
