// payhula-storefront/src/models/license.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "license_type_enum", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LicenseType {
  #[default]
  Single,
  Multi,
  Unlimited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "license_status_enum", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LicenseStatus {
  /// Issued at checkout; activated once payment is confirmed.
  Pending,
  Active,
  Suspended,
  Expired,
  Revoked,
}

/// `digital_licenses` row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct License {
  pub id: Uuid,
  pub digital_product_id: Uuid,
  pub user_id: Uuid,
  pub license_key: String,
  pub license_type: LicenseType,
  /// -1 means unlimited.
  pub max_activations: i32,
  pub current_activations: i32,
  pub status: LicenseStatus,
  pub expires_at: Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
}
