// payhula-storefront/src/store/mod.rs

//! The storefront's data store, as seen by the order workflows.
//!
//! Every read-then-write that must not race (stock reservation, slot
//! conflicts) is a single store operation so the backend can evaluate it
//! atomically.

pub mod memory;
pub mod postgres;

use crate::errors::Result;
use crate::models::{
  Booking, BookingStatus, Customer, DigitalProduct, InventoryRecord, License, LicenseStatus, Order, OrderItem,
  OrderStatus, PhysicalProduct, Product, ProductVariant, SecuredPayment, ServiceProduct, StaffMember,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Result of the `redeem_gift_card` procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GiftCardRedemption {
  pub success: bool,
  pub message: Option<String>,
}

#[async_trait]
pub trait DataStore: Send + Sync {
  async fn find_product(&self, id: Uuid) -> Result<Option<Product>>;

  async fn find_digital_product(&self, id: Uuid) -> Result<Option<DigitalProduct>>;
  async fn find_digital_product_by_product(&self, product_id: Uuid) -> Result<Option<DigitalProduct>>;
  async fn find_physical_product(&self, id: Uuid) -> Result<Option<PhysicalProduct>>;
  async fn find_physical_product_by_product(&self, product_id: Uuid) -> Result<Option<PhysicalProduct>>;
  async fn find_service_product(&self, id: Uuid) -> Result<Option<ServiceProduct>>;
  async fn find_service_product_by_product(&self, product_id: Uuid) -> Result<Option<ServiceProduct>>;

  async fn find_variant(&self, id: Uuid) -> Result<Option<ProductVariant>>;

  /// Inventory rows with `track_inventory` set, most available first.
  async fn list_tracked_inventory(&self, physical_product_id: Uuid) -> Result<Vec<InventoryRecord>>;

  /// Adds `quantity` to `quantity_reserved` only while
  /// `quantity_available - quantity_reserved >= quantity`. Returns the updated
  /// row, or `None` when the guard rejected the reservation.
  async fn reserve_inventory(&self, inventory_id: Uuid, quantity: i32) -> Result<Option<InventoryRecord>>;

  /// Takes `quantity` back off `quantity_reserved`, never going below zero.
  async fn release_inventory(&self, inventory_id: Uuid, quantity: i32) -> Result<()>;

  async fn find_active_staff(&self, service_product_id: Uuid, staff_id: Uuid) -> Result<Option<StaffMember>>;

  /// Bookings of a service (optionally of one staff member) that hold the
  /// slot and overlap `[start, end)`.
  async fn list_overlapping_bookings(
    &self,
    service_id: Uuid,
    staff_id: Option<Uuid>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> Result<Vec<Booking>>;
  async fn insert_booking(&self, booking: &Booking) -> Result<Booking>;
  async fn update_booking_status(&self, booking_id: Uuid, status: BookingStatus) -> Result<()>;

  async fn find_customer(&self, store_id: Uuid, email: &str) -> Result<Option<Customer>>;
  async fn insert_customer(&self, customer: &Customer) -> Result<Customer>;
  /// Overwrites name, phone and address.
  async fn update_customer(&self, customer: &Customer) -> Result<Customer>;

  async fn insert_license(&self, license: &License) -> Result<License>;
  async fn update_license_status(&self, license_id: Uuid, status: LicenseStatus) -> Result<()>;

  /// `None` when the backend produced no number.
  async fn generate_order_number(&self) -> Result<Option<String>>;
  async fn insert_order(&self, order: &Order) -> Result<Order>;
  async fn update_order_status(&self, order_id: Uuid, status: OrderStatus) -> Result<()>;
  async fn insert_order_item(&self, item: &OrderItem) -> Result<OrderItem>;
  async fn insert_secured_payment(&self, payment: &SecuredPayment) -> Result<SecuredPayment>;

  async fn redeem_gift_card(&self, gift_card_id: Uuid, order_id: Uuid, amount: i64) -> Result<GiftCardRedemption>;
  /// Returns the invoice id, if one was created.
  async fn create_invoice_from_order(&self, order_id: Uuid) -> Result<Option<Uuid>>;
}
