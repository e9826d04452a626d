// payhula-storefront/src/store/memory.rs

//! `DataStore` kept in process memory. Used when no database is configured
//! and by the test suite, which seeds it and inspects it afterwards.

use super::{DataStore, GiftCardRedemption};
use crate::errors::{AppError, Result};
use crate::models::{
  Booking, BookingStatus, Customer, DigitalProduct, InventoryRecord, License, LicenseStatus, Order, OrderItem,
  OrderStatus, PhysicalProduct, Product, ProductVariant, SecuredPayment, ServiceProduct, StaffMember,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
  products: HashMap<Uuid, Product>,
  digital_products: HashMap<Uuid, DigitalProduct>,
  physical_products: HashMap<Uuid, PhysicalProduct>,
  service_products: HashMap<Uuid, ServiceProduct>,
  variants: HashMap<Uuid, ProductVariant>,
  inventory: Vec<InventoryRecord>,
  staff: Vec<StaffMember>,
  bookings: Vec<Booking>,
  customers: Vec<Customer>,
  licenses: Vec<License>,
  orders: Vec<Order>,
  order_items: Vec<OrderItem>,
  secured_payments: Vec<SecuredPayment>,
  gift_card_balances: HashMap<Uuid, i64>,
  redemptions: Vec<(Uuid, Uuid, i64)>,
  invoices: Vec<(Uuid, Uuid)>,
  order_sequence: u64,
  writes: usize,
}

pub struct MemoryStore {
  tables: Mutex<Tables>,
  order_numbers_enabled: bool,
}

impl Default for MemoryStore {
  fn default() -> Self {
    Self::new()
  }
}

impl MemoryStore {
  pub fn new() -> Self {
    Self {
      tables: Mutex::new(Tables::default()),
      order_numbers_enabled: true,
    }
  }

  /// A store whose `generate_order_number` never returns a number.
  pub fn without_order_numbers() -> Self {
    Self {
      order_numbers_enabled: false,
      ..Self::new()
    }
  }

  // --- seeding ---

  pub fn add_product(&self, product: Product) {
    self.tables.lock().products.insert(product.id, product);
  }

  pub fn add_digital_product(&self, digital: DigitalProduct) {
    self.tables.lock().digital_products.insert(digital.id, digital);
  }

  pub fn add_physical_product(&self, physical: PhysicalProduct) {
    self.tables.lock().physical_products.insert(physical.id, physical);
  }

  pub fn add_service_product(&self, service: ServiceProduct) {
    self.tables.lock().service_products.insert(service.id, service);
  }

  pub fn add_variant(&self, variant: ProductVariant) {
    self.tables.lock().variants.insert(variant.id, variant);
  }

  pub fn add_inventory(&self, record: InventoryRecord) {
    self.tables.lock().inventory.push(record);
  }

  pub fn add_staff(&self, staff: StaffMember) {
    self.tables.lock().staff.push(staff);
  }

  pub fn add_booking(&self, booking: Booking) {
    self.tables.lock().bookings.push(booking);
  }

  pub fn add_customer(&self, customer: Customer) {
    self.tables.lock().customers.push(customer);
  }

  pub fn add_gift_card(&self, gift_card_id: Uuid, balance: i64) {
    self.tables.lock().gift_card_balances.insert(gift_card_id, balance);
  }

  // --- inspection ---

  /// Number of inserts and updates performed through the `DataStore` API.
  pub fn write_count(&self) -> usize {
    self.tables.lock().writes
  }

  pub fn inventory(&self, inventory_id: Uuid) -> Option<InventoryRecord> {
    self.tables.lock().inventory.iter().find(|r| r.id == inventory_id).cloned()
  }

  pub fn orders(&self) -> Vec<Order> {
    self.tables.lock().orders.clone()
  }

  pub fn order_items(&self) -> Vec<OrderItem> {
    self.tables.lock().order_items.clone()
  }

  pub fn licenses(&self) -> Vec<License> {
    self.tables.lock().licenses.clone()
  }

  pub fn bookings(&self) -> Vec<Booking> {
    self.tables.lock().bookings.clone()
  }

  pub fn customers(&self) -> Vec<Customer> {
    self.tables.lock().customers.clone()
  }

  pub fn secured_payments(&self) -> Vec<SecuredPayment> {
    self.tables.lock().secured_payments.clone()
  }

  /// `(gift_card_id, order_id, amount)` per successful redemption.
  pub fn redemptions(&self) -> Vec<(Uuid, Uuid, i64)> {
    self.tables.lock().redemptions.clone()
  }

  /// `(invoice_id, order_id)` per created invoice.
  pub fn invoices(&self) -> Vec<(Uuid, Uuid)> {
    self.tables.lock().invoices.clone()
  }
}

fn missing(table: &str, id: Uuid) -> AppError {
  AppError::Internal(format!("{} row {} does not exist", table, id))
}

#[async_trait]
impl DataStore for MemoryStore {
  async fn find_product(&self, id: Uuid) -> Result<Option<Product>> {
    Ok(self.tables.lock().products.get(&id).cloned())
  }

  async fn find_digital_product(&self, id: Uuid) -> Result<Option<DigitalProduct>> {
    Ok(self.tables.lock().digital_products.get(&id).cloned())
  }

  async fn find_digital_product_by_product(&self, product_id: Uuid) -> Result<Option<DigitalProduct>> {
    let tables = self.tables.lock();
    Ok(tables.digital_products.values().find(|d| d.product_id == product_id).cloned())
  }

  async fn find_physical_product(&self, id: Uuid) -> Result<Option<PhysicalProduct>> {
    Ok(self.tables.lock().physical_products.get(&id).cloned())
  }

  async fn find_physical_product_by_product(&self, product_id: Uuid) -> Result<Option<PhysicalProduct>> {
    let tables = self.tables.lock();
    Ok(tables.physical_products.values().find(|p| p.product_id == product_id).cloned())
  }

  async fn find_service_product(&self, id: Uuid) -> Result<Option<ServiceProduct>> {
    Ok(self.tables.lock().service_products.get(&id).cloned())
  }

  async fn find_service_product_by_product(&self, product_id: Uuid) -> Result<Option<ServiceProduct>> {
    let tables = self.tables.lock();
    Ok(tables.service_products.values().find(|s| s.product_id == product_id).cloned())
  }

  async fn find_variant(&self, id: Uuid) -> Result<Option<ProductVariant>> {
    Ok(self.tables.lock().variants.get(&id).cloned())
  }

  async fn list_tracked_inventory(&self, physical_product_id: Uuid) -> Result<Vec<InventoryRecord>> {
    let mut rows: Vec<InventoryRecord> = self
      .tables
      .lock()
      .inventory
      .iter()
      .filter(|r| r.physical_product_id == physical_product_id && r.track_inventory)
      .cloned()
      .collect();
    rows.sort_by(|a, b| b.quantity_available.cmp(&a.quantity_available));
    Ok(rows)
  }

  async fn reserve_inventory(&self, inventory_id: Uuid, quantity: i32) -> Result<Option<InventoryRecord>> {
    let mut tables = self.tables.lock();
    let record = tables
      .inventory
      .iter_mut()
      .find(|r| r.id == inventory_id)
      .ok_or_else(|| missing("physical_product_inventory", inventory_id))?;
    if record.unreserved() < quantity {
      return Ok(None);
    }
    record.quantity_reserved += quantity;
    let updated = record.clone();
    tables.writes += 1;
    Ok(Some(updated))
  }

  async fn release_inventory(&self, inventory_id: Uuid, quantity: i32) -> Result<()> {
    let mut tables = self.tables.lock();
    let record = tables
      .inventory
      .iter_mut()
      .find(|r| r.id == inventory_id)
      .ok_or_else(|| missing("physical_product_inventory", inventory_id))?;
    record.quantity_reserved = (record.quantity_reserved - quantity).max(0);
    tables.writes += 1;
    Ok(())
  }

  async fn find_active_staff(&self, service_product_id: Uuid, staff_id: Uuid) -> Result<Option<StaffMember>> {
    let tables = self.tables.lock();
    Ok(
      tables
        .staff
        .iter()
        .find(|s| s.id == staff_id && s.service_product_id == service_product_id && s.is_active)
        .cloned(),
    )
  }

  async fn list_overlapping_bookings(
    &self,
    service_id: Uuid,
    staff_id: Option<Uuid>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> Result<Vec<Booking>> {
    let tables = self.tables.lock();
    Ok(
      tables
        .bookings
        .iter()
        .filter(|b| b.service_id == service_id)
        .filter(|b| staff_id.is_none() || b.staff_id == staff_id)
        .filter(|b| b.status.holds_slot() && b.overlaps(start, end))
        .cloned()
        .collect(),
    )
  }

  async fn insert_booking(&self, booking: &Booking) -> Result<Booking> {
    let mut tables = self.tables.lock();
    tables.bookings.push(booking.clone());
    tables.writes += 1;
    Ok(booking.clone())
  }

  async fn update_booking_status(&self, booking_id: Uuid, status: BookingStatus) -> Result<()> {
    let mut tables = self.tables.lock();
    let booking = tables
      .bookings
      .iter_mut()
      .find(|b| b.id == booking_id)
      .ok_or_else(|| missing("service_bookings", booking_id))?;
    booking.status = status;
    tables.writes += 1;
    Ok(())
  }

  async fn find_customer(&self, store_id: Uuid, email: &str) -> Result<Option<Customer>> {
    let tables = self.tables.lock();
    Ok(
      tables
        .customers
        .iter()
        .find(|c| c.store_id == store_id && c.email.eq_ignore_ascii_case(email))
        .cloned(),
    )
  }

  async fn insert_customer(&self, customer: &Customer) -> Result<Customer> {
    let mut tables = self.tables.lock();
    let duplicate = tables
      .customers
      .iter()
      .any(|c| c.store_id == customer.store_id && c.email.eq_ignore_ascii_case(&customer.email));
    if duplicate {
      return Err(AppError::Internal(format!(
        "customer {} already exists in store {}",
        customer.email, customer.store_id
      )));
    }
    tables.customers.push(customer.clone());
    tables.writes += 1;
    Ok(customer.clone())
  }

  async fn update_customer(&self, customer: &Customer) -> Result<Customer> {
    let mut tables = self.tables.lock();
    let row = tables
      .customers
      .iter_mut()
      .find(|c| c.id == customer.id)
      .ok_or_else(|| missing("customers", customer.id))?;
    row.name = customer.name.clone();
    row.phone = customer.phone.clone();
    row.address = customer.address.clone();
    let updated = row.clone();
    tables.writes += 1;
    Ok(updated)
  }

  async fn insert_license(&self, license: &License) -> Result<License> {
    let mut tables = self.tables.lock();
    tables.licenses.push(license.clone());
    tables.writes += 1;
    Ok(license.clone())
  }

  async fn update_license_status(&self, license_id: Uuid, status: LicenseStatus) -> Result<()> {
    let mut tables = self.tables.lock();
    let license = tables
      .licenses
      .iter_mut()
      .find(|l| l.id == license_id)
      .ok_or_else(|| missing("digital_licenses", license_id))?;
    license.status = status;
    tables.writes += 1;
    Ok(())
  }

  async fn generate_order_number(&self) -> Result<Option<String>> {
    if !self.order_numbers_enabled {
      return Ok(None);
    }
    let mut tables = self.tables.lock();
    tables.order_sequence += 1;
    Ok(Some(format!(
      "ORD-{}-{:06}",
      Utc::now().format("%Y%m%d"),
      tables.order_sequence
    )))
  }

  async fn insert_order(&self, order: &Order) -> Result<Order> {
    let mut tables = self.tables.lock();
    if tables.orders.iter().any(|o| o.order_number == order.order_number) {
      return Err(AppError::Internal(format!("duplicate order number {}", order.order_number)));
    }
    tables.orders.push(order.clone());
    tables.writes += 1;
    Ok(order.clone())
  }

  async fn update_order_status(&self, order_id: Uuid, status: OrderStatus) -> Result<()> {
    let mut tables = self.tables.lock();
    let order = tables
      .orders
      .iter_mut()
      .find(|o| o.id == order_id)
      .ok_or_else(|| missing("orders", order_id))?;
    order.status = status;
    tables.writes += 1;
    Ok(())
  }

  async fn insert_order_item(&self, item: &OrderItem) -> Result<OrderItem> {
    let mut tables = self.tables.lock();
    if !tables.orders.iter().any(|o| o.id == item.order_id) {
      return Err(missing("orders", item.order_id));
    }
    tables.order_items.push(item.clone());
    tables.writes += 1;
    Ok(item.clone())
  }

  async fn insert_secured_payment(&self, payment: &SecuredPayment) -> Result<SecuredPayment> {
    let mut tables = self.tables.lock();
    tables.secured_payments.push(payment.clone());
    tables.writes += 1;
    Ok(payment.clone())
  }

  async fn redeem_gift_card(&self, gift_card_id: Uuid, order_id: Uuid, amount: i64) -> Result<GiftCardRedemption> {
    let mut tables = self.tables.lock();
    let Some(balance) = tables.gift_card_balances.get_mut(&gift_card_id) else {
      return Ok(GiftCardRedemption {
        success: false,
        message: Some("Carte cadeau introuvable".to_string()),
      });
    };
    if *balance < amount {
      return Ok(GiftCardRedemption {
        success: false,
        message: Some("Solde de la carte cadeau insuffisant".to_string()),
      });
    }
    *balance -= amount;
    tables.redemptions.push((gift_card_id, order_id, amount));
    tables.writes += 1;
    Ok(GiftCardRedemption {
      success: true,
      message: None,
    })
  }

  async fn create_invoice_from_order(&self, order_id: Uuid) -> Result<Option<Uuid>> {
    let mut tables = self.tables.lock();
    if !tables.orders.iter().any(|o| o.id == order_id) {
      return Err(missing("orders", order_id));
    }
    let invoice_id = Uuid::new_v4();
    tables.invoices.push((invoice_id, order_id));
    tables.writes += 1;
    Ok(Some(invoice_id))
  }
}
