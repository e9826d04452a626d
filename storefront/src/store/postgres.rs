// payhula-storefront/src/store/postgres.rs

//! `DataStore` over Postgres (schema in `migrations/`).

use super::{DataStore, GiftCardRedemption};
use crate::errors::Result;
use crate::models::{
  Booking, BookingStatus, Customer, DigitalProduct, InventoryRecord, License, LicenseStatus, Order, OrderItem,
  OrderStatus, PhysicalProduct, Product, ProductVariant, SecuredPayment, ServiceProduct, StaffMember,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::instrument;
use uuid::Uuid;

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
    let pool = PgPoolOptions::new()
      .max_connections(max_connections)
      .connect(database_url)
      .await?;
    Ok(Self::new(pool))
  }
}

#[derive(FromRow)]
struct RedemptionRow {
  success: bool,
  message: Option<String>,
}

const INVENTORY_COLUMNS: &str =
  "id, physical_product_id, quantity_available, quantity_reserved, track_inventory, location";
const BOOKING_COLUMNS: &str = "id, service_id, customer_id, staff_id, start_time, end_time, status, \
   number_of_participants, customer_notes, created_at";

#[async_trait]
impl DataStore for PgStore {
  async fn find_product(&self, id: Uuid) -> Result<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(
      "SELECT id, store_id, name, price, promotional_price, currency, product_type, payment_options, created_at \
       FROM products WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(product)
  }

  async fn find_digital_product(&self, id: Uuid) -> Result<Option<DigitalProduct>> {
    Ok(
      sqlx::query_as::<_, DigitalProduct>(
        "SELECT id, product_id, license_type, max_activations, license_expiry_days FROM digital_products WHERE id = $1",
      )
      .bind(id)
      .fetch_optional(&self.pool)
      .await?,
    )
  }

  async fn find_digital_product_by_product(&self, product_id: Uuid) -> Result<Option<DigitalProduct>> {
    Ok(
      sqlx::query_as::<_, DigitalProduct>(
        "SELECT id, product_id, license_type, max_activations, license_expiry_days \
         FROM digital_products WHERE product_id = $1 LIMIT 1",
      )
      .bind(product_id)
      .fetch_optional(&self.pool)
      .await?,
    )
  }

  async fn find_physical_product(&self, id: Uuid) -> Result<Option<PhysicalProduct>> {
    Ok(
      sqlx::query_as::<_, PhysicalProduct>("SELECT id, product_id, sku FROM physical_products WHERE id = $1")
        .bind(id)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  async fn find_physical_product_by_product(&self, product_id: Uuid) -> Result<Option<PhysicalProduct>> {
    Ok(
      sqlx::query_as::<_, PhysicalProduct>(
        "SELECT id, product_id, sku FROM physical_products WHERE product_id = $1 LIMIT 1",
      )
      .bind(product_id)
      .fetch_optional(&self.pool)
      .await?,
    )
  }

  async fn find_service_product(&self, id: Uuid) -> Result<Option<ServiceProduct>> {
    Ok(
      sqlx::query_as::<_, ServiceProduct>(
        "SELECT id, product_id, duration_minutes, max_participants, pricing_type FROM service_products WHERE id = $1",
      )
      .bind(id)
      .fetch_optional(&self.pool)
      .await?,
    )
  }

  async fn find_service_product_by_product(&self, product_id: Uuid) -> Result<Option<ServiceProduct>> {
    Ok(
      sqlx::query_as::<_, ServiceProduct>(
        "SELECT id, product_id, duration_minutes, max_participants, pricing_type \
         FROM service_products WHERE product_id = $1 LIMIT 1",
      )
      .bind(product_id)
      .fetch_optional(&self.pool)
      .await?,
    )
  }

  async fn find_variant(&self, id: Uuid) -> Result<Option<ProductVariant>> {
    Ok(
      sqlx::query_as::<_, ProductVariant>(
        "SELECT id, physical_product_id, name, price_adjustment, is_available \
         FROM physical_product_variants WHERE id = $1",
      )
      .bind(id)
      .fetch_optional(&self.pool)
      .await?,
    )
  }

  async fn list_tracked_inventory(&self, physical_product_id: Uuid) -> Result<Vec<InventoryRecord>> {
    let sql = format!(
      "SELECT {} FROM physical_product_inventory \
       WHERE physical_product_id = $1 AND track_inventory \
       ORDER BY quantity_available DESC",
      INVENTORY_COLUMNS
    );
    Ok(
      sqlx::query_as::<_, InventoryRecord>(&sql)
        .bind(physical_product_id)
        .fetch_all(&self.pool)
        .await?,
    )
  }

  #[instrument(name = "PgStore::reserve_inventory", skip(self), err(Display))]
  async fn reserve_inventory(&self, inventory_id: Uuid, quantity: i32) -> Result<Option<InventoryRecord>> {
    let sql = format!(
      "UPDATE physical_product_inventory \
       SET quantity_reserved = quantity_reserved + $2 \
       WHERE id = $1 AND quantity_available - quantity_reserved >= $2 \
       RETURNING {}",
      INVENTORY_COLUMNS
    );
    Ok(
      sqlx::query_as::<_, InventoryRecord>(&sql)
        .bind(inventory_id)
        .bind(quantity)
        .fetch_optional(&self.pool)
        .await?,
    )
  }

  #[instrument(name = "PgStore::release_inventory", skip(self), err(Display))]
  async fn release_inventory(&self, inventory_id: Uuid, quantity: i32) -> Result<()> {
    sqlx::query(
      "UPDATE physical_product_inventory \
       SET quantity_reserved = GREATEST(quantity_reserved - $2, 0) WHERE id = $1",
    )
    .bind(inventory_id)
    .bind(quantity)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn find_active_staff(&self, service_product_id: Uuid, staff_id: Uuid) -> Result<Option<StaffMember>> {
    Ok(
      sqlx::query_as::<_, StaffMember>(
        "SELECT id, service_product_id, name, is_active FROM service_staff_members \
         WHERE id = $1 AND service_product_id = $2 AND is_active",
      )
      .bind(staff_id)
      .bind(service_product_id)
      .fetch_optional(&self.pool)
      .await?,
    )
  }

  async fn list_overlapping_bookings(
    &self,
    service_id: Uuid,
    staff_id: Option<Uuid>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> Result<Vec<Booking>> {
    let sql = format!(
      "SELECT {} FROM service_bookings \
       WHERE service_id = $1 \
         AND ($2::uuid IS NULL OR staff_id = $2) \
         AND status IN ('pending', 'confirmed', 'in_progress') \
         AND start_time < $4 AND end_time > $3 \
       ORDER BY start_time",
      BOOKING_COLUMNS
    );
    Ok(
      sqlx::query_as::<_, Booking>(&sql)
        .bind(service_id)
        .bind(staff_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?,
    )
  }

  async fn insert_booking(&self, booking: &Booking) -> Result<Booking> {
    let sql = format!(
      "INSERT INTO service_bookings ({cols}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {cols}",
      cols = BOOKING_COLUMNS
    );
    Ok(
      sqlx::query_as::<_, Booking>(&sql)
        .bind(booking.id)
        .bind(booking.service_id)
        .bind(booking.customer_id)
        .bind(booking.staff_id)
        .bind(booking.start_time)
        .bind(booking.end_time)
        .bind(booking.status)
        .bind(booking.number_of_participants)
        .bind(&booking.customer_notes)
        .bind(booking.created_at)
        .fetch_one(&self.pool)
        .await?,
    )
  }

  async fn update_booking_status(&self, booking_id: Uuid, status: BookingStatus) -> Result<()> {
    sqlx::query("UPDATE service_bookings SET status = $2 WHERE id = $1")
      .bind(booking_id)
      .bind(status)
      .execute(&self.pool)
      .await?;
    Ok(())
  }

  async fn find_customer(&self, store_id: Uuid, email: &str) -> Result<Option<Customer>> {
    Ok(
      sqlx::query_as::<_, Customer>(
        "SELECT id, store_id, email, name, phone, address, created_at FROM customers \
         WHERE store_id = $1 AND lower(email) = lower($2)",
      )
      .bind(store_id)
      .bind(email)
      .fetch_optional(&self.pool)
      .await?,
    )
  }

  async fn insert_customer(&self, customer: &Customer) -> Result<Customer> {
    Ok(
      sqlx::query_as::<_, Customer>(
        "INSERT INTO customers (id, store_id, email, name, phone, address, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING id, store_id, email, name, phone, address, created_at",
      )
      .bind(customer.id)
      .bind(customer.store_id)
      .bind(&customer.email)
      .bind(&customer.name)
      .bind(&customer.phone)
      .bind(&customer.address)
      .bind(customer.created_at)
      .fetch_one(&self.pool)
      .await?,
    )
  }

  async fn update_customer(&self, customer: &Customer) -> Result<Customer> {
    Ok(
      sqlx::query_as::<_, Customer>(
        "UPDATE customers SET name = $2, phone = $3, address = $4 WHERE id = $1 \
         RETURNING id, store_id, email, name, phone, address, created_at",
      )
      .bind(customer.id)
      .bind(&customer.name)
      .bind(&customer.phone)
      .bind(&customer.address)
      .fetch_one(&self.pool)
      .await?,
    )
  }

  async fn insert_license(&self, license: &License) -> Result<License> {
    Ok(
      sqlx::query_as::<_, License>(
        "INSERT INTO digital_licenses \
         (id, digital_product_id, user_id, license_key, license_type, max_activations, current_activations, \
          status, expires_at, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         RETURNING id, digital_product_id, user_id, license_key, license_type, max_activations, \
          current_activations, status, expires_at, created_at",
      )
      .bind(license.id)
      .bind(license.digital_product_id)
      .bind(license.user_id)
      .bind(&license.license_key)
      .bind(license.license_type)
      .bind(license.max_activations)
      .bind(license.current_activations)
      .bind(license.status)
      .bind(license.expires_at)
      .bind(license.created_at)
      .fetch_one(&self.pool)
      .await?,
    )
  }

  async fn update_license_status(&self, license_id: Uuid, status: LicenseStatus) -> Result<()> {
    sqlx::query("UPDATE digital_licenses SET status = $2 WHERE id = $1")
      .bind(license_id)
      .bind(status)
      .execute(&self.pool)
      .await?;
    Ok(())
  }

  async fn generate_order_number(&self) -> Result<Option<String>> {
    let number: Option<String> = sqlx::query_scalar("SELECT generate_order_number()")
      .fetch_one(&self.pool)
      .await?;
    Ok(number.filter(|n| !n.is_empty()))
  }

  async fn insert_order(&self, order: &Order) -> Result<Order> {
    Ok(
      sqlx::query_as::<_, Order>(
        "INSERT INTO orders \
         (id, store_id, customer_id, order_number, total_amount, currency, status, payment_status, payment_type, \
          percentage_paid, remaining_amount, delivery_status, affiliate_tracking_cookie, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
         RETURNING id, store_id, customer_id, order_number, total_amount, currency, status, payment_status, \
          payment_type, percentage_paid, remaining_amount, delivery_status, affiliate_tracking_cookie, created_at",
      )
      .bind(order.id)
      .bind(order.store_id)
      .bind(order.customer_id)
      .bind(&order.order_number)
      .bind(order.total_amount)
      .bind(&order.currency)
      .bind(order.status)
      .bind(order.payment_status)
      .bind(order.payment_type)
      .bind(order.percentage_paid)
      .bind(order.remaining_amount)
      .bind(order.delivery_status)
      .bind(&order.affiliate_tracking_cookie)
      .bind(order.created_at)
      .fetch_one(&self.pool)
      .await?,
    )
  }

  async fn update_order_status(&self, order_id: Uuid, status: OrderStatus) -> Result<()> {
    sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
      .bind(order_id)
      .bind(status)
      .execute(&self.pool)
      .await?;
    Ok(())
  }

  async fn insert_order_item(&self, item: &OrderItem) -> Result<OrderItem> {
    Ok(
      sqlx::query_as::<_, OrderItem>(
        "INSERT INTO order_items \
         (id, order_id, product_id, product_type, digital_product_id, license_id, physical_product_id, variant_id, \
          service_product_id, booking_id, quantity, unit_price, total_price, item_metadata, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
         RETURNING id, order_id, product_id, product_type, digital_product_id, license_id, physical_product_id, \
          variant_id, service_product_id, booking_id, quantity, unit_price, total_price, item_metadata, created_at",
      )
      .bind(item.id)
      .bind(item.order_id)
      .bind(item.product_id)
      .bind(item.product_type)
      .bind(item.digital_product_id)
      .bind(item.license_id)
      .bind(item.physical_product_id)
      .bind(item.variant_id)
      .bind(item.service_product_id)
      .bind(item.booking_id)
      .bind(item.quantity)
      .bind(item.unit_price)
      .bind(item.total_price)
      .bind(&item.item_metadata)
      .bind(item.created_at)
      .fetch_one(&self.pool)
      .await?,
    )
  }

  async fn insert_secured_payment(&self, payment: &SecuredPayment) -> Result<SecuredPayment> {
    Ok(
      sqlx::query_as::<_, SecuredPayment>(
        "INSERT INTO secured_payments (id, order_id, total_amount, held_amount, status, release_conditions, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING id, order_id, total_amount, held_amount, status, release_conditions, created_at",
      )
      .bind(payment.id)
      .bind(payment.order_id)
      .bind(payment.total_amount)
      .bind(payment.held_amount)
      .bind(payment.status)
      .bind(Json(&payment.release_conditions.0))
      .bind(payment.created_at)
      .fetch_one(&self.pool)
      .await?,
    )
  }

  async fn redeem_gift_card(&self, gift_card_id: Uuid, order_id: Uuid, amount: i64) -> Result<GiftCardRedemption> {
    let row = sqlx::query_as::<_, RedemptionRow>("SELECT success, message FROM redeem_gift_card($1, $2, $3)")
      .bind(gift_card_id)
      .bind(order_id)
      .bind(amount)
      .fetch_optional(&self.pool)
      .await?;
    Ok(match row {
      Some(row) => GiftCardRedemption {
        success: row.success,
        message: row.message,
      },
      None => GiftCardRedemption {
        success: false,
        message: Some("redeem_gift_card returned no result".to_string()),
      },
    })
  }

  async fn create_invoice_from_order(&self, order_id: Uuid) -> Result<Option<Uuid>> {
    let invoice_id: Option<Uuid> = sqlx::query_scalar("SELECT create_invoice_from_order($1)")
      .bind(order_id)
      .fetch_one(&self.pool)
      .await?;
    Ok(invoice_id)
  }
}
