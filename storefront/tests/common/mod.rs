// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use payhula_flow::FlowRegistry;
use payhula_storefront::config::CheckoutSettings;
use payhula_storefront::errors::{AppError, Result as AppResult};
use payhula_storefront::models::{
  Booking, BookingStatus, Customer, CustomerInfo, DigitalProduct, InventoryRecord, License, LicenseStatus,
  LicenseType, Order, OrderItem, OrderStatus, PaymentOptions, PaymentType, PhysicalProduct, PricingType, Product,
  ProductType, ProductVariant, SecuredPayment, ServiceProduct, ShippingAddress, StaffMember,
};
use payhula_storefront::pipelines::contexts::{
  CreateOrderRequest, DigitalOrderRequest, PhysicalOrderRequest, ServiceOrderRequest,
};
use payhula_storefront::pipelines::register_all_pipelines;
use payhula_storefront::services::{MockPaymentGateway, WebhookDispatcher, WebhookEvent, WebhookSink};
use payhula_storefront::state::Services;
use payhula_storefront::store::{DataStore, GiftCardRedemption, MemoryStore};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::Level;
use uuid::Uuid;

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

/// Gives spawned webhook deliveries time to finish.
pub async fn settle() {
  tokio::time::sleep(std::time::Duration::from_millis(25)).await;
}

// --- Fault injection ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
  InsertCustomer,
  InsertLicense,
  GenerateOrderNumber,
  InsertOrder,
  InsertOrderItem,
  InsertSecuredPayment,
  InsertBooking,
  CreateInvoice,
}

/// `MemoryStore` wrapper that fails the operations it is told to.
pub struct FaultyStore {
  inner: Arc<MemoryStore>,
  faults: Mutex<HashSet<Fault>>,
}

impl FaultyStore {
  pub fn new(inner: Arc<MemoryStore>) -> Self {
    Self {
      inner,
      faults: Mutex::new(HashSet::new()),
    }
  }

  pub fn fail(&self, fault: Fault) {
    self.faults.lock().insert(fault);
  }

  fn check(&self, fault: Fault) -> AppResult<()> {
    if self.faults.lock().contains(&fault) {
      return Err(AppError::Internal(format!("injected {:?} failure", fault)));
    }
    Ok(())
  }
}

#[async_trait]
impl DataStore for FaultyStore {
  async fn find_product(&self, id: Uuid) -> AppResult<Option<Product>> {
    self.inner.find_product(id).await
  }

  async fn find_digital_product(&self, id: Uuid) -> AppResult<Option<DigitalProduct>> {
    self.inner.find_digital_product(id).await
  }

  async fn find_digital_product_by_product(&self, product_id: Uuid) -> AppResult<Option<DigitalProduct>> {
    self.inner.find_digital_product_by_product(product_id).await
  }

  async fn find_physical_product(&self, id: Uuid) -> AppResult<Option<PhysicalProduct>> {
    self.inner.find_physical_product(id).await
  }

  async fn find_physical_product_by_product(&self, product_id: Uuid) -> AppResult<Option<PhysicalProduct>> {
    self.inner.find_physical_product_by_product(product_id).await
  }

  async fn find_service_product(&self, id: Uuid) -> AppResult<Option<ServiceProduct>> {
    self.inner.find_service_product(id).await
  }

  async fn find_service_product_by_product(&self, product_id: Uuid) -> AppResult<Option<ServiceProduct>> {
    self.inner.find_service_product_by_product(product_id).await
  }

  async fn find_variant(&self, id: Uuid) -> AppResult<Option<ProductVariant>> {
    self.inner.find_variant(id).await
  }

  async fn list_tracked_inventory(&self, physical_product_id: Uuid) -> AppResult<Vec<InventoryRecord>> {
    self.inner.list_tracked_inventory(physical_product_id).await
  }

  async fn reserve_inventory(&self, inventory_id: Uuid, quantity: i32) -> AppResult<Option<InventoryRecord>> {
    self.inner.reserve_inventory(inventory_id, quantity).await
  }

  async fn release_inventory(&self, inventory_id: Uuid, quantity: i32) -> AppResult<()> {
    self.inner.release_inventory(inventory_id, quantity).await
  }

  async fn find_active_staff(&self, service_product_id: Uuid, staff_id: Uuid) -> AppResult<Option<StaffMember>> {
    self.inner.find_active_staff(service_product_id, staff_id).await
  }

  async fn list_overlapping_bookings(
    &self,
    service_id: Uuid,
    staff_id: Option<Uuid>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> AppResult<Vec<Booking>> {
    self.inner.list_overlapping_bookings(service_id, staff_id, start, end).await
  }

  async fn insert_booking(&self, booking: &Booking) -> AppResult<Booking> {
    self.check(Fault::InsertBooking)?;
    self.inner.insert_booking(booking).await
  }

  async fn update_booking_status(&self, booking_id: Uuid, status: BookingStatus) -> AppResult<()> {
    self.inner.update_booking_status(booking_id, status).await
  }

  async fn find_customer(&self, store_id: Uuid, email: &str) -> AppResult<Option<Customer>> {
    self.inner.find_customer(store_id, email).await
  }

  async fn insert_customer(&self, customer: &Customer) -> AppResult<Customer> {
    self.check(Fault::InsertCustomer)?;
    self.inner.insert_customer(customer).await
  }

  async fn update_customer(&self, customer: &Customer) -> AppResult<Customer> {
    self.inner.update_customer(customer).await
  }

  async fn insert_license(&self, license: &License) -> AppResult<License> {
    self.check(Fault::InsertLicense)?;
    self.inner.insert_license(license).await
  }

  async fn update_license_status(&self, license_id: Uuid, status: LicenseStatus) -> AppResult<()> {
    self.inner.update_license_status(license_id, status).await
  }

  async fn generate_order_number(&self) -> AppResult<Option<String>> {
    self.check(Fault::GenerateOrderNumber)?;
    self.inner.generate_order_number().await
  }

  async fn insert_order(&self, order: &Order) -> AppResult<Order> {
    self.check(Fault::InsertOrder)?;
    self.inner.insert_order(order).await
  }

  async fn update_order_status(&self, order_id: Uuid, status: OrderStatus) -> AppResult<()> {
    self.inner.update_order_status(order_id, status).await
  }

  async fn insert_order_item(&self, item: &OrderItem) -> AppResult<OrderItem> {
    self.check(Fault::InsertOrderItem)?;
    self.inner.insert_order_item(item).await
  }

  async fn insert_secured_payment(&self, payment: &SecuredPayment) -> AppResult<SecuredPayment> {
    self.check(Fault::InsertSecuredPayment)?;
    self.inner.insert_secured_payment(payment).await
  }

  async fn redeem_gift_card(&self, gift_card_id: Uuid, order_id: Uuid, amount: i64) -> AppResult<GiftCardRedemption> {
    self.inner.redeem_gift_card(gift_card_id, order_id, amount).await
  }

  async fn create_invoice_from_order(&self, order_id: Uuid) -> AppResult<Option<Uuid>> {
    self.check(Fault::CreateInvoice)?;
    self.inner.create_invoice_from_order(order_id).await
  }
}

// --- Webhooks ---

#[derive(Default)]
pub struct RecordingSink {
  events: Mutex<Vec<WebhookEvent>>,
  failing: AtomicBool,
}

impl RecordingSink {
  pub fn events(&self) -> Vec<WebhookEvent> {
    self.events.lock().clone()
  }

  pub fn event_names(&self) -> Vec<String> {
    self.events.lock().iter().map(|e| e.event.clone()).collect()
  }

  pub fn fail_deliveries(&self) {
    self.failing.store(true, Ordering::SeqCst);
  }
}

#[async_trait]
impl WebhookSink for RecordingSink {
  fn name(&self) -> &str {
    "recording"
  }

  async fn deliver(&self, event: &WebhookEvent) -> AppResult<()> {
    if self.failing.load(Ordering::SeqCst) {
      return Err(AppError::Internal("recording sink is down".to_string()));
    }
    self.events.lock().push(event.clone());
    Ok(())
  }
}

// --- Shop fixture ---

/// One store with in-memory data, a mock gateway and every pipeline registered.
pub struct TestShop {
  pub store_id: Uuid,
  pub db: Arc<MemoryStore>,
  pub faults: Arc<FaultyStore>,
  pub payments: Arc<MockPaymentGateway>,
  pub sink: Arc<RecordingSink>,
  pub services: Services,
  pub flows: FlowRegistry<AppError>,
}

impl TestShop {
  pub fn new() -> Self {
    Self::build(MemoryStore::new(), CheckoutSettings::default())
  }

  pub fn with_settings(settings: CheckoutSettings) -> Self {
    Self::build(MemoryStore::new(), settings)
  }

  pub fn build(db: MemoryStore, settings: CheckoutSettings) -> Self {
    setup_tracing();
    let db = Arc::new(db);
    let faults = Arc::new(FaultyStore::new(db.clone()));
    let payments = Arc::new(MockPaymentGateway::default());
    let sink = Arc::new(RecordingSink::default());

    let store: Arc<dyn DataStore> = faults.clone();
    let webhooks = WebhookDispatcher::new(vec![sink.clone() as Arc<dyn WebhookSink>]);
    let services = Services::new(store, payments.clone(), webhooks, settings);

    let flows = FlowRegistry::<AppError>::new();
    register_all_pipelines(&flows);

    Self {
      store_id: Uuid::new_v4(),
      db,
      faults,
      payments,
      sink,
      services,
      flows,
    }
  }

  // --- seeding ---

  pub fn product(&self, product_type: ProductType, price: i64) -> Product {
    self.product_with(product_type, price, None)
  }

  pub fn product_with(&self, product_type: ProductType, price: i64, payment: Option<PaymentOptions>) -> Product {
    let product = Product {
      id: Uuid::new_v4(),
      store_id: self.store_id,
      name: format!("Test {} product", product_type.as_str()),
      price,
      promotional_price: None,
      currency: None,
      product_type,
      payment_options: payment.map(sqlx::types::Json),
      created_at: Utc::now(),
    };
    self.db.add_product(product.clone());
    product
  }

  pub fn digital(&self, price: i64) -> (Product, DigitalProduct) {
    let product = self.product(ProductType::Digital, price);
    let digital = DigitalProduct {
      id: Uuid::new_v4(),
      product_id: product.id,
      license_type: LicenseType::Single,
      max_activations: None,
      license_expiry_days: None,
    };
    self.db.add_digital_product(digital.clone());
    (product, digital)
  }

  pub fn physical(&self, price: i64, payment: Option<PaymentOptions>) -> (Product, PhysicalProduct) {
    let product = self.product_with(ProductType::Physical, price, payment);
    let physical = PhysicalProduct {
      id: Uuid::new_v4(),
      product_id: product.id,
      sku: Some("SKU-001".to_string()),
    };
    self.db.add_physical_product(physical.clone());
    (product, physical)
  }

  pub fn stock(&self, physical: &PhysicalProduct, available: i32, reserved: i32) -> InventoryRecord {
    let record = InventoryRecord {
      id: Uuid::new_v4(),
      physical_product_id: physical.id,
      quantity_available: available,
      quantity_reserved: reserved,
      track_inventory: true,
      location: Some("Dakar".to_string()),
    };
    self.db.add_inventory(record.clone());
    record
  }

  pub fn variant(&self, physical: &PhysicalProduct, price_adjustment: i64, is_available: bool) -> ProductVariant {
    let variant = ProductVariant {
      id: Uuid::new_v4(),
      physical_product_id: physical.id,
      name: "XL".to_string(),
      price_adjustment,
      is_available,
    };
    self.db.add_variant(variant.clone());
    variant
  }

  /// A 60 minute service for up to 4 participants.
  pub fn service(
    &self,
    price: i64,
    pricing_type: PricingType,
    payment: Option<PaymentOptions>,
  ) -> (Product, ServiceProduct) {
    let product = self.product_with(ProductType::Service, price, payment);
    let service = ServiceProduct {
      id: Uuid::new_v4(),
      product_id: product.id,
      duration_minutes: 60,
      max_participants: 4,
      pricing_type,
    };
    self.db.add_service_product(service.clone());
    (product, service)
  }

  pub fn staff(&self, service: &ServiceProduct, is_active: bool) -> StaffMember {
    let staff = StaffMember {
      id: Uuid::new_v4(),
      service_product_id: service.id,
      name: "Fatou".to_string(),
      is_active,
    };
    self.db.add_staff(staff.clone());
    staff
  }

  pub fn existing_booking(
    &self,
    service: &ServiceProduct,
    staff_id: Option<Uuid>,
    start: DateTime<Utc>,
    minutes: i64,
    status: BookingStatus,
  ) -> Booking {
    let booking = Booking {
      id: Uuid::new_v4(),
      service_id: service.id,
      customer_id: Uuid::new_v4(),
      staff_id,
      start_time: start,
      end_time: start + Duration::minutes(minutes),
      status,
      number_of_participants: 1,
      customer_notes: None,
      created_at: Utc::now(),
    };
    self.db.add_booking(booking.clone());
    booking
  }

  // --- requests ---

  pub fn digital_request(&self, product: &Product, digital: &DigitalProduct) -> DigitalOrderRequest {
    DigitalOrderRequest {
      digital_product_id: digital.id,
      product_id: product.id,
      store_id: self.store_id,
      customer: customer(),
      generate_license: true,
      license_type: None,
      max_activations: None,
      expiry_days: None,
      gift_card: None,
      affiliate_tracking_cookie: None,
    }
  }

  pub fn physical_request(&self, product: &Product, physical: &PhysicalProduct, quantity: i32) -> PhysicalOrderRequest {
    PhysicalOrderRequest {
      physical_product_id: physical.id,
      product_id: product.id,
      store_id: self.store_id,
      customer: customer(),
      shipping_address: address(),
      variant_id: None,
      quantity,
      inventory_id: None,
      gift_card: None,
      affiliate_tracking_cookie: None,
    }
  }

  pub fn service_request(&self, product: &Product, service: &ServiceProduct, start: DateTime<Utc>) -> ServiceOrderRequest {
    ServiceOrderRequest {
      service_product_id: service.id,
      product_id: product.id,
      store_id: self.store_id,
      customer: customer(),
      booking_start: start,
      duration_minutes: None,
      staff_id: None,
      number_of_participants: 1,
      notes: Some("Premier rendez-vous".to_string()),
      gift_card: None,
      affiliate_tracking_cookie: None,
    }
  }

  pub fn create_request(&self, product: &Product) -> CreateOrderRequest {
    CreateOrderRequest {
      product_id: product.id,
      store_id: self.store_id,
      customer: customer(),
      quantity: 1,
      gift_card: None,
      affiliate_tracking_cookie: None,
      generate_license: None,
      license_type: None,
      max_activations: None,
      expiry_days: None,
      shipping_address: None,
      variant_id: None,
      inventory_id: None,
      booking_start: None,
      duration_minutes: None,
      staff_id: None,
      number_of_participants: None,
      notes: None,
    }
  }
}

pub fn customer() -> CustomerInfo {
  CustomerInfo {
    email: "awa.diop@example.com".to_string(),
    name: Some("Awa Diop".to_string()),
    phone: Some("+221770000000".to_string()),
  }
}

pub fn address() -> ShippingAddress {
  ShippingAddress {
    full_name: Some("Awa Diop".to_string()),
    address_line1: "12 rue Carnot".to_string(),
    address_line2: None,
    city: "Dakar".to_string(),
    state: None,
    postal_code: Some("10200".to_string()),
    country: "SN".to_string(),
    phone: None,
  }
}

pub fn options(payment_type: PaymentType, percentage_rate: Option<f64>) -> PaymentOptions {
  PaymentOptions {
    payment_type,
    percentage_rate,
  }
}

/// `hour`:00 UTC on a fixed future Monday.
pub fn slot(hour: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2030, 6, 3, hour, 0, 0).unwrap()
}

/// Four dash-separated groups of four uppercase letters or digits.
pub fn is_license_key(key: &str) -> bool {
  let groups: Vec<&str> = key.split('-').collect();
  groups.len() == 4
    && groups
      .iter()
      .all(|g| g.len() == 4 && g.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()))
}
