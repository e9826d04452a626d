// payhula-storefront/src/pipelines/contexts.rs

//! Data the order pipelines run on, plus the request and response shapes.
//! Handlers receive these wrapped in `payhula_flow::ContextData`.

use crate::models::{
  Booking, Customer, CustomerInfo, DeliveryStatus, DigitalProduct, InventoryRecord, License, LicenseType, Order,
  OrderItem, PhysicalProduct, Product, ProductType, ProductVariant, ServiceProduct, ShippingAddress, StaffMember,
};
use crate::services::pricing::PaymentSplit;
use crate::state::Services;
use chrono::{DateTime, Utc};
use payhula_flow::ContextData;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

fn one() -> i32 {
  1
}

fn yes() -> bool {
  true
}

// --- Requests ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GiftCardUse {
  pub id: Uuid,
  /// Amount the shopper wants taken off this order.
  pub amount: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DigitalOrderRequest {
  pub digital_product_id: Uuid,
  pub product_id: Uuid,
  pub store_id: Uuid,
  pub customer: CustomerInfo,
  #[serde(default = "yes")]
  pub generate_license: bool,
  /// Overrides the digital product's license type.
  #[serde(default)]
  pub license_type: Option<LicenseType>,
  #[serde(default)]
  pub max_activations: Option<i32>,
  #[serde(default)]
  pub expiry_days: Option<i64>,
  #[serde(default)]
  pub gift_card: Option<GiftCardUse>,
  #[serde(default)]
  pub affiliate_tracking_cookie: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhysicalOrderRequest {
  pub physical_product_id: Uuid,
  pub product_id: Uuid,
  pub store_id: Uuid,
  pub customer: CustomerInfo,
  pub shipping_address: ShippingAddress,
  #[serde(default)]
  pub variant_id: Option<Uuid>,
  #[serde(default = "one")]
  pub quantity: i32,
  /// Reserve from this inventory location only.
  #[serde(default)]
  pub inventory_id: Option<Uuid>,
  #[serde(default)]
  pub gift_card: Option<GiftCardUse>,
  #[serde(default)]
  pub affiliate_tracking_cookie: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceOrderRequest {
  pub service_product_id: Uuid,
  pub product_id: Uuid,
  pub store_id: Uuid,
  pub customer: CustomerInfo,
  pub booking_start: DateTime<Utc>,
  /// Defaults to the service's duration.
  #[serde(default)]
  pub duration_minutes: Option<i32>,
  #[serde(default)]
  pub staff_id: Option<Uuid>,
  #[serde(default = "one")]
  pub number_of_participants: i32,
  #[serde(default)]
  pub notes: Option<String>,
  #[serde(default)]
  pub gift_card: Option<GiftCardUse>,
  #[serde(default)]
  pub affiliate_tracking_cookie: Option<String>,
}

/// Courses and untyped products: no reservation of any kind.
#[derive(Debug, Clone, Deserialize)]
pub struct GenericOrderRequest {
  pub product_id: Uuid,
  pub store_id: Uuid,
  pub customer: CustomerInfo,
  #[serde(default = "one")]
  pub quantity: i32,
  #[serde(default)]
  pub gift_card: Option<GiftCardUse>,
  #[serde(default)]
  pub affiliate_tracking_cookie: Option<String>,
}

/// Any product; the type-specific options are checked once the product's type
/// is known.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
  pub product_id: Uuid,
  pub store_id: Uuid,
  pub customer: CustomerInfo,
  #[serde(default = "one")]
  pub quantity: i32,
  #[serde(default)]
  pub gift_card: Option<GiftCardUse>,
  #[serde(default)]
  pub affiliate_tracking_cookie: Option<String>,

  // digital
  #[serde(default)]
  pub generate_license: Option<bool>,
  #[serde(default)]
  pub license_type: Option<LicenseType>,
  #[serde(default)]
  pub max_activations: Option<i32>,
  #[serde(default)]
  pub expiry_days: Option<i64>,

  // physical
  #[serde(default)]
  pub shipping_address: Option<ShippingAddress>,
  #[serde(default)]
  pub variant_id: Option<Uuid>,
  #[serde(default)]
  pub inventory_id: Option<Uuid>,

  // service
  #[serde(default)]
  pub booking_start: Option<DateTime<Utc>>,
  #[serde(default)]
  pub duration_minutes: Option<i32>,
  #[serde(default)]
  pub staff_id: Option<Uuid>,
  #[serde(default)]
  pub number_of_participants: Option<i32>,
  #[serde(default)]
  pub notes: Option<String>,
}

// --- Response ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderConfirmation {
  pub order_id: Uuid,
  pub order_item_id: Uuid,
  pub order_number: String,
  pub product_type: ProductType,
  pub checkout_url: String,
  pub transaction_id: Option<String>,
  pub amount_to_pay: i64,
  pub remaining_amount: i64,
  pub currency: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub license_id: Option<Uuid>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub license_key: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub inventory_id: Option<Uuid>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub booking_id: Option<Uuid>,
}

// --- Shared checkout state ---

/// What a workflow is holding on to, so it can be undone.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Reservation {
  #[default]
  None,
  License { id: Uuid, key: String },
  Inventory { id: Uuid, quantity: i32 },
  Booking { id: Uuid },
}

/// Fields every order workflow reads and fills in, whatever the product type.
#[derive(Debug, Clone)]
pub struct CheckoutState {
  // input
  pub store_id: Uuid,
  pub product_id: Uuid,
  pub customer_info: CustomerInfo,
  pub shipping_address: Option<ShippingAddress>,
  pub quantity: i32,
  pub gift_card: Option<GiftCardUse>,
  pub affiliate_tracking_cookie: Option<String>,

  // filled in by the steps
  pub product: Option<Product>,
  pub customer: Option<Customer>,
  pub currency: String,
  pub unit_price: i64,
  /// Amount recorded as the order's `total_amount`.
  pub order_total: i64,
  pub split: Option<PaymentSplit>,
  /// Charged now, after the gift card.
  pub final_amount: i64,
  pub gift_card_applied: i64,
  pub delivery_status: DeliveryStatus,
  pub order_number: Option<String>,
  pub order: Option<Order>,
  pub order_item: Option<OrderItem>,
  pub invoice_id: Option<Uuid>,
  pub reservation: Reservation,
  pub payment_metadata: Map<String, Value>,
  pub confirmation: Option<OrderConfirmation>,
}

impl CheckoutState {
  pub fn new(store_id: Uuid, product_id: Uuid, customer_info: CustomerInfo) -> Self {
    Self {
      store_id,
      product_id,
      customer_info,
      shipping_address: None,
      quantity: 1,
      gift_card: None,
      affiliate_tracking_cookie: None,
      product: None,
      customer: None,
      currency: String::new(),
      unit_price: 0,
      order_total: 0,
      split: None,
      final_amount: 0,
      gift_card_applied: 0,
      delivery_status: DeliveryStatus::NotApplicable,
      order_number: None,
      order: None,
      order_item: None,
      invoice_id: None,
      reservation: Reservation::None,
      payment_metadata: Map::new(),
      confirmation: None,
    }
  }

  pub fn with_gift_card(mut self, gift_card: Option<GiftCardUse>) -> Self {
    self.gift_card = gift_card.filter(|g| g.amount > 0);
    self
  }

  pub fn with_affiliate(mut self, cookie: Option<String>) -> Self {
    self.affiliate_tracking_cookie = cookie.filter(|c| !c.trim().is_empty());
    self
  }

  pub fn order_id(&self) -> Option<Uuid> {
    self.order.as_ref().map(|o| o.id)
  }
}

/// Implemented by every per-product-type workflow context, so the shared
/// steps in `common_steps` can run on any of them.
pub trait CheckoutData: Send + Sync + 'static {
  fn services(&self) -> &Services;
  fn checkout(&self) -> &CheckoutState;
  fn checkout_mut(&mut self) -> &mut CheckoutState;
}

/// A workflow context that ends with an `OrderConfirmation`.
pub trait OrderWorkflowData: Send + Sync + 'static {
  fn take_confirmation(&mut self) -> Option<OrderConfirmation>;
}

macro_rules! checkout_data {
  ($ty:ty) => {
    impl CheckoutData for $ty {
      fn services(&self) -> &Services {
        &self.services
      }
      fn checkout(&self) -> &CheckoutState {
        &self.checkout
      }
      fn checkout_mut(&mut self) -> &mut CheckoutState {
        &mut self.checkout
      }
    }

    impl OrderWorkflowData for $ty {
      fn take_confirmation(&mut self) -> Option<OrderConfirmation> {
        self.checkout.confirmation.take()
      }
    }
  };
}

// --- Per-type workflow data ---

pub struct DigitalOrderData {
  pub services: Services,
  pub request: DigitalOrderRequest,
  pub checkout: CheckoutState,
  pub digital_product: Option<DigitalProduct>,
  pub license: Option<License>,
}

impl DigitalOrderData {
  pub fn new(services: Services, request: DigitalOrderRequest) -> Self {
    let checkout = CheckoutState::new(request.store_id, request.product_id, request.customer.clone())
      .with_gift_card(request.gift_card)
      .with_affiliate(request.affiliate_tracking_cookie.clone());
    Self {
      services,
      request,
      checkout,
      digital_product: None,
      license: None,
    }
  }
}

pub struct PhysicalOrderData {
  pub services: Services,
  pub request: PhysicalOrderRequest,
  pub checkout: CheckoutState,
  pub physical_product: Option<PhysicalProduct>,
  pub variant: Option<ProductVariant>,
  /// The inventory row as it was right after the reservation.
  pub inventory: Option<InventoryRecord>,
}

impl PhysicalOrderData {
  pub fn new(services: Services, request: PhysicalOrderRequest) -> Self {
    let mut checkout = CheckoutState::new(request.store_id, request.product_id, request.customer.clone())
      .with_gift_card(request.gift_card)
      .with_affiliate(request.affiliate_tracking_cookie.clone());
    checkout.quantity = request.quantity;
    checkout.shipping_address = Some(request.shipping_address.clone());
    checkout.delivery_status = DeliveryStatus::Pending;
    Self {
      services,
      request,
      checkout,
      physical_product: None,
      variant: None,
      inventory: None,
    }
  }
}

pub struct ServiceOrderData {
  pub services: Services,
  pub request: ServiceOrderRequest,
  pub checkout: CheckoutState,
  pub service: Option<ServiceProduct>,
  pub staff: Option<StaffMember>,
  pub booking_end: Option<DateTime<Utc>>,
  pub booking: Option<Booking>,
}

impl ServiceOrderData {
  pub fn new(services: Services, request: ServiceOrderRequest) -> Self {
    let checkout = CheckoutState::new(request.store_id, request.product_id, request.customer.clone())
      .with_gift_card(request.gift_card)
      .with_affiliate(request.affiliate_tracking_cookie.clone());
    Self {
      services,
      request,
      checkout,
      service: None,
      staff: None,
      booking_end: None,
      booking: None,
    }
  }
}

pub struct GenericOrderData {
  pub services: Services,
  pub request: GenericOrderRequest,
  pub checkout: CheckoutState,
}

impl GenericOrderData {
  pub fn new(services: Services, request: GenericOrderRequest) -> Self {
    let mut checkout = CheckoutState::new(request.store_id, request.product_id, request.customer.clone())
      .with_gift_card(request.gift_card)
      .with_affiliate(request.affiliate_tracking_cookie.clone());
    checkout.quantity = request.quantity;
    Self {
      services,
      request,
      checkout,
    }
  }
}

checkout_data!(DigitalOrderData);
checkout_data!(PhysicalOrderData);
checkout_data!(ServiceOrderData);
checkout_data!(GenericOrderData);

// --- Dispatcher ---

/// The specialised workflow an order was routed to. Each variant holds the
/// sub-pipeline's own lockable context.
#[derive(Clone, Default)]
pub enum OrderRoute {
  #[default]
  Unresolved,
  Digital(ContextData<DigitalOrderData>),
  Physical(ContextData<PhysicalOrderData>),
  Service(ContextData<ServiceOrderData>),
  Generic(ContextData<GenericOrderData>),
}

impl OrderRoute {
  pub fn name(&self) -> &'static str {
    match self {
      OrderRoute::Unresolved => "unresolved",
      OrderRoute::Digital(_) => "digital",
      OrderRoute::Physical(_) => "physical",
      OrderRoute::Service(_) => "service",
      OrderRoute::Generic(_) => "generic",
    }
  }
}

pub struct OrderDispatchData {
  pub services: Services,
  pub request: CreateOrderRequest,
  pub product: Option<Product>,
  pub route: OrderRoute,
  pub confirmation: Option<OrderConfirmation>,
}

impl OrderDispatchData {
  pub fn new(services: Services, request: CreateOrderRequest) -> Self {
    Self {
      services,
      request,
      product: None,
      route: OrderRoute::Unresolved,
      confirmation: None,
    }
  }
}

impl OrderWorkflowData for OrderDispatchData {
  fn take_confirmation(&mut self) -> Option<OrderConfirmation> {
    self.confirmation.take()
  }
}
