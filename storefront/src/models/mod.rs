// payhula-storefront/src/models/mod.rs

//! Rows of the storefront tables touched by order creation.

pub mod booking;
pub mod customer;
pub mod license;
pub mod order;
pub mod order_item;
pub mod product;

pub use booking::{Booking, BookingStatus};
pub use customer::{Customer, CustomerInfo, ShippingAddress};
pub use license::{License, LicenseStatus, LicenseType};
pub use order::{DeliveryStatus, Order, OrderStatus, PaymentStatus, ReleaseConditions, SecuredPayment, SecuredPaymentStatus};
pub use order_item::OrderItem;
pub use product::{
  DigitalProduct, InventoryRecord, PaymentOptions, PaymentType, PhysicalProduct, PricingType, Product, ProductType,
  ProductVariant, ServiceProduct, StaffMember,
};
