// payhula-storefront/src/services/mod.rs

//! Collaborators the order workflows call out to.

pub mod license_keys;
pub mod payment_gateway;
pub mod payment_mock;
pub mod pricing;
pub mod webhooks;

pub use payment_gateway::{HttpPaymentGateway, PaymentGateway, PaymentRequest, PaymentSession};
pub use payment_mock::{MockPaymentGateway, MockPaymentMode};
pub use webhooks::{HttpWebhookSink, LogWebhookSink, WebhookDispatcher, WebhookEvent, WebhookSink};
