// payhula-storefront/src/state.rs
use crate::config::{AppConfig, CheckoutSettings};
use crate::errors::AppError;
use crate::services::{PaymentGateway, WebhookDispatcher};
use crate::store::DataStore;
use payhula_flow::FlowRegistry;
use std::sync::Arc;

/// Collaborators handed to every order workflow run.
#[derive(Clone)]
pub struct Services {
  pub store: Arc<dyn DataStore>,
  pub payments: Arc<dyn PaymentGateway>,
  pub webhooks: WebhookDispatcher,
  pub settings: Arc<CheckoutSettings>,
}

impl Services {
  pub fn new(
    store: Arc<dyn DataStore>,
    payments: Arc<dyn PaymentGateway>,
    webhooks: WebhookDispatcher,
    settings: CheckoutSettings,
  ) -> Self {
    Self {
      store,
      payments,
      webhooks,
      settings: Arc::new(settings),
    }
  }
}

#[derive(Clone)]
pub struct AppState {
  pub services: Services,
  pub flows: Arc<FlowRegistry<AppError>>,
  pub config: Arc<AppConfig>,
}
