// payhula-storefront/src/main.rs

use payhula_flow::FlowRegistry;
use payhula_storefront::config::AppConfig;
use payhula_storefront::errors::{AppError, Result as AppResult};
use payhula_storefront::pipelines;
use payhula_storefront::services::{
  HttpPaymentGateway, HttpWebhookSink, LogWebhookSink, MockPaymentGateway, PaymentGateway, WebhookDispatcher,
  WebhookSink,
};
use payhula_storefront::state::{AppState, Services};
use payhula_storefront::store::{DataStore, MemoryStore, PgStore};
use payhula_storefront::web::configure_app_routes;

use actix_web::{web as actix_data, App, HttpServer};
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

async fn build_services(config: &AppConfig) -> AppResult<Services> {
  let store: Arc<dyn DataStore> = match &config.database_url {
    Some(url) => {
      let store = PgStore::connect(url, config.database_max_connections).await?;
      tracing::info!("Successfully connected to the database.");
      Arc::new(store)
    }
    None => {
      tracing::warn!("DATABASE_URL not set; orders are kept in memory.");
      Arc::new(MemoryStore::new())
    }
  };

  let payments: Arc<dyn PaymentGateway> = match (&config.payment_api_url, &config.payment_api_key) {
    (Some(url), Some(key)) => Arc::new(HttpPaymentGateway::new(
      url,
      key,
      config.checkout.payment_return_url.clone(),
    )?),
    _ => {
      tracing::warn!("PAYMENT_API_URL not set; using the mock payment gateway.");
      Arc::new(MockPaymentGateway::default())
    }
  };

  let mut sinks: Vec<Arc<dyn WebhookSink>> = vec![Arc::new(LogWebhookSink)];
  if let Some(url) = &config.webhook_dispatch_url {
    sinks.push(Arc::new(HttpWebhookSink::new(url)?));
  }

  Ok(Services::new(
    store,
    payments,
    WebhookDispatcher::new(sinks),
    config.checkout.clone(),
  ))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting Payhula storefront server...");

  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
    }
  };

  let services = match build_services(&app_config).await {
    Ok(services) => services,
    Err(e) => {
      tracing::error!(error = %e, "Failed to initialise collaborators.");
      return Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
    }
  };

  let flows = Arc::new(FlowRegistry::<AppError>::new());
  pipelines::register_all_pipelines(&flows);

  let app_state = AppState {
    services,
    flows,
    config: app_config.clone(),
  };

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
