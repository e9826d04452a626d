// payhula-storefront/src/services/webhooks.rs

//! Fire-and-forget store webhooks.
//!
//! Delivery runs on a spawned task and never reaches the caller; failures are
//! logged and counted so they stay observable.

use crate::errors::{AppError, Result};
use crate::models::{Booking, Order};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, Instrument};
use uuid::Uuid;

pub const ORDER_CREATED: &str = "order.created";
pub const SERVICE_BOOKING_CREATED: &str = "service_booking.created";

#[derive(Debug, Clone, Serialize)]
pub struct WebhookEvent {
  pub event: String,
  pub resource_id: Uuid,
  pub store_id: Uuid,
  pub payload: Value,
  pub occurred_at: DateTime<Utc>,
}

#[async_trait]
pub trait WebhookSink: Send + Sync {
  fn name(&self) -> &str;
  async fn deliver(&self, event: &WebhookEvent) -> Result<()>;
}

/// Posts events as JSON to the store's webhook relay.
pub struct HttpWebhookSink {
  client: reqwest::Client,
  url: String,
}

impl HttpWebhookSink {
  pub fn new(url: &str) -> Result<Self> {
    let client = reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?;
    Ok(Self {
      client,
      url: url.to_string(),
    })
  }
}

#[async_trait]
impl WebhookSink for HttpWebhookSink {
  fn name(&self) -> &str {
    "http"
  }

  async fn deliver(&self, event: &WebhookEvent) -> Result<()> {
    let response = self.client.post(&self.url).json(event).send().await?;
    if !response.status().is_success() {
      return Err(AppError::Internal(format!(
        "Webhook relay answered {} for {}",
        response.status(),
        event.event
      )));
    }
    Ok(())
  }
}

/// Writes events to the log only.
pub struct LogWebhookSink;

#[async_trait]
impl WebhookSink for LogWebhookSink {
  fn name(&self) -> &str {
    "log"
  }

  async fn deliver(&self, event: &WebhookEvent) -> Result<()> {
    info!(event = %event.event, resource_id = %event.resource_id, store_id = %event.store_id, "Webhook event");
    Ok(())
  }
}

#[derive(Clone)]
pub struct WebhookDispatcher {
  sinks: Arc<Vec<Arc<dyn WebhookSink>>>,
  failures: Arc<AtomicU64>,
}

impl WebhookDispatcher {
  pub fn new(sinks: Vec<Arc<dyn WebhookSink>>) -> Self {
    Self {
      sinks: Arc::new(sinks),
      failures: Arc::new(AtomicU64::new(0)),
    }
  }

  pub fn log_only() -> Self {
    Self::new(vec![Arc::new(LogWebhookSink)])
  }

  /// Deliveries that failed since start-up.
  pub fn failure_count(&self) -> u64 {
    self.failures.load(Ordering::Relaxed)
  }

  /// Spawns delivery of `event` to every sink and returns immediately.
  #[instrument(name = "WebhookDispatcher::dispatch", skip_all, fields(event = %event.event, resource_id = %event.resource_id))]
  pub fn dispatch(&self, event: WebhookEvent) {
    let sinks = self.sinks.clone();
    let failures = self.failures.clone();
    tokio::spawn(
      async move {
        let deliveries = sinks.iter().map(|sink| {
          let event = &event;
          async move { (sink.name().to_string(), sink.deliver(event).await) }
        });
        for (sink_name, outcome) in join_all(deliveries).await {
          if let Err(e) = outcome {
            failures.fetch_add(1, Ordering::Relaxed);
            error!(sink = %sink_name, error = %e, "Webhook delivery failed.");
          }
        }
      }
      .in_current_span(),
    );
  }

  pub fn order_created(&self, order: &Order) {
    let payload = serde_json::to_value(order).unwrap_or(Value::Null);
    self.dispatch(WebhookEvent {
      event: ORDER_CREATED.to_string(),
      resource_id: order.id,
      store_id: order.store_id,
      payload,
      occurred_at: Utc::now(),
    });
  }

  pub fn service_booking_created(&self, booking: &Booking, store_id: Uuid) {
    let payload = serde_json::to_value(booking).unwrap_or(Value::Null);
    self.dispatch(WebhookEvent {
      event: SERVICE_BOOKING_CREATED.to_string(),
      resource_id: booking.id,
      store_id,
      payload,
      occurred_at: Utc::now(),
    });
  }
}
