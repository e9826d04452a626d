// payhula-storefront/src/services/payment_gateway.rs

//! The hosted payment gateway, as used by checkout: one call that opens a
//! payment session and hands back the page the shopper is sent to.

use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct PaymentRequest {
  pub store_id: Uuid,
  pub product_id: Uuid,
  pub order_id: Uuid,
  pub customer_id: Uuid,
  pub amount: i64,
  pub currency: String,
  pub description: String,
  pub customer_email: String,
  pub customer_name: Option<String>,
  pub customer_phone: Option<String>,
  pub metadata: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentSession {
  #[serde(default)]
  pub success: bool,
  #[serde(default)]
  pub checkout_url: Option<String>,
  #[serde(default)]
  pub transaction_id: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  async fn initiate_payment(&self, request: &PaymentRequest) -> Result<PaymentSession>;
}

#[derive(Serialize)]
struct InitiateBody<'a> {
  #[serde(flatten)]
  request: &'a PaymentRequest,
  #[serde(skip_serializing_if = "Option::is_none")]
  return_url: Option<&'a str>,
}

/// Gateway reached over HTTPS with a bearer key.
pub struct HttpPaymentGateway {
  client: reqwest::Client,
  base_url: String,
  api_key: String,
  return_url: Option<String>,
}

impl HttpPaymentGateway {
  pub fn new(base_url: &str, api_key: &str, return_url: Option<String>) -> Result<Self> {
    let client = reqwest::Client::builder().timeout(Duration::from_secs(15)).build()?;
    Ok(Self {
      client,
      base_url: base_url.trim_end_matches('/').to_string(),
      api_key: api_key.to_string(),
      return_url,
    })
  }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
  #[instrument(
    name = "HttpPaymentGateway::initiate_payment",
    skip_all,
    fields(order_id = %request.order_id, amount = request.amount, currency = %request.currency)
  )]
  async fn initiate_payment(&self, request: &PaymentRequest) -> Result<PaymentSession> {
    let body = InitiateBody {
      request,
      return_url: self.return_url.as_deref(),
    };
    let response = self
      .client
      .post(format!("{}/payments/initiate", self.base_url))
      .bearer_auth(&self.api_key)
      .json(&body)
      .send()
      .await?;

    if !response.status().is_success() {
      tracing::warn!(status = %response.status(), "Payment gateway rejected the session request.");
      return Ok(PaymentSession::default());
    }
    Ok(response.json::<PaymentSession>().await?)
  }
}
