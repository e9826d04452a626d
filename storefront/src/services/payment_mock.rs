// payhula-storefront/src/services/payment_mock.rs

use super::payment_gateway::{PaymentGateway, PaymentRequest, PaymentSession};
use crate::errors::{AppError, Result as AppResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockPaymentMode {
  /// Returns a checkout URL and a transaction id.
  Succeed,
  /// Answers, but without a checkout URL.
  NoCheckoutUrl,
  /// The call itself fails.
  Fail,
}

/// In-process gateway used when no gateway URL is configured, and by tests.
pub struct MockPaymentGateway {
  mode: Mutex<MockPaymentMode>,
  requests: Mutex<Vec<PaymentRequest>>,
}

impl MockPaymentGateway {
  pub fn new(mode: MockPaymentMode) -> Self {
    Self {
      mode: Mutex::new(mode),
      requests: Mutex::new(Vec::new()),
    }
  }

  pub fn set_mode(&self, mode: MockPaymentMode) {
    *self.mode.lock() = mode;
  }

  pub fn requests(&self) -> Vec<PaymentRequest> {
    self.requests.lock().clone()
  }
}

impl Default for MockPaymentGateway {
  fn default() -> Self {
    Self::new(MockPaymentMode::Succeed)
  }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
  #[instrument(
    name = "MockPaymentGateway::initiate_payment",
    skip_all,
    fields(order_id = %request.order_id, amount = request.amount)
  )]
  async fn initiate_payment(&self, request: &PaymentRequest) -> AppResult<PaymentSession> {
    self.requests.lock().push(request.clone());
    let mode = *self.mode.lock();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    match mode {
      MockPaymentMode::Succeed => {
        let transaction_id = format!("mock_tx_{}", Uuid::new_v4().simple());
        info!("Simulated payment session {} for order {}", transaction_id, request.order_id);
        Ok(PaymentSession {
          success: true,
          checkout_url: Some(format!("https://pay.example.test/checkout/{}", transaction_id)),
          transaction_id: Some(transaction_id),
        })
      }
      MockPaymentMode::NoCheckoutUrl => Ok(PaymentSession {
        success: false,
        checkout_url: None,
        transaction_id: None,
      }),
      MockPaymentMode::Fail => Err(AppError::Payment("Mock gateway unavailable".to_string())),
    }
  }
}
