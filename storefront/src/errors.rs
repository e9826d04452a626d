// payhula-storefront/src/errors.rs

use actix_web::{HttpResponse, ResponseError};
use payhula_flow::FlowError;
use serde_json::json;
use thiserror::Error;

/// Application error. The `Display` of the domain variants is the message
/// shown to the shopper, so those carry the user-facing text as-is.
#[derive(Debug, Error)]
pub enum AppError {
  /// Product, type record, variant or staff member absent.
  #[error("{0}")]
  NotFound(String),

  /// Rejected input, checked before any write.
  #[error("{0}")]
  Validation(String),

  /// Not enough stock or the requested slot is taken.
  #[error("{0}")]
  Conflict(String),

  /// The gateway refused or returned no checkout URL.
  #[error("{0}")]
  Payment(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Upstream HTTP Error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl AppError {
  pub fn product_not_found() -> Self {
    AppError::NotFound("Produit non trouvé".to_string())
  }

  pub fn insufficient_stock() -> Self {
    AppError::Conflict("Stock insuffisant".to_string())
  }

  pub fn payment_init_failed() -> Self {
    AppError::Payment("Erreur lors de l'initialisation du paiement".to_string())
  }
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<sqlx::Error>() {
      Ok(db_err) => AppError::Sqlx(db_err),
      Err(err) => AppError::Internal(err.to_string()),
    }
  }
}

impl ResponseError for AppError {
  fn error_response(&self) -> HttpResponse {
    tracing::error!(application_error = %self, "Responding with error");
    match self {
      AppError::NotFound(m) => HttpResponse::NotFound().json(json!({"error": m})),
      AppError::Validation(m) => HttpResponse::BadRequest().json(json!({"error": m})),
      AppError::Conflict(m) => HttpResponse::Conflict().json(json!({"error": m})),
      AppError::Payment(m) => HttpResponse::PaymentRequired().json(json!({"error": m})),
      AppError::Config(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "Configuration issue", "detail": m}))
      }
      AppError::Sqlx(_) => HttpResponse::InternalServerError().json(json!({"error": "Database operation failed"})),
      AppError::Http(_) => HttpResponse::InternalServerError().json(json!({"error": "Upstream service unavailable"})),
      AppError::Workflow { source } => {
        tracing::error!(flow_error_source = ?source, "Workflow error details");
        HttpResponse::InternalServerError()
          .json(json!({"error": "Workflow processing error", "detail": source.to_string()}))
      }
      AppError::Internal(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "An internal error occurred", "detail": m}))
      }
    }
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
