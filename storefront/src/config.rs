// payhula-storefront/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

/// Knobs read by the order workflows.
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
  pub default_currency: String,
  /// Share charged up front for `percentage` payments when the product sets none.
  pub default_percentage_rate: f64,
  pub license_expiry_days: Option<i64>,
  pub default_multi_license_activations: i32,
  pub escrow_auto_release_days: i64,
  /// Revoke the issued license when a digital order fails later on.
  pub revoke_license_on_failure: bool,
  pub reject_conflicting_bookings: bool,
  pub payment_return_url: Option<String>,
}

impl Default for CheckoutSettings {
  fn default() -> Self {
    Self {
      default_currency: "XOF".to_string(),
      default_percentage_rate: 30.0,
      license_expiry_days: None,
      default_multi_license_activations: 5,
      escrow_auto_release_days: 7,
      revoke_license_on_failure: false,
      reject_conflicting_bookings: true,
      payment_return_url: None,
    }
  }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  /// No URL means the in-memory store.
  pub database_url: Option<String>,
  pub database_max_connections: u32,
  pub payment_api_url: Option<String>,
  pub payment_api_key: Option<String>,
  pub webhook_dispatch_url: Option<String>,
  pub checkout: CheckoutSettings,
}

fn optional_env(var_name: &str) -> Option<String> {
  env::var(var_name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_env<T>(var_name: &str, default: T) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  match optional_env(var_name) {
    Some(raw) => raw
      .trim()
      .parse::<T>()
      .map_err(|e| AppError::Config(format!("Invalid {}: {}", var_name, e))),
    None => Ok(default),
  }
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let server_host = optional_env("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
    let server_port = parsed_env("SERVER_PORT", 8080u16)?;
    let database_url = optional_env("DATABASE_URL");
    let database_max_connections = parsed_env("DATABASE_MAX_CONNECTIONS", 10u32)?;

    let payment_api_url = optional_env("PAYMENT_API_URL");
    let payment_api_key = optional_env("PAYMENT_API_KEY");
    if payment_api_url.is_some() && payment_api_key.is_none() {
      return Err(AppError::Config(
        "PAYMENT_API_KEY is required when PAYMENT_API_URL is set".to_string(),
      ));
    }
    let webhook_dispatch_url = optional_env("WEBHOOK_DISPATCH_URL");

    let defaults = CheckoutSettings::default();
    let license_expiry_days = match optional_env("LICENSE_EXPIRY_DAYS") {
      Some(raw) => Some(
        raw
          .trim()
          .parse::<i64>()
          .map_err(|e| AppError::Config(format!("Invalid LICENSE_EXPIRY_DAYS: {}", e)))?,
      ),
      None => None,
    };
    let default_percentage_rate = parsed_env("DEFAULT_PERCENTAGE_RATE", defaults.default_percentage_rate)?;
    if !(0.0..=100.0).contains(&default_percentage_rate) {
      return Err(AppError::Config(format!(
        "DEFAULT_PERCENTAGE_RATE must be within 0..=100, got {}",
        default_percentage_rate
      )));
    }

    let checkout = CheckoutSettings {
      default_currency: optional_env("DEFAULT_CURRENCY").unwrap_or(defaults.default_currency),
      default_percentage_rate,
      license_expiry_days,
      default_multi_license_activations: parsed_env(
        "DEFAULT_MULTI_LICENSE_ACTIVATIONS",
        defaults.default_multi_license_activations,
      )?,
      escrow_auto_release_days: parsed_env("ESCROW_AUTO_RELEASE_DAYS", defaults.escrow_auto_release_days)?,
      revoke_license_on_failure: parsed_env("REVOKE_LICENSE_ON_FAILURE", defaults.revoke_license_on_failure)?,
      reject_conflicting_bookings: parsed_env("REJECT_CONFLICTING_BOOKINGS", defaults.reject_conflicting_bookings)?,
      payment_return_url: optional_env("PAYMENT_RETURN_URL"),
    };

    tracing::info!(
      in_memory_store = database_url.is_none(),
      mock_gateway = payment_api_url.is_none(),
      "Application configuration loaded successfully."
    );

    Ok(Self {
      server_host,
      server_port,
      database_url,
      database_max_connections,
      payment_api_url,
      payment_api_key,
      webhook_dispatch_url,
      checkout,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_match_storefront_conventions() {
    let settings = CheckoutSettings::default();
    assert_eq!(settings.default_currency, "XOF");
    assert_eq!(settings.default_percentage_rate, 30.0);
    assert_eq!(settings.default_multi_license_activations, 5);
    assert!(!settings.revoke_license_on_failure);
    assert!(settings.reject_conflicting_bookings);
  }

  #[test]
  fn parsed_env_rejects_garbage() {
    env::set_var("PAYHULA_TEST_BAD_PORT", "eighty");
    let result = parsed_env::<u16>("PAYHULA_TEST_BAD_PORT", 8080);
    env::remove_var("PAYHULA_TEST_BAD_PORT");
    assert!(matches!(result, Err(AppError::Config(m)) if m.contains("PAYHULA_TEST_BAD_PORT")));
  }

  #[test]
  fn parsed_env_falls_back_when_unset() {
    assert_eq!(parsed_env::<i64>("PAYHULA_TEST_UNSET_VALUE", 7).unwrap(), 7);
  }
}
