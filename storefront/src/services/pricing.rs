// payhula-storefront/src/services/pricing.rs

//! Amount arithmetic shared by the order workflows. All amounts are in the
//! currency's smallest unit.

use crate::models::{PaymentOptions, PaymentType, PricingType};
use serde::Serialize;

/// What is charged now versus later for one order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PaymentSplit {
  pub payment_type: PaymentType,
  pub amount_to_pay: i64,
  pub remaining_amount: i64,
  /// Share of the total charged now, in percent.
  pub percentage_paid: f64,
}

impl PaymentSplit {
  pub fn full(total: i64) -> Self {
    Self {
      payment_type: PaymentType::Full,
      amount_to_pay: total,
      remaining_amount: 0,
      percentage_paid: 100.0,
    }
  }
}

/// Splits `total` according to the product's payment options.
///
/// `percentage` charges `round(total * rate / 100)` now, the rate coming from
/// the options or `default_rate`, clamped to `[0, 100]`. `delivery_secured`
/// charges everything now; the escrow record is created by the workflow.
pub fn split_payment(total: i64, options: &PaymentOptions, default_rate: f64) -> PaymentSplit {
  match options.payment_type {
    PaymentType::Full => PaymentSplit::full(total),
    PaymentType::DeliverySecured => PaymentSplit {
      payment_type: PaymentType::DeliverySecured,
      ..PaymentSplit::full(total)
    },
    PaymentType::Percentage => {
      let rate = options.percentage_rate.unwrap_or(default_rate);
      let rate = if rate.is_nan() { default_rate } else { rate.clamp(0.0, 100.0) };
      let amount_to_pay = (total as f64 * rate / 100.0).round() as i64;
      PaymentSplit {
        payment_type: PaymentType::Percentage,
        amount_to_pay,
        remaining_amount: total - amount_to_pay,
        percentage_paid: rate,
      }
    }
  }
}

/// Amount left to charge after a gift card, never negative.
pub fn apply_gift_card(amount_to_pay: i64, gift_card_amount: Option<i64>) -> i64 {
  match gift_card_amount {
    Some(gift) if gift > 0 => (amount_to_pay - gift).max(0),
    _ => amount_to_pay,
  }
}

/// `unit_price * quantity`, or `None` when the amount does not fit.
pub fn line_total(unit_price: i64, quantity: i32) -> Option<i64> {
  unit_price.checked_mul(i64::from(quantity))
}

/// Price of one service booking, or `None` on overflow.
pub fn service_price(base_price: i64, pricing_type: PricingType, participants: i32, duration_minutes: i32) -> Option<i64> {
  match pricing_type {
    PricingType::Flat => Some(base_price),
    PricingType::PerParticipant => line_total(base_price, participants.max(1)),
    PricingType::PerHour => Some((base_price as f64 * f64::from(duration_minutes) / 60.0).round() as i64),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn options(payment_type: PaymentType, percentage_rate: Option<f64>) -> PaymentOptions {
    PaymentOptions {
      payment_type,
      percentage_rate,
    }
  }

  #[test]
  fn percentage_charges_a_deposit() {
    let split = split_payment(1000, &options(PaymentType::Percentage, Some(30.0)), 50.0);
    assert_eq!(split.amount_to_pay, 300);
    assert_eq!(split.remaining_amount, 700);
    assert_eq!(split.percentage_paid, 30.0);
  }

  #[test]
  fn percentage_falls_back_to_default_rate_and_clamps() {
    let split = split_payment(1000, &options(PaymentType::Percentage, None), 25.0);
    assert_eq!(split.amount_to_pay, 250);

    let split = split_payment(1000, &options(PaymentType::Percentage, Some(140.0)), 25.0);
    assert_eq!(split.amount_to_pay, 1000);
    assert_eq!(split.remaining_amount, 0);
  }

  #[test]
  fn full_and_secured_charge_everything() {
    let full = split_payment(1000, &options(PaymentType::Full, None), 30.0);
    assert_eq!((full.amount_to_pay, full.remaining_amount), (1000, 0));

    let secured = split_payment(1000, &options(PaymentType::DeliverySecured, None), 30.0);
    assert_eq!(secured.amount_to_pay, 1000);
    assert_eq!(secured.payment_type, PaymentType::DeliverySecured);
  }

  #[test]
  fn gift_card_is_floored_at_zero() {
    assert_eq!(apply_gift_card(300, Some(100)), 200);
    assert_eq!(apply_gift_card(300, Some(500)), 0);
    assert_eq!(apply_gift_card(300, None), 300);
  }

  #[test]
  fn service_pricing_modes() {
    assert_eq!(service_price(5000, PricingType::Flat, 3, 90), Some(5000));
    assert_eq!(service_price(5000, PricingType::PerParticipant, 3, 90), Some(15000));
    assert_eq!(service_price(5000, PricingType::PerHour, 1, 90), Some(7500));
    assert_eq!(service_price(i64::MAX, PricingType::PerParticipant, 2, 60), None);
  }
}
