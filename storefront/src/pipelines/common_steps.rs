// payhula-storefront/src/pipelines/common_steps.rs

//! Steps shared by every order workflow. Each one is generic over the
//! workflow's context through `CheckoutData`, reads what it needs under a
//! short lock, awaits the store or gateway, then writes its result back.

use crate::errors::{AppError, Result as AppResult};
use crate::models::{
  Customer, Order, OrderStatus, PaymentStatus, ProductType, ReleaseConditions, SecuredPayment, SecuredPaymentStatus,
};
use crate::pipelines::contexts::{CheckoutData, OrderConfirmation, Reservation};
use crate::services::pricing::PaymentSplit;
use crate::services::PaymentRequest;
use chrono::Utc;
use payhula_flow::{ContextData, PipelineControl};
use serde_json::Value;
use sqlx::types::Json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub(crate) fn missing(what: &str) -> AppError {
  AppError::Internal(format!("{} missing from checkout context", what))
}

pub(crate) fn amount_out_of_range() -> AppError {
  AppError::Validation("Montant de commande invalide".to_string())
}

/// Loads the product and settles the order currency.
#[instrument(name = "checkout::load_product", skip_all, err(Display))]
pub async fn load_product<T: CheckoutData>(ctx_data: ContextData<T>) -> AppResult<PipelineControl> {
  let (store, store_id, product_id) = {
    let guard = ctx_data.read();
    (guard.services().store.clone(), guard.checkout().store_id, guard.checkout().product_id)
  };

  let product = store
    .find_product(product_id)
    .await?
    .filter(|p| p.store_id == store_id)
    .ok_or_else(AppError::product_not_found)?;

  let mut guard = ctx_data.write();
  let default_currency = guard.services().settings.default_currency.clone();
  let checkout = guard.checkout_mut();
  checkout.currency = product
    .currency
    .clone()
    .filter(|c| !c.trim().is_empty())
    .unwrap_or(default_currency);
  checkout.product = Some(product);
  Ok(PipelineControl::Continue)
}

/// Finds the shopper by (store, email) or creates them. Name, phone and the
/// shipping address are refreshed when supplied.
#[instrument(name = "checkout::upsert_customer", skip_all, err(Display))]
pub async fn upsert_customer<T: CheckoutData>(ctx_data: ContextData<T>) -> AppResult<PipelineControl> {
  let (store, store_id, info, address) = {
    let guard = ctx_data.read();
    let checkout = guard.checkout();
    (
      guard.services().store.clone(),
      checkout.store_id,
      checkout.customer_info.clone(),
      checkout.shipping_address.clone(),
    )
  };

  let email = info.email.trim().to_lowercase();
  if email.is_empty() {
    return Err(AppError::Validation("Email du client requis".to_string()));
  }

  let existing = store.find_customer(store_id, &email).await?;
  let customer = match existing {
    Some(mut customer) => {
      let mut changed = false;
      if info.name.is_some() && info.name != customer.name {
        customer.name = info.name.clone();
        changed = true;
      }
      if info.phone.is_some() && info.phone != customer.phone {
        customer.phone = info.phone.clone();
        changed = true;
      }
      if let Some(address) = address {
        if customer.address.as_ref().map(|a| &a.0) != Some(&address) {
          customer.address = Some(Json(address));
          changed = true;
        }
      }
      if changed {
        store.update_customer(&customer).await?
      } else {
        customer
      }
    }
    None => {
      let customer = Customer {
        id: Uuid::new_v4(),
        store_id,
        email,
        name: info.name.clone(),
        phone: info.phone.clone(),
        address: address.map(Json),
        created_at: Utc::now(),
      };
      info!(customer_id = %customer.id, "Creating customer.");
      store.insert_customer(&customer).await?
    }
  };

  ctx_data.write().checkout_mut().customer = Some(customer);
  Ok(PipelineControl::Continue)
}

/// Server-side order number, or `ORD-<millis>` when the store produced none.
#[instrument(name = "checkout::assign_order_number", skip_all)]
pub async fn assign_order_number<T: CheckoutData>(ctx_data: ContextData<T>) -> AppResult<PipelineControl> {
  let store = ctx_data.read().services().store.clone();
  let generated = store.generate_order_number().await;
  let order_number = match generated {
    Ok(Some(number)) => number,
    Ok(None) => format!("ORD-{}", Utc::now().timestamp_millis()),
    Err(e) => {
      warn!(error = %e, "Order number generation failed, using a timestamp.");
      format!("ORD-{}", Utc::now().timestamp_millis())
    }
  };
  ctx_data.write().checkout_mut().order_number = Some(order_number);
  Ok(PipelineControl::Continue)
}

/// Persists the order from the amounts settled by the pricing step.
#[instrument(name = "checkout::insert_order", skip_all, err(Display))]
pub async fn insert_order<T: CheckoutData>(ctx_data: ContextData<T>) -> AppResult<PipelineControl> {
  let (store, order) = {
    let guard = ctx_data.read();
    let checkout = guard.checkout();
    let customer = checkout.customer.as_ref().ok_or_else(|| missing("customer"))?;
    let split = checkout.split.unwrap_or_else(|| PaymentSplit::full(checkout.order_total));
    let order = Order {
      id: Uuid::new_v4(),
      store_id: checkout.store_id,
      customer_id: customer.id,
      order_number: checkout.order_number.clone().ok_or_else(|| missing("order number"))?,
      total_amount: checkout.order_total,
      currency: checkout.currency.clone(),
      status: OrderStatus::Pending,
      payment_status: PaymentStatus::Pending,
      payment_type: split.payment_type,
      percentage_paid: split.percentage_paid,
      remaining_amount: split.remaining_amount,
      delivery_status: checkout.delivery_status,
      affiliate_tracking_cookie: checkout.affiliate_tracking_cookie.clone(),
      created_at: Utc::now(),
    };
    (guard.services().store.clone(), order)
  };

  let order = store.insert_order(&order).await?;
  info!(order_id = %order.id, order_number = %order.order_number, total = order.total_amount, "Order created.");
  ctx_data.write().checkout_mut().order = Some(order);
  Ok(PipelineControl::Continue)
}

/// Compensation for `insert_order`.
pub async fn cancel_order<T: CheckoutData>(ctx_data: ContextData<T>) -> AppResult<()> {
  let (store, order_id) = {
    let guard = ctx_data.read();
    (guard.services().store.clone(), guard.checkout().order_id())
  };
  if let Some(order_id) = order_id {
    store.update_order_status(order_id, OrderStatus::Cancelled).await?;
    info!(%order_id, "Order cancelled.");
  }
  Ok(())
}

/// What has to happen before an escrowed payment is released to the seller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseTrigger {
  DeliveryConfirmed,
  ServiceCompleted,
}

/// Holds the whole order amount in escrow (`delivery_secured` payments).
#[instrument(name = "checkout::secure_payment", skip(ctx_data), err(Display))]
pub async fn secure_payment<T: CheckoutData>(
  ctx_data: ContextData<T>,
  trigger: ReleaseTrigger,
) -> AppResult<PipelineControl> {
  let (store, payment) = {
    let guard = ctx_data.read();
    let order = guard.checkout().order.as_ref().ok_or_else(|| missing("order"))?;
    let payment = SecuredPayment {
      id: Uuid::new_v4(),
      order_id: order.id,
      total_amount: order.total_amount,
      held_amount: order.total_amount,
      status: SecuredPaymentStatus::Held,
      release_conditions: Json(ReleaseConditions {
        requires_delivery_confirmation: trigger == ReleaseTrigger::DeliveryConfirmed,
        requires_service_completion: trigger == ReleaseTrigger::ServiceCompleted,
        auto_release_days: guard.services().settings.escrow_auto_release_days,
      }),
      created_at: Utc::now(),
    };
    (guard.services().store.clone(), payment)
  };
  let payment = store.insert_secured_payment(&payment).await?;
  info!(secured_payment_id = %payment.id, held = payment.held_amount, "Payment held in escrow.");
  Ok(PipelineControl::Continue)
}

/// Redeems the portion of the gift card actually applied to this order.
#[instrument(name = "checkout::redeem_gift_card", skip_all, err(Display))]
pub async fn redeem_gift_card<T: CheckoutData>(ctx_data: ContextData<T>) -> AppResult<PipelineControl> {
  let (store, gift_card, order_id, applied) = {
    let guard = ctx_data.read();
    let checkout = guard.checkout();
    let amount_to_pay = checkout.split.map(|s| s.amount_to_pay).unwrap_or(checkout.order_total);
    (
      guard.services().store.clone(),
      checkout.gift_card,
      checkout.order_id().ok_or_else(|| missing("order"))?,
      amount_to_pay - checkout.final_amount,
    )
  };
  let gift_card = match gift_card {
    Some(g) if applied > 0 => g,
    _ => return Ok(PipelineControl::Continue),
  };

  let outcome = store.redeem_gift_card(gift_card.id, order_id, applied).await?;
  if !outcome.success {
    return Err(AppError::Validation(
      outcome
        .message
        .unwrap_or_else(|| "Échec de l'utilisation de la carte cadeau".to_string()),
    ));
  }
  info!(gift_card_id = %gift_card.id, amount = applied, "Gift card redeemed.");
  ctx_data.write().checkout_mut().gift_card_applied = applied;
  Ok(PipelineControl::Continue)
}

#[instrument(name = "checkout::create_invoice", skip_all, err(Display))]
pub async fn create_invoice<T: CheckoutData>(ctx_data: ContextData<T>) -> AppResult<PipelineControl> {
  let (store, order_id) = {
    let guard = ctx_data.read();
    (
      guard.services().store.clone(),
      guard.checkout().order_id().ok_or_else(|| missing("order"))?,
    )
  };
  let invoice_id = store.create_invoice_from_order(order_id).await?;
  ctx_data.write().checkout_mut().invoice_id = invoice_id;
  Ok(PipelineControl::Continue)
}

/// Queues the `order.created` webhook; never waits for delivery.
pub async fn notify_order_created<T: CheckoutData>(ctx_data: ContextData<T>) -> AppResult<PipelineControl> {
  let guard = ctx_data.read();
  let order = guard.checkout().order.as_ref().ok_or_else(|| missing("order"))?;
  guard.services().webhooks.order_created(order);
  Ok(PipelineControl::Continue)
}

/// Opens the gateway session for the amount due now and records the
/// confirmation returned to the shopper.
#[instrument(name = "checkout::initiate_payment", skip_all, err(Display))]
pub async fn initiate_payment<T: CheckoutData>(ctx_data: ContextData<T>) -> AppResult<PipelineControl> {
  let (payments, request) = {
    let guard = ctx_data.read();
    let checkout = guard.checkout();
    let order = checkout.order.as_ref().ok_or_else(|| missing("order"))?;
    let customer = checkout.customer.as_ref().ok_or_else(|| missing("customer"))?;
    let product = checkout.product.as_ref().ok_or_else(|| missing("product"))?;

    let mut metadata = checkout.payment_metadata.clone();
    metadata.insert("product_type".into(), Value::from(product.product_type.as_str()));
    metadata.insert("order_number".into(), Value::from(order.order_number.clone()));
    metadata.insert("quantity".into(), Value::from(checkout.quantity));
    if let Some(split) = checkout.split {
      metadata.insert("payment_type".into(), serde_json::to_value(split.payment_type).unwrap_or(Value::Null));
      metadata.insert("remaining_amount".into(), Value::from(split.remaining_amount));
    }
    if let Some(cookie) = &checkout.affiliate_tracking_cookie {
      metadata.insert("affiliate_tracking_cookie".into(), Value::from(cookie.clone()));
    }

    let request = PaymentRequest {
      store_id: checkout.store_id,
      product_id: product.id,
      order_id: order.id,
      customer_id: customer.id,
      amount: checkout.final_amount,
      currency: checkout.currency.clone(),
      description: format!("Commande {} - {}", order.order_number, product.name),
      customer_email: customer.email.clone(),
      customer_name: customer.name.clone(),
      customer_phone: customer.phone.clone(),
      metadata: Value::Object(metadata),
    };
    (guard.services().payments.clone(), request)
  };

  let session = match payments.initiate_payment(&request).await {
    Ok(session) => session,
    Err(e) => {
      warn!(error = %e, order_id = %request.order_id, "Payment gateway call failed.");
      return Err(AppError::payment_init_failed());
    }
  };
  let checkout_url = match session.checkout_url.filter(|url| !url.is_empty()) {
    Some(url) if session.success => url,
    _ => return Err(AppError::payment_init_failed()),
  };

  let mut guard = ctx_data.write();
  let checkout = guard.checkout_mut();
  let order = checkout.order.as_ref().ok_or_else(|| missing("order"))?;
  let item = checkout.order_item.as_ref().ok_or_else(|| missing("order item"))?;
  let product_type = checkout
    .product
    .as_ref()
    .map(|p| p.product_type)
    .unwrap_or(ProductType::Generic);
  let (license_id, license_key, inventory_id, booking_id) = match &checkout.reservation {
    Reservation::None => (None, None, None, None),
    Reservation::License { id, key } => (Some(*id), Some(key.clone()), None, None),
    Reservation::Inventory { id, .. } => (None, None, Some(*id), None),
    Reservation::Booking { id } => (None, None, None, Some(*id)),
  };
  let confirmation = OrderConfirmation {
    order_id: order.id,
    order_item_id: item.id,
    order_number: order.order_number.clone(),
    product_type,
    checkout_url,
    transaction_id: session.transaction_id,
    amount_to_pay: checkout.final_amount,
    remaining_amount: order.remaining_amount,
    currency: checkout.currency.clone(),
    license_id,
    license_key,
    inventory_id,
    booking_id,
  };
  info!(order_id = %confirmation.order_id, "Payment session opened.");
  checkout.confirmation = Some(confirmation);
  Ok(PipelineControl::Continue)
}
