// payhula-storefront/src/pipelines/digital_order.rs

//! Digital product checkout: optional license issue, full payment.
//!
//! The license is issued before the order exists. If a later step fails it
//! is revoked only when `revoke_license_on_failure` is set; the order itself
//! is never cancelled by this workflow.

use crate::errors::{AppError, Result as AppResult};
use crate::config::CheckoutSettings;
use crate::models::{DigitalProduct, License, LicenseStatus, LicenseType, OrderItem, ProductType};
use crate::pipelines::common_steps::{self, missing};
use crate::pipelines::contexts::{DigitalOrderData, DigitalOrderRequest, Reservation};
use crate::services::license_keys::generate_license_key;
use crate::services::pricing::{apply_gift_card, PaymentSplit};
use chrono::{DateTime, Duration, Utc};
use payhula_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Longest license lifetime a checkout may ask for.
pub const MAX_LICENSE_EXPIRY_DAYS: i64 = 36_500;

pub fn digital_order_pipeline() -> Pipeline<DigitalOrderData, AppError> {
  let mut p = Pipeline::<DigitalOrderData, AppError>::new(&[
    ("load_product", false, None),
    ("load_digital_product", false, None),
    ("upsert_customer", false, None),
    (
      "issue_license",
      false,
      Some(Arc::new(|ctx: ContextData<DigitalOrderData>| !ctx.read().request.generate_license)),
    ),
    ("price_order", false, None),
    ("assign_order_number", false, None),
    ("insert_order", false, None),
    (
      "redeem_gift_card",
      true,
      Some(Arc::new(|ctx: ContextData<DigitalOrderData>| ctx.read().checkout.gift_card.is_none())),
    ),
    ("create_invoice", true, None),
    ("notify_order_created", true, None),
    ("insert_order_item", false, None),
    ("initiate_payment", false, None),
  ]);

  p.on_root("load_product", common_steps::load_product::<DigitalOrderData>);
  p.on_root("load_digital_product", load_digital_product);
  p.on_root("upsert_customer", common_steps::upsert_customer::<DigitalOrderData>);
  p.on_root("issue_license", issue_license);
  p.compensate_root("issue_license", revoke_license);
  p.on_root("price_order", price_order);
  p.on_root("assign_order_number", common_steps::assign_order_number::<DigitalOrderData>);
  p.on_root("insert_order", common_steps::insert_order::<DigitalOrderData>);
  p.on_root("redeem_gift_card", common_steps::redeem_gift_card::<DigitalOrderData>);
  p.on_root("create_invoice", common_steps::create_invoice::<DigitalOrderData>);
  p.on_root("notify_order_created", common_steps::notify_order_created::<DigitalOrderData>);
  p.on_root("insert_order_item", insert_order_item);
  p.on_root("initiate_payment", common_steps::initiate_payment::<DigitalOrderData>);
  p
}

pub fn register_digital_order_pipeline(registry: &FlowRegistry<AppError>) {
  registry.register_pipeline(digital_order_pipeline());
  tracing::info!("'digital_order' pipeline registered.");
}

async fn load_digital_product(ctx_data: ContextData<DigitalOrderData>) -> AppResult<PipelineControl> {
  let (store, digital_product_id, product_id) = {
    let guard = ctx_data.read();
    (
      guard.services.store.clone(),
      guard.request.digital_product_id,
      guard.checkout.product_id,
    )
  };
  let digital = store
    .find_digital_product(digital_product_id)
    .await?
    .filter(|d| d.product_id == product_id)
    .ok_or_else(|| AppError::NotFound("Produit numérique non trouvé".to_string()))?;

  let mut guard = ctx_data.write();
  if guard.request.generate_license {
    license_expiry_days(&guard.request, &digital, &guard.services.settings)?;
  }
  guard.digital_product = Some(digital);
  Ok(PipelineControl::Continue)
}

/// Request value first, then the product's, then the store default.
fn license_expiry_days(
  request: &DigitalOrderRequest,
  digital: &DigitalProduct,
  settings: &CheckoutSettings,
) -> AppResult<Option<i64>> {
  match request.expiry_days.or(digital.license_expiry_days).or(settings.license_expiry_days) {
    Some(days) if !(1..=MAX_LICENSE_EXPIRY_DAYS).contains(&days) => Err(AppError::Validation(format!(
      "Durée de validité de licence invalide: {} jours (1 à {})",
      days, MAX_LICENSE_EXPIRY_DAYS
    ))),
    days => Ok(days),
  }
}

fn license_expires_at(now: DateTime<Utc>, days: i64) -> AppResult<DateTime<Utc>> {
  Duration::try_days(days)
    .and_then(|span| now.checked_add_signed(span))
    .ok_or_else(|| AppError::Validation(format!("Durée de validité de licence invalide: {} jours", days)))
}

/// Issues a `pending` license; it becomes active once payment is confirmed.
#[instrument(name = "digital_order::issue_license", skip_all, err(Display))]
async fn issue_license(ctx_data: ContextData<DigitalOrderData>) -> AppResult<PipelineControl> {
  let (store, license) = {
    let guard = ctx_data.read();
    let digital = guard.digital_product.as_ref().ok_or_else(|| missing("digital product"))?;
    let customer = guard.checkout.customer.as_ref().ok_or_else(|| missing("customer"))?;
    let settings = &guard.services.settings;
    let request = &guard.request;

    let license_type = request.license_type.unwrap_or(digital.license_type);
    let max_activations = match license_type {
      LicenseType::Single => 1,
      LicenseType::Multi => request
        .max_activations
        .or(digital.max_activations)
        .filter(|n| *n > 0)
        .unwrap_or(settings.default_multi_license_activations),
      LicenseType::Unlimited => -1,
    };
    let now = Utc::now();
    let expires_at = license_expiry_days(request, digital, settings)?
      .map(|days| license_expires_at(now, days))
      .transpose()?;
    let license = License {
      id: Uuid::new_v4(),
      digital_product_id: digital.id,
      user_id: customer.id,
      license_key: generate_license_key(),
      license_type,
      max_activations,
      current_activations: 0,
      status: LicenseStatus::Pending,
      expires_at,
      created_at: now,
    };
    (guard.services.store.clone(), license)
  };

  let license = store.insert_license(&license).await?;
  info!(license_id = %license.id, license_type = ?license.license_type, "License issued.");

  let mut guard = ctx_data.write();
  guard.checkout.reservation = Reservation::License {
    id: license.id,
    key: license.license_key.clone(),
  };
  guard
    .checkout
    .payment_metadata
    .insert("license_id".into(), Value::from(license.id.to_string()));
  guard.license = Some(license);
  Ok(PipelineControl::Continue)
}

async fn revoke_license(ctx_data: ContextData<DigitalOrderData>) -> AppResult<()> {
  let (store, enabled, license_id) = {
    let guard = ctx_data.read();
    (
      guard.services.store.clone(),
      guard.services.settings.revoke_license_on_failure,
      guard.license.as_ref().map(|l| l.id),
    )
  };
  match license_id {
    Some(license_id) if enabled => {
      store.update_license_status(license_id, LicenseStatus::Revoked).await?;
      info!(%license_id, "License revoked after a failed checkout.");
    }
    Some(license_id) => info!(%license_id, "Checkout failed; license left in place."),
    None => {}
  }
  Ok(())
}

/// Digital goods are always paid in full; the gift card comes off the price.
async fn price_order(ctx_data: ContextData<DigitalOrderData>) -> AppResult<PipelineControl> {
  let mut guard = ctx_data.write();
  let base = guard
    .checkout
    .product
    .as_ref()
    .map(|p| p.base_price())
    .ok_or_else(|| missing("product"))?;
  let digital_product_id = guard.request.digital_product_id;
  let checkout = &mut guard.checkout;
  let final_amount = apply_gift_card(base, checkout.gift_card.map(|g| g.amount));
  checkout.unit_price = base;
  checkout.split = Some(PaymentSplit::full(base));
  checkout.final_amount = final_amount;
  checkout.order_total = final_amount;
  checkout
    .payment_metadata
    .insert("digital_product_id".into(), Value::from(digital_product_id.to_string()));
  Ok(PipelineControl::Continue)
}

async fn insert_order_item(ctx_data: ContextData<DigitalOrderData>) -> AppResult<PipelineControl> {
  let (store, item) = {
    let guard = ctx_data.read();
    let order = guard.checkout.order.as_ref().ok_or_else(|| missing("order"))?;
    let digital = guard.digital_product.as_ref().ok_or_else(|| missing("digital product"))?;

    let mut item = OrderItem::line(
      order.id,
      guard.checkout.product_id,
      ProductType::Digital,
      1,
      guard.checkout.unit_price,
      guard.checkout.unit_price,
    );
    item.digital_product_id = Some(digital.id);
    item.license_id = guard.license.as_ref().map(|l| l.id);
    item.item_metadata.0 = json!({
      "license_type": guard.license.as_ref().map(|l| l.license_type),
      "license_generated": guard.license.is_some(),
    });
    (guard.services.store.clone(), item)
  };

  let item = store.insert_order_item(&item).await?;
  ctx_data.write().checkout.order_item = Some(item);
  Ok(PipelineControl::Continue)
}
