// payhula-storefront/src/pipelines/physical_order.rs

//! Physical product checkout: variant pricing, stock reservation, shipping.
//!
//! Stock is reserved before the customer and the order are written. A failure
//! after that point releases exactly the reserved quantity and cancels the
//! order if one was created.

use crate::errors::{AppError, Result as AppResult};
use crate::models::{OrderItem, PaymentType, ProductType};
use crate::pipelines::common_steps::{self, amount_out_of_range, missing, ReleaseTrigger};
use crate::pipelines::contexts::{PhysicalOrderData, Reservation};
use crate::services::pricing::{apply_gift_card, line_total, split_payment};
use payhula_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub fn physical_order_pipeline() -> Pipeline<PhysicalOrderData, AppError> {
  let mut p = Pipeline::<PhysicalOrderData, AppError>::new(&[
    ("load_product", false, None),
    ("load_physical_product", false, None),
    (
      "check_variant",
      false,
      Some(Arc::new(|ctx: ContextData<PhysicalOrderData>| ctx.read().request.variant_id.is_none())),
    ),
    ("price_order", false, None),
    ("reserve_inventory", false, None),
    ("upsert_customer", false, None),
    ("assign_order_number", false, None),
    ("insert_order", false, None),
    (
      "secure_payment",
      false,
      Some(Arc::new(|ctx: ContextData<PhysicalOrderData>| {
        ctx.read().checkout.split.map(|s| s.payment_type) != Some(PaymentType::DeliverySecured)
      })),
    ),
    (
      "redeem_gift_card",
      true,
      Some(Arc::new(|ctx: ContextData<PhysicalOrderData>| ctx.read().checkout.gift_card.is_none())),
    ),
    ("create_invoice", true, None),
    ("notify_order_created", true, None),
    ("insert_order_item", false, None),
    ("initiate_payment", false, None),
  ]);

  p.on_root("load_product", common_steps::load_product::<PhysicalOrderData>);
  p.on_root("load_physical_product", load_physical_product);
  p.on_root("check_variant", check_variant);
  p.on_root("price_order", price_order);
  p.on_root("reserve_inventory", reserve_inventory);
  p.compensate_root("reserve_inventory", release_inventory);
  p.on_root("upsert_customer", common_steps::upsert_customer::<PhysicalOrderData>);
  p.on_root("assign_order_number", common_steps::assign_order_number::<PhysicalOrderData>);
  p.on_root("insert_order", common_steps::insert_order::<PhysicalOrderData>);
  p.compensate_root("insert_order", common_steps::cancel_order::<PhysicalOrderData>);
  p.on_root("secure_payment", |ctx: ContextData<PhysicalOrderData>| {
    common_steps::secure_payment(ctx, ReleaseTrigger::DeliveryConfirmed)
  });
  p.on_root("redeem_gift_card", common_steps::redeem_gift_card::<PhysicalOrderData>);
  p.on_root("create_invoice", common_steps::create_invoice::<PhysicalOrderData>);
  p.on_root("notify_order_created", common_steps::notify_order_created::<PhysicalOrderData>);
  p.on_root("insert_order_item", insert_order_item);
  p.on_root("initiate_payment", common_steps::initiate_payment::<PhysicalOrderData>);
  p
}

pub fn register_physical_order_pipeline(registry: &FlowRegistry<AppError>) {
  registry.register_pipeline(physical_order_pipeline());
  tracing::info!("'physical_order' pipeline registered.");
}

async fn load_physical_product(ctx_data: ContextData<PhysicalOrderData>) -> AppResult<PipelineControl> {
  let (store, physical_product_id, product_id) = {
    let guard = ctx_data.read();
    (
      guard.services.store.clone(),
      guard.request.physical_product_id,
      guard.checkout.product_id,
    )
  };
  let physical = store
    .find_physical_product(physical_product_id)
    .await?
    .filter(|p| p.product_id == product_id)
    .ok_or_else(|| AppError::NotFound("Produit physique non trouvé".to_string()))?;
  ctx_data.write().physical_product = Some(physical);
  Ok(PipelineControl::Continue)
}

async fn check_variant(ctx_data: ContextData<PhysicalOrderData>) -> AppResult<PipelineControl> {
  let (store, variant_id, physical_product_id) = {
    let guard = ctx_data.read();
    (
      guard.services.store.clone(),
      guard.request.variant_id.ok_or_else(|| missing("variant id"))?,
      guard.request.physical_product_id,
    )
  };
  let variant = store
    .find_variant(variant_id)
    .await?
    .filter(|v| v.physical_product_id == physical_product_id)
    .ok_or_else(|| AppError::NotFound("Variante non trouvée".to_string()))?;
  if !variant.is_available {
    return Err(AppError::Validation("Variante non disponible".to_string()));
  }
  ctx_data.write().variant = Some(variant);
  Ok(PipelineControl::Continue)
}

/// `(base + variant adjustment) * quantity`, split by the product's payment
/// options, then the gift card.
async fn price_order(ctx_data: ContextData<PhysicalOrderData>) -> AppResult<PipelineControl> {
  let mut guard = ctx_data.write();
  let quantity = guard.request.quantity;
  if quantity < 1 {
    return Err(AppError::Validation("Quantité invalide".to_string()));
  }
  let product = guard.checkout.product.clone().ok_or_else(|| missing("product"))?;
  let adjustment = guard.variant.as_ref().map(|v| v.price_adjustment).unwrap_or(0);
  let default_rate = guard.services.settings.default_percentage_rate;

  let unit_price = product
    .base_price()
    .checked_add(adjustment)
    .ok_or_else(amount_out_of_range)?
    .max(0);
  let total = line_total(unit_price, quantity).ok_or_else(amount_out_of_range)?;
  let split = split_payment(total, &product.payment_options(), default_rate);

  let checkout = &mut guard.checkout;
  checkout.unit_price = unit_price;
  checkout.order_total = total;
  checkout.final_amount = apply_gift_card(split.amount_to_pay, checkout.gift_card.map(|g| g.amount));
  checkout.split = Some(split);
  Ok(PipelineControl::Continue)
}

/// Reserves `quantity` units at the requested location, or at the first
/// tracked location (most stock first) whose guarded reservation succeeds.
#[instrument(name = "physical_order::reserve_inventory", skip_all, err(Display))]
async fn reserve_inventory(ctx_data: ContextData<PhysicalOrderData>) -> AppResult<PipelineControl> {
  let (store, physical_product_id, quantity, requested_location) = {
    let guard = ctx_data.read();
    (
      guard.services.store.clone(),
      guard.request.physical_product_id,
      guard.request.quantity,
      guard.request.inventory_id,
    )
  };

  let candidates: Vec<_> = store
    .list_tracked_inventory(physical_product_id)
    .await?
    .into_iter()
    .filter(|r| requested_location.map_or(true, |id| r.id == id))
    .filter(|r| r.quantity_available >= quantity)
    .collect();

  let mut reserved = None;
  for candidate in candidates {
    match store.reserve_inventory(candidate.id, quantity).await? {
      Some(updated) => {
        reserved = Some(updated);
        break;
      }
      None => warn!(inventory_id = %candidate.id, "Location lost its stock before the reservation, trying the next."),
    }
  }
  let record = reserved.ok_or_else(AppError::insufficient_stock)?;
  info!(inventory_id = %record.id, quantity, reserved = record.quantity_reserved, "Stock reserved.");

  let mut guard = ctx_data.write();
  guard.checkout.reservation = Reservation::Inventory {
    id: record.id,
    quantity,
  };
  guard
    .checkout
    .payment_metadata
    .insert("inventory_id".into(), Value::from(record.id.to_string()));
  guard.inventory = Some(record);
  Ok(PipelineControl::Continue)
}

async fn release_inventory(ctx_data: ContextData<PhysicalOrderData>) -> AppResult<()> {
  let (store, reservation) = {
    let guard = ctx_data.read();
    (guard.services.store.clone(), guard.checkout.reservation.clone())
  };
  if let Reservation::Inventory { id, quantity } = reservation {
    store.release_inventory(id, quantity).await?;
    info!(inventory_id = %id, quantity, "Stock reservation released.");
  }
  Ok(())
}

async fn insert_order_item(ctx_data: ContextData<PhysicalOrderData>) -> AppResult<PipelineControl> {
  let (store, item) = {
    let guard = ctx_data.read();
    let order = guard.checkout.order.as_ref().ok_or_else(|| missing("order"))?;
    let physical = guard.physical_product.as_ref().ok_or_else(|| missing("physical product"))?;
    let inventory = guard.inventory.as_ref().ok_or_else(|| missing("inventory"))?;

    let mut item = OrderItem::line(
      order.id,
      guard.checkout.product_id,
      ProductType::Physical,
      guard.request.quantity,
      guard.checkout.unit_price,
      guard.checkout.order_total,
    );
    item.physical_product_id = Some(physical.id);
    item.variant_id = guard.variant.as_ref().map(|v| v.id);
    item.item_metadata.0 = json!({
      "shipping_address": guard.checkout.shipping_address,
      "inventory_id": inventory.id,
      "variant_id": item.variant_id,
      "variant_name": guard.variant.as_ref().map(|v| v.name.clone()),
      "location": inventory.location,
    });
    (guard.services.store.clone(), item)
  };

  let item = store.insert_order_item(&item).await?;
  ctx_data.write().checkout.order_item = Some(item);
  Ok(PipelineControl::Continue)
}
