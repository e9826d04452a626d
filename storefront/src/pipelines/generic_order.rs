// payhula-storefront/src/pipelines/generic_order.rs

//! Checkout for courses and untyped products: no license, stock or booking,
//! so nothing to undo.

use crate::errors::{AppError, Result as AppResult};
use crate::models::OrderItem;
use crate::pipelines::common_steps::{self, amount_out_of_range, missing};
use crate::pipelines::contexts::GenericOrderData;
use crate::services::pricing::{apply_gift_card, line_total, PaymentSplit};
use payhula_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl};
use std::sync::Arc;

pub fn generic_order_pipeline() -> Pipeline<GenericOrderData, AppError> {
  let mut p = Pipeline::<GenericOrderData, AppError>::new(&[
    ("load_product", false, None),
    ("upsert_customer", false, None),
    ("price_order", false, None),
    ("assign_order_number", false, None),
    ("insert_order", false, None),
    (
      "redeem_gift_card",
      true,
      Some(Arc::new(|ctx: ContextData<GenericOrderData>| ctx.read().checkout.gift_card.is_none())),
    ),
    ("create_invoice", true, None),
    ("notify_order_created", true, None),
    ("insert_order_item", false, None),
    ("initiate_payment", false, None),
  ]);

  p.on_root("load_product", common_steps::load_product::<GenericOrderData>);
  p.on_root("upsert_customer", common_steps::upsert_customer::<GenericOrderData>);
  p.on_root("price_order", price_order);
  p.on_root("assign_order_number", common_steps::assign_order_number::<GenericOrderData>);
  p.on_root("insert_order", common_steps::insert_order::<GenericOrderData>);
  p.on_root("redeem_gift_card", common_steps::redeem_gift_card::<GenericOrderData>);
  p.on_root("create_invoice", common_steps::create_invoice::<GenericOrderData>);
  p.on_root("notify_order_created", common_steps::notify_order_created::<GenericOrderData>);
  p.on_root("insert_order_item", insert_order_item);
  p.on_root("initiate_payment", common_steps::initiate_payment::<GenericOrderData>);
  p
}

pub fn register_generic_order_pipeline(registry: &FlowRegistry<AppError>) {
  registry.register_pipeline(generic_order_pipeline());
  tracing::info!("'generic_order' pipeline registered.");
}

async fn price_order(ctx_data: ContextData<GenericOrderData>) -> AppResult<PipelineControl> {
  let mut guard = ctx_data.write();
  let quantity = guard.checkout.quantity;
  if quantity < 1 {
    return Err(AppError::Validation("Quantité invalide".to_string()));
  }
  let checkout = &mut guard.checkout;
  let unit_price = checkout
    .product
    .as_ref()
    .map(|p| p.base_price())
    .ok_or_else(|| missing("product"))?;
  let total = line_total(unit_price, quantity).ok_or_else(amount_out_of_range)?;
  checkout.unit_price = unit_price;
  checkout.order_total = total;
  checkout.split = Some(PaymentSplit::full(total));
  checkout.final_amount = apply_gift_card(total, checkout.gift_card.map(|g| g.amount));
  Ok(PipelineControl::Continue)
}

async fn insert_order_item(ctx_data: ContextData<GenericOrderData>) -> AppResult<PipelineControl> {
  let (store, item) = {
    let guard = ctx_data.read();
    let checkout = &guard.checkout;
    let order = checkout.order.as_ref().ok_or_else(|| missing("order"))?;
    let product = checkout.product.as_ref().ok_or_else(|| missing("product"))?;
    let item = OrderItem::line(
      order.id,
      product.id,
      product.product_type,
      checkout.quantity,
      checkout.unit_price,
      checkout.order_total,
    );
    (guard.services.store.clone(), item)
  };

  let item = store.insert_order_item(&item).await?;
  ctx_data.write().checkout.order_item = Some(item);
  Ok(PipelineControl::Continue)
}
