// payhula-storefront/src/pipelines/service_order.rs

//! Service checkout: capacity, staff and slot checks, then a booking held as
//! `pending` until payment. A failure after the booking is written marks it
//! `cancelled` (it is never deleted) and cancels the order if there is one.

use crate::errors::{AppError, Result as AppResult};
use crate::models::{Booking, BookingStatus, OrderItem, PaymentType, ProductType};
use crate::pipelines::common_steps::{self, amount_out_of_range, missing, ReleaseTrigger};
use crate::pipelines::contexts::{Reservation, ServiceOrderData};
use crate::services::pricing::{apply_gift_card, service_price, split_payment};
use chrono::{Duration, Utc};
use payhula_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

pub fn service_order_pipeline() -> Pipeline<ServiceOrderData, AppError> {
  let mut p = Pipeline::<ServiceOrderData, AppError>::new(&[
    ("load_product", false, None),
    ("load_service", false, None),
    ("check_capacity", false, None),
    (
      "check_staff",
      false,
      Some(Arc::new(|ctx: ContextData<ServiceOrderData>| ctx.read().request.staff_id.is_none())),
    ),
    (
      "check_slot",
      false,
      Some(Arc::new(|ctx: ContextData<ServiceOrderData>| {
        !ctx.read().services.settings.reject_conflicting_bookings
      })),
    ),
    ("upsert_customer", false, None),
    ("create_booking", false, None),
    ("price_order", false, None),
    ("assign_order_number", false, None),
    ("insert_order", false, None),
    (
      "secure_payment",
      false,
      Some(Arc::new(|ctx: ContextData<ServiceOrderData>| {
        ctx.read().checkout.split.map(|s| s.payment_type) != Some(PaymentType::DeliverySecured)
      })),
    ),
    (
      "redeem_gift_card",
      true,
      Some(Arc::new(|ctx: ContextData<ServiceOrderData>| ctx.read().checkout.gift_card.is_none())),
    ),
    ("create_invoice", true, None),
    ("notify_order_created", true, None),
    ("notify_booking_created", true, None),
    ("insert_order_item", false, None),
    ("initiate_payment", false, None),
  ]);

  p.on_root("load_product", common_steps::load_product::<ServiceOrderData>);
  p.on_root("load_service", load_service);
  p.on_root("check_capacity", check_capacity);
  p.on_root("check_staff", check_staff);
  p.on_root("check_slot", check_slot);
  p.on_root("upsert_customer", common_steps::upsert_customer::<ServiceOrderData>);
  p.on_root("create_booking", create_booking);
  p.compensate_root("create_booking", cancel_booking);
  p.on_root("price_order", price_order);
  p.on_root("assign_order_number", common_steps::assign_order_number::<ServiceOrderData>);
  p.on_root("insert_order", common_steps::insert_order::<ServiceOrderData>);
  p.compensate_root("insert_order", common_steps::cancel_order::<ServiceOrderData>);
  p.on_root("secure_payment", |ctx: ContextData<ServiceOrderData>| {
    common_steps::secure_payment(ctx, ReleaseTrigger::ServiceCompleted)
  });
  p.on_root("redeem_gift_card", common_steps::redeem_gift_card::<ServiceOrderData>);
  p.on_root("create_invoice", common_steps::create_invoice::<ServiceOrderData>);
  p.on_root("notify_order_created", common_steps::notify_order_created::<ServiceOrderData>);
  p.on_root("notify_booking_created", notify_booking_created);
  p.on_root("insert_order_item", insert_order_item);
  p.on_root("initiate_payment", common_steps::initiate_payment::<ServiceOrderData>);
  p
}

pub fn register_service_order_pipeline(registry: &FlowRegistry<AppError>) {
  registry.register_pipeline(service_order_pipeline());
  tracing::info!("'service_order' pipeline registered.");
}

/// Loads the service and fixes the booking window.
async fn load_service(ctx_data: ContextData<ServiceOrderData>) -> AppResult<PipelineControl> {
  let (store, service_product_id, product_id) = {
    let guard = ctx_data.read();
    (
      guard.services.store.clone(),
      guard.request.service_product_id,
      guard.checkout.product_id,
    )
  };
  let service = store
    .find_service_product(service_product_id)
    .await?
    .filter(|s| s.product_id == product_id)
    .ok_or_else(|| AppError::NotFound("Service non trouvé".to_string()))?;

  let mut guard = ctx_data.write();
  let duration = guard
    .request
    .duration_minutes
    .filter(|m| *m > 0)
    .unwrap_or(service.duration_minutes);
  let start = guard.request.booking_start;
  guard.booking_end = Some(start + Duration::minutes(i64::from(duration)));
  guard.service = Some(service);
  Ok(PipelineControl::Continue)
}

async fn check_capacity(ctx_data: ContextData<ServiceOrderData>) -> AppResult<PipelineControl> {
  let guard = ctx_data.read();
  let service = guard.service.as_ref().ok_or_else(|| missing("service"))?;
  let participants = guard.request.number_of_participants;
  if participants < 1 {
    return Err(AppError::Validation("Nombre de participants invalide".to_string()));
  }
  if service.max_participants > 0 && participants > service.max_participants {
    return Err(AppError::Validation("Nombre maximum de participants dépassé".to_string()));
  }
  Ok(PipelineControl::Continue)
}

async fn check_staff(ctx_data: ContextData<ServiceOrderData>) -> AppResult<PipelineControl> {
  let (store, service_id, staff_id) = {
    let guard = ctx_data.read();
    (
      guard.services.store.clone(),
      guard.service.as_ref().map(|s| s.id).ok_or_else(|| missing("service"))?,
      guard.request.staff_id.ok_or_else(|| missing("staff id"))?,
    )
  };
  let staff = store
    .find_active_staff(service_id, staff_id)
    .await?
    .ok_or_else(|| AppError::NotFound("Membre du personnel non trouvé".to_string()))?;
  ctx_data.write().staff = Some(staff);
  Ok(PipelineControl::Continue)
}

/// Rejects a window overlapping an active booking (of the same staff member
/// when one was requested).
#[instrument(name = "service_order::check_slot", skip_all, err(Display))]
async fn check_slot(ctx_data: ContextData<ServiceOrderData>) -> AppResult<PipelineControl> {
  let (store, service_id, staff_id, start, end) = {
    let guard = ctx_data.read();
    (
      guard.services.store.clone(),
      guard.service.as_ref().map(|s| s.id).ok_or_else(|| missing("service"))?,
      guard.request.staff_id,
      guard.request.booking_start,
      guard.booking_end.ok_or_else(|| missing("booking end"))?,
    )
  };
  let conflicts = store.list_overlapping_bookings(service_id, staff_id, start, end).await?;
  if !conflicts.is_empty() {
    info!(conflicts = conflicts.len(), "Requested slot is taken.");
    return Err(AppError::Conflict("Créneau horaire non disponible".to_string()));
  }
  Ok(PipelineControl::Continue)
}

#[instrument(name = "service_order::create_booking", skip_all, err(Display))]
async fn create_booking(ctx_data: ContextData<ServiceOrderData>) -> AppResult<PipelineControl> {
  let (store, booking) = {
    let guard = ctx_data.read();
    let service = guard.service.as_ref().ok_or_else(|| missing("service"))?;
    let customer = guard.checkout.customer.as_ref().ok_or_else(|| missing("customer"))?;
    let booking = Booking {
      id: Uuid::new_v4(),
      service_id: service.id,
      customer_id: customer.id,
      staff_id: guard.request.staff_id,
      start_time: guard.request.booking_start,
      end_time: guard.booking_end.ok_or_else(|| missing("booking end"))?,
      status: BookingStatus::Pending,
      number_of_participants: guard.request.number_of_participants,
      customer_notes: guard.request.notes.clone(),
      created_at: Utc::now(),
    };
    (guard.services.store.clone(), booking)
  };

  let booking = store.insert_booking(&booking).await?;
  info!(booking_id = %booking.id, start = %booking.start_time, "Booking created.");

  let mut guard = ctx_data.write();
  guard.checkout.reservation = Reservation::Booking { id: booking.id };
  guard
    .checkout
    .payment_metadata
    .insert("booking_id".into(), Value::from(booking.id.to_string()));
  guard.booking = Some(booking);
  Ok(PipelineControl::Continue)
}

async fn cancel_booking(ctx_data: ContextData<ServiceOrderData>) -> AppResult<()> {
  let (store, booking_id) = {
    let guard = ctx_data.read();
    (guard.services.store.clone(), guard.booking.as_ref().map(|b| b.id))
  };
  if let Some(booking_id) = booking_id {
    store.update_booking_status(booking_id, BookingStatus::Cancelled).await?;
    info!(%booking_id, "Booking cancelled.");
  }
  Ok(())
}

/// Price from the service's pricing type, then the payment split and gift card.
async fn price_order(ctx_data: ContextData<ServiceOrderData>) -> AppResult<PipelineControl> {
  let mut guard = ctx_data.write();
  let product = guard.checkout.product.clone().ok_or_else(|| missing("product"))?;
  let (pricing_type, default_duration) = guard
    .service
    .as_ref()
    .map(|s| (s.pricing_type, s.duration_minutes))
    .ok_or_else(|| missing("service"))?;
  let duration = guard
    .request
    .duration_minutes
    .filter(|m| *m > 0)
    .unwrap_or(default_duration);
  let participants = guard.request.number_of_participants;
  let default_rate = guard.services.settings.default_percentage_rate;

  let total = service_price(product.base_price(), pricing_type, participants, duration).ok_or_else(amount_out_of_range)?;
  let split = split_payment(total, &product.payment_options(), default_rate);

  let checkout = &mut guard.checkout;
  checkout.unit_price = total;
  checkout.order_total = total;
  checkout.final_amount = apply_gift_card(split.amount_to_pay, checkout.gift_card.map(|g| g.amount));
  checkout.split = Some(split);
  Ok(PipelineControl::Continue)
}

async fn notify_booking_created(ctx_data: ContextData<ServiceOrderData>) -> AppResult<PipelineControl> {
  let guard = ctx_data.read();
  let booking = guard.booking.as_ref().ok_or_else(|| missing("booking"))?;
  guard.services.webhooks.service_booking_created(booking, guard.checkout.store_id);
  Ok(PipelineControl::Continue)
}

async fn insert_order_item(ctx_data: ContextData<ServiceOrderData>) -> AppResult<PipelineControl> {
  let (store, item) = {
    let guard = ctx_data.read();
    let order = guard.checkout.order.as_ref().ok_or_else(|| missing("order"))?;
    let service = guard.service.as_ref().ok_or_else(|| missing("service"))?;
    let booking = guard.booking.as_ref().ok_or_else(|| missing("booking"))?;

    let mut item = OrderItem::line(
      order.id,
      guard.checkout.product_id,
      ProductType::Service,
      1,
      guard.checkout.unit_price,
      guard.checkout.unit_price,
    );
    item.service_product_id = Some(service.id);
    item.booking_id = Some(booking.id);
    item.item_metadata.0 = json!({
      "booking_start": booking.start_time,
      "booking_end": booking.end_time,
      "duration_minutes": (booking.end_time - booking.start_time).num_minutes(),
      "number_of_participants": booking.number_of_participants,
      "staff_id": booking.staff_id,
      "staff_name": guard.staff.as_ref().map(|s| s.name.clone()),
      "notes": booking.customer_notes,
    });
    (guard.services.store.clone(), item)
  };

  let item = store.insert_order_item(&item).await?;
  ctx_data.write().checkout.order_item = Some(item);
  Ok(PipelineControl::Continue)
}
