// payhula-storefront/src/pipelines/dispatcher.rs

//! Places an order for any product: looks up its type, checks the options that
//! type needs, and hands off to the matching workflow as a scoped pipeline.

use crate::errors::{AppError, Result as AppResult};
use crate::models::ProductType;
use crate::pipelines::contexts::{
  DigitalOrderData, DigitalOrderRequest, GenericOrderData, GenericOrderRequest, OrderDispatchData, OrderRoute,
  OrderWorkflowData, PhysicalOrderData, PhysicalOrderRequest, ServiceOrderData, ServiceOrderRequest,
};
use crate::pipelines::{digital_order, generic_order, physical_order, service_order};
use payhula_flow::{ContextData, FlowError, FlowRegistry, Pipeline, PipelineControl};
use std::sync::Arc;
use tracing::{info, instrument};

fn route_mismatch(expected: &str, route: &OrderRoute) -> FlowError {
  FlowError::ExtractorFailure {
    step_name: "delegate".to_string(),
    source: anyhow::anyhow!("expected a {} route, found {}", expected, route.name()),
  }
}

pub fn order_dispatch_pipeline() -> Pipeline<OrderDispatchData, AppError> {
  let mut p = Pipeline::<OrderDispatchData, AppError>::new(&[
    ("load_product", false, None),
    ("resolve_route", false, None),
    ("delegate", false, None),
  ]);

  p.on_root("load_product", load_product);
  p.on_root("resolve_route", resolve_route);

  p.conditional_scopes_for_step("delegate")
    .add_static_scope(
      Arc::new(digital_order::digital_order_pipeline()),
      |ctx: ContextData<OrderDispatchData>| match &ctx.read().route {
        OrderRoute::Digital(sub) => Ok(sub.clone()),
        other => Err(route_mismatch("digital", other)),
      },
    )
    .on_condition(|ctx: ContextData<OrderDispatchData>| matches!(ctx.read().route, OrderRoute::Digital(_)))
    .add_static_scope(
      Arc::new(physical_order::physical_order_pipeline()),
      |ctx: ContextData<OrderDispatchData>| match &ctx.read().route {
        OrderRoute::Physical(sub) => Ok(sub.clone()),
        other => Err(route_mismatch("physical", other)),
      },
    )
    .on_condition(|ctx: ContextData<OrderDispatchData>| matches!(ctx.read().route, OrderRoute::Physical(_)))
    .add_static_scope(
      Arc::new(service_order::service_order_pipeline()),
      |ctx: ContextData<OrderDispatchData>| match &ctx.read().route {
        OrderRoute::Service(sub) => Ok(sub.clone()),
        other => Err(route_mismatch("service", other)),
      },
    )
    .on_condition(|ctx: ContextData<OrderDispatchData>| matches!(ctx.read().route, OrderRoute::Service(_)))
    .add_static_scope(
      Arc::new(generic_order::generic_order_pipeline()),
      |ctx: ContextData<OrderDispatchData>| match &ctx.read().route {
        OrderRoute::Generic(sub) => Ok(sub.clone()),
        other => Err(route_mismatch("generic", other)),
      },
    )
    .on_condition(|ctx: ContextData<OrderDispatchData>| matches!(ctx.read().route, OrderRoute::Generic(_)))
    .require_match()
    .finalize_conditional_step(false);

  p.after_root("delegate", |ctx: ContextData<OrderDispatchData>| {
    Box::pin(async move {
      let route = ctx.read().route.clone();
      let confirmation = match &route {
        OrderRoute::Digital(sub) => sub.write().take_confirmation(),
        OrderRoute::Physical(sub) => sub.write().take_confirmation(),
        OrderRoute::Service(sub) => sub.write().take_confirmation(),
        OrderRoute::Generic(sub) => sub.write().take_confirmation(),
        OrderRoute::Unresolved => None,
      };
      ctx.write().confirmation = confirmation;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  p
}

pub fn register_order_dispatch_pipeline(registry: &FlowRegistry<AppError>) {
  registry.register_pipeline(order_dispatch_pipeline());
  tracing::info!("'order_dispatch' pipeline registered.");
}

async fn load_product(ctx_data: ContextData<OrderDispatchData>) -> AppResult<PipelineControl> {
  let (store, store_id, product_id) = {
    let guard = ctx_data.read();
    (guard.services.store.clone(), guard.request.store_id, guard.request.product_id)
  };
  let product = store
    .find_product(product_id)
    .await?
    .filter(|p| p.store_id == store_id)
    .ok_or_else(AppError::product_not_found)?;
  ctx_data.write().product = Some(product);
  Ok(PipelineControl::Continue)
}

/// Checks the options the product's type requires, finds its type record and
/// builds the specialised workflow's context.
#[instrument(name = "dispatcher::resolve_route", skip_all, err(Display))]
async fn resolve_route(ctx_data: ContextData<OrderDispatchData>) -> AppResult<PipelineControl> {
  let (services, request, product_type) = {
    let guard = ctx_data.read();
    let product_type = guard
      .product
      .as_ref()
      .map(|p| p.product_type)
      .ok_or_else(|| AppError::Internal("product missing from dispatch context".to_string()))?;
    (guard.services.clone(), guard.request.clone(), product_type)
  };
  let store = services.store.clone();

  let route = match product_type {
    ProductType::Digital => {
      let digital = store
        .find_digital_product_by_product(request.product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Produit numérique non trouvé".to_string()))?;
      let sub = DigitalOrderRequest {
        digital_product_id: digital.id,
        product_id: request.product_id,
        store_id: request.store_id,
        customer: request.customer,
        generate_license: request.generate_license.unwrap_or(true),
        license_type: request.license_type,
        max_activations: request.max_activations,
        expiry_days: request.expiry_days,
        gift_card: request.gift_card,
        affiliate_tracking_cookie: request.affiliate_tracking_cookie,
      };
      OrderRoute::Digital(ContextData::new(DigitalOrderData::new(services, sub)))
    }
    ProductType::Physical => {
      let shipping_address = request.shipping_address.ok_or_else(|| {
        AppError::Validation("Adresse de livraison requise pour les produits physiques".to_string())
      })?;
      let physical = store
        .find_physical_product_by_product(request.product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Produit physique non trouvé".to_string()))?;
      let sub = PhysicalOrderRequest {
        physical_product_id: physical.id,
        product_id: request.product_id,
        store_id: request.store_id,
        customer: request.customer,
        shipping_address,
        variant_id: request.variant_id,
        quantity: request.quantity,
        inventory_id: request.inventory_id,
        gift_card: request.gift_card,
        affiliate_tracking_cookie: request.affiliate_tracking_cookie,
      };
      OrderRoute::Physical(ContextData::new(PhysicalOrderData::new(services, sub)))
    }
    ProductType::Service => {
      let booking_start = request.booking_start.ok_or_else(|| {
        AppError::Validation("Date et heure de réservation requises pour les services".to_string())
      })?;
      let service = store
        .find_service_product_by_product(request.product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Service non trouvé".to_string()))?;
      let sub = ServiceOrderRequest {
        service_product_id: service.id,
        product_id: request.product_id,
        store_id: request.store_id,
        customer: request.customer,
        booking_start,
        duration_minutes: request.duration_minutes,
        staff_id: request.staff_id,
        number_of_participants: request.number_of_participants.unwrap_or(1),
        notes: request.notes,
        gift_card: request.gift_card,
        affiliate_tracking_cookie: request.affiliate_tracking_cookie,
      };
      OrderRoute::Service(ContextData::new(ServiceOrderData::new(services, sub)))
    }
    ProductType::Course | ProductType::Generic => {
      let sub = GenericOrderRequest {
        product_id: request.product_id,
        store_id: request.store_id,
        customer: request.customer,
        quantity: request.quantity,
        gift_card: request.gift_card,
        affiliate_tracking_cookie: request.affiliate_tracking_cookie,
      };
      OrderRoute::Generic(ContextData::new(GenericOrderData::new(services, sub)))
    }
  };

  info!(route = route.name(), product_type = product_type.as_str(), "Order routed.");
  ctx_data.write().route = route;
  Ok(PipelineControl::Continue)
}
