// tests/web_tests.rs
mod common;

use actix_web::{test, web, App};
use common::*;
use payhula_flow::FlowRegistry;
use payhula_storefront::config::{AppConfig, CheckoutSettings};
use payhula_storefront::errors::AppError;
use payhula_storefront::models::ProductType;
use payhula_storefront::pipelines::register_all_pipelines;
use payhula_storefront::state::AppState;
use payhula_storefront::web::configure_app_routes;
use serde_json::{json, Value};
use serial_test::serial;
use std::sync::Arc;

fn app_state(shop: &TestShop) -> AppState {
  let flows = FlowRegistry::<AppError>::new();
  register_all_pipelines(&flows);
  AppState {
    services: shop.services.clone(),
    flows: Arc::new(flows),
    config: Arc::new(AppConfig {
      server_host: "127.0.0.1".to_string(),
      server_port: 0,
      database_url: None,
      database_max_connections: 1,
      payment_api_url: None,
      payment_api_key: None,
      webhook_dispatch_url: None,
      checkout: CheckoutSettings::default(),
    }),
  }
}

#[actix_web::test]
#[serial]
async fn test_order_endpoint_returns_created_confirmation() {
  let shop = TestShop::new();
  let (product, _digital) = shop.digital(29);
  let app = test::init_service(
    App::new()
      .app_data(web::Data::new(app_state(&shop)))
      .configure(configure_app_routes),
  )
  .await;

  let req = test::TestRequest::post()
    .uri("/api/v1/orders")
    .set_json(json!({
      "product_id": product.id,
      "store_id": shop.store_id,
      "customer": { "email": "moussa@example.com" }
    }))
    .to_request();
  let resp = test::call_service(&app, req).await;

  assert_eq!(resp.status().as_u16(), 201);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["product_type"], ProductType::Digital.as_str());
  assert!(body["checkout_url"].as_str().is_some_and(|url| !url.is_empty()));
  assert_eq!(body["amount_to_pay"], 29);
}

#[actix_web::test]
#[serial]
async fn test_missing_shipping_address_is_a_bad_request() {
  let shop = TestShop::new();
  let (product, physical) = shop.physical(2500, None);
  shop.stock(&physical, 10, 0);
  let app = test::init_service(
    App::new()
      .app_data(web::Data::new(app_state(&shop)))
      .configure(configure_app_routes),
  )
  .await;

  let req = test::TestRequest::post()
    .uri("/api/v1/orders")
    .set_json(json!({
      "product_id": product.id,
      "store_id": shop.store_id,
      "customer": { "email": "moussa@example.com" }
    }))
    .to_request();
  let resp = test::call_service(&app, req).await;

  assert_eq!(resp.status().as_u16(), 400);
  let body: Value = test::read_body_json(resp).await;
  assert!(body["error"].as_str().unwrap().contains("Adresse de livraison"));
}

#[actix_web::test]
#[serial]
async fn test_stock_endpoint_reports_availability() {
  let shop = TestShop::new();
  let (_product, physical) = shop.physical(2500, None);
  shop.stock(&physical, 5, 1);
  let app = test::init_service(
    App::new()
      .app_data(web::Data::new(app_state(&shop)))
      .configure(configure_app_routes),
  )
  .await;

  let req = test::TestRequest::get()
    .uri(&format!("/api/v1/physical-products/{}/stock?quantity=4", physical.id))
    .to_request();
  let body: Value = test::call_and_read_body_json(&app, req).await;

  assert_eq!(body["total_available"], 4);
  assert_eq!(body["available"], true);
}
