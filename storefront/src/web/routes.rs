// payhula-storefront/src/web/routes.rs

use actix_web::web;

use crate::web::handlers::{availability, orders};

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/orders")
          .route("", web::post().to(orders::create_order_handler))
          .route("/digital", web::post().to(orders::create_digital_order_handler))
          .route("/physical", web::post().to(orders::create_physical_order_handler))
          .route("/service", web::post().to(orders::create_service_order_handler)),
      )
      .route(
        "/physical-products/{id}/stock",
        web::get().to(availability::stock_handler),
      )
      .route(
        "/services/{id}/availability",
        web::get().to(availability::slot_availability_handler),
      ),
  );
}
