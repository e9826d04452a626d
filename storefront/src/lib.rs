// payhula-storefront/src/lib.rs

//! Payhula storefront: order creation for digital, physical and service
//! products, built on `payhula_flow` pipelines.

pub mod availability;
pub mod config;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod services;
pub mod state;
pub mod store;
pub mod web;
