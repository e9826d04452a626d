// payhula-storefront/src/web/handlers/mod.rs

pub mod availability;
pub mod orders;
