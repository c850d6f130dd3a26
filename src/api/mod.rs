//! HTTP API surface

mod health;
mod product;

pub use health::health_routes;
pub use product::product_routes;
