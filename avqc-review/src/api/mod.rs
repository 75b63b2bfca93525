//! HTTP API handlers

pub mod health;
pub mod packages;

pub use health::health_routes;
pub use packages::package_routes;
