//! HTTP API handlers for vsi-aggregator

pub mod health;
pub mod safety;

pub use health::health_routes;
pub use safety::safety_routes;
