//! vsi-aggregator library interface
//!
//! Vehicle Safety Intelligence Aggregator: queries recall and complaint
//! feeds by vehicle identity, normalizes and severity-ranks the records,
//! and caches the result. Exposed over HTTP by the `vsi-aggregator`
//! binary; the modules are public for integration testing.

pub mod aggregator;
pub mod api;
pub mod cache;
pub mod error;
pub mod feeds;
pub mod identity;
pub mod models;
pub mod normalizer;
pub mod severity;

pub use crate::aggregator::{AggregatorOptions, SafetyAggregator, SafetyError};
pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use identity::IdentityResolver;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<SafetyAggregator>,
    pub resolver: IdentityResolver,
    /// Root token; each request runs under a child token
    pub shutdown: CancellationToken,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        aggregator: Arc<SafetyAggregator>,
        resolver: IdentityResolver,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            aggregator,
            resolver,
            shutdown,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::safety_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
