//! Safety intelligence endpoint
//!
//! `GET /api/safety?make=&model=&year=&vin=`
//!
//! **Response:**
//! ```json
//! {
//!   "success": true,
//!   "data": {
//!     "identity": {"make": "JEEP", "model": "WRANGLER", "year": 2012},
//!     "recallCount": 1,
//!     "recalls": [...],
//!     "complaintStatistics": {"total": 1, "high": 0, "medium": 0, "low": 1, "crashCount": 0, "fireCount": 0},
//!     "complaints": [...],
//!     "warnings": [],
//!     "retrievedAt": "2024-05-01T08:00:00Z",
//!     "cacheState": "miss"
//!   }
//! }
//! ```
//!
//! The `x-cache: hit|miss` response header mirrors `cacheState` for
//! observability.

use crate::models::{
    AggregateResult, CacheState, ComplaintRecord, FeedWarning, RecallRecord,
};
use crate::{aggregator::SafetyError, ApiResult, AppState};
use axum::{
    extract::{Query, State},
    http::{HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Out-of-band cache signal
pub const CACHE_HEADER: HeaderName = HeaderName::from_static("x-cache");

/// Query parameters; all raw so validation errors come from the resolver
#[derive(Debug, Default, Deserialize)]
pub struct SafetyQuery {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<String>,
    pub vin: Option<String>,
}

/// Public contract envelope
#[derive(Debug, Serialize)]
pub struct SafetyIntelligenceResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<SafetyIntelligenceData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyIntelligenceData {
    pub identity: IdentitySummary,
    pub recall_count: usize,
    pub recalls: Vec<RecallRecord>,
    pub complaint_statistics: ComplaintStatistics,
    pub complaints: Vec<ComplaintRecord>,
    pub warnings: Vec<FeedWarning>,
    pub retrieved_at: DateTime<Utc>,
    pub cache_state: CacheState,
}

#[derive(Debug, Serialize)]
pub struct IdentitySummary {
    pub make: String,
    pub model: String,
    pub year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vin: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintStatistics {
    pub total: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub crash_count: usize,
    pub fire_count: usize,
}

impl From<AggregateResult> for SafetyIntelligenceData {
    fn from(result: AggregateResult) -> Self {
        let stats = result.statistics;
        Self {
            identity: IdentitySummary {
                make: result.identity.make().to_string(),
                model: result.identity.model().to_string(),
                year: result.identity.year(),
                vin: result.identity.vin().map(str::to_string),
            },
            recall_count: stats.recalls.total,
            recalls: result.recalls,
            complaint_statistics: ComplaintStatistics {
                total: stats.complaints.total,
                high: stats.complaints.high,
                medium: stats.complaints.medium,
                low: stats.complaints.low,
                crash_count: stats.crash_count,
                fire_count: stats.fire_count,
            },
            complaints: result.complaints,
            warnings: result.warnings,
            retrieved_at: result.retrieved_at,
            cache_state: result.cache_state,
        }
    }
}

/// GET /api/safety
///
/// **Errors:**
/// - 400 Bad Request: invalid make/model/year or VIN
/// - 502 Bad Gateway: both feeds unavailable
/// - 503 Service Unavailable: request cancelled (shutdown)
pub async fn get_safety_intelligence(
    State(state): State<AppState>,
    Query(query): Query<SafetyQuery>,
) -> ApiResult<Response> {
    let identity = state
        .resolver
        .resolve(
            query.make.as_deref(),
            query.model.as_deref(),
            query.year.as_deref(),
            query.vin.as_deref(),
        )
        .map_err(SafetyError::from)?;

    let cancel = state.shutdown.child_token();
    let result = state
        .aggregator
        .get_safety_intelligence(&identity, &cancel)
        .await?;

    let cache_state = result.cache_state;
    debug!(vehicle = %identity, cache = cache_state.as_str(), "Serving safety intelligence");

    let body = SafetyIntelligenceResponse {
        success: true,
        data: Some(result.into()),
        error: None,
    };

    Ok((
        [(CACHE_HEADER, HeaderValue::from_static(cache_state.as_str()))],
        Json(body),
    )
        .into_response())
}

/// Build safety routes
pub fn safety_routes() -> Router<AppState> {
    Router::new().route("/api/safety", get(get_safety_intelligence))
}
