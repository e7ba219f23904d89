//! HTTP error mapping for vsi-aggregator
//!
//! Error bodies follow the public contract: `{"success": false, "error": "..."}`.

use crate::aggregator::SafetyError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Caller input error (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Every upstream feed failed (502)
    #[error("Upstream unavailable: {0}")]
    BadGateway(String),

    /// Request abandoned, e.g. during shutdown (503)
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl From<SafetyError> for ApiError {
    fn from(err: SafetyError) -> Self {
        match err {
            SafetyError::Identity(e) => ApiError::BadRequest(e.to_string()),
            e @ SafetyError::AllFeedsUnavailable { .. } => ApiError::BadGateway(e.to_string()),
            e @ SafetyError::Cancelled => ApiError::Unavailable(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };

        let body = Json(json!({
            "success": false,
            "error": message,
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityError;

    #[test]
    fn test_identity_error_is_bad_request() {
        let err: ApiError =
            SafetyError::Identity(IdentityError::InvalidVin("too short".into())).into();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "Invalid VIN: too short"));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_cancelled_is_service_unavailable() {
        let err: ApiError = SafetyError::Cancelled.into();
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
