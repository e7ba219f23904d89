//! Upstream feed clients
//!
//! Two independent government safety-data feeds are queried by
//! make/model/year:
//! 1. **recall_client** - recall campaigns
//! 2. **complaint_client** - owner complaints
//!
//! Each client issues exactly one timeout-bounded GET per lookup and
//! returns the loosely-typed body as a [`RawFeedPayload`]. Failures are
//! reported, never retried here.

pub mod complaint_client;
pub mod http;
pub mod payload;
pub mod recall_client;

pub use complaint_client::ComplaintFeedClient;
pub use http::FeedHttpClient;
pub use payload::RawFeedPayload;
pub use recall_client::RecallFeedClient;

use crate::models::{FeedKind, FeedWarning, VehicleIdentity, WarningKind};
use async_trait::async_trait;
use thiserror::Error;

/// Feed-specific failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    /// Transport failure, timeout, or non-success status
    #[error("{feed} feed unavailable: {message}")]
    Unavailable {
        feed: FeedKind,
        status: Option<u16>,
        message: String,
    },

    /// Successful response whose body could not be used
    #[error("{feed} feed returned a malformed payload: {message}")]
    Malformed { feed: FeedKind, message: String },
}

impl FeedError {
    pub fn feed(&self) -> FeedKind {
        match self {
            FeedError::Unavailable { feed, .. } | FeedError::Malformed { feed, .. } => *feed,
        }
    }

    /// Non-fatal warning form attached to partial results
    pub fn to_warning(&self) -> FeedWarning {
        match self {
            FeedError::Unavailable {
                feed,
                status,
                message,
            } => FeedWarning {
                feed: *feed,
                kind: WarningKind::UpstreamUnavailable,
                status: *status,
                message: message.clone(),
            },
            FeedError::Malformed { feed, message } => FeedWarning {
                feed: *feed,
                kind: WarningKind::MalformedPayload,
                status: None,
                message: message.clone(),
            },
        }
    }
}

/// One upstream safety-data feed
///
/// # Example
/// ```rust,ignore
/// use vsi_aggregator::feeds::{RecallFeedClient, SafetyFeed};
///
/// let client = RecallFeedClient::new(&config.feeds)?;
/// let payload = client.fetch(&identity).await?;
/// println!("{} raw records", payload.results().len());
/// ```
#[async_trait]
pub trait SafetyFeed: Send + Sync {
    /// Which feed this is (for warnings and logging)
    fn kind(&self) -> FeedKind;

    /// Fetch raw records for `identity`; one attempt, bounded by the client timeout
    async fn fetch(&self, identity: &VehicleIdentity) -> Result<RawFeedPayload, FeedError>;
}
