//! Complaint feed client
//!
//! Endpoint: `{complaint_base_url}/complaints/complaintsByVehicle?make=&model=&modelYear=`

use super::{FeedError, FeedHttpClient, RawFeedPayload, SafetyFeed};
use crate::models::{FeedKind, VehicleIdentity};
use async_trait::async_trait;
use vsi_common::config::FeedsConfig;

const COMPLAINTS_PATH: &str = "/complaints/complaintsByVehicle";

/// Queries the owner complaint feed
pub struct ComplaintFeedClient {
    http: FeedHttpClient,
    endpoint: String,
}

impl ComplaintFeedClient {
    pub fn new(config: &FeedsConfig) -> Result<Self, FeedError> {
        Ok(Self {
            http: FeedHttpClient::new(FeedKind::Complaints, config)?,
            endpoint: format!(
                "{}{}",
                config.complaint_base_url.trim_end_matches('/'),
                COMPLAINTS_PATH
            ),
        })
    }

    /// Fetch raw complaint records for `identity`
    pub async fn fetch_complaints(
        &self,
        identity: &VehicleIdentity,
    ) -> Result<RawFeedPayload, FeedError> {
        let query = [
            ("make", identity.make().to_string()),
            ("model", identity.model().to_string()),
            ("modelYear", identity.year().to_string()),
        ];
        self.http.get_json(&self.endpoint, &query).await
    }
}

#[async_trait]
impl SafetyFeed for ComplaintFeedClient {
    fn kind(&self) -> FeedKind {
        FeedKind::Complaints
    }

    async fn fetch(&self, identity: &VehicleIdentity) -> Result<RawFeedPayload, FeedError> {
        self.fetch_complaints(identity).await
    }
}
