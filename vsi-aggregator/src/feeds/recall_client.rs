//! Recall feed client
//!
//! Endpoint: `{recall_base_url}/recalls/recallsByVehicle?make=&model=&modelYear=`

use super::{FeedError, FeedHttpClient, RawFeedPayload, SafetyFeed};
use crate::models::{FeedKind, VehicleIdentity};
use async_trait::async_trait;
use vsi_common::config::FeedsConfig;

const RECALLS_PATH: &str = "/recalls/recallsByVehicle";

/// Queries the recall campaign feed
pub struct RecallFeedClient {
    http: FeedHttpClient,
    endpoint: String,
}

impl RecallFeedClient {
    pub fn new(config: &FeedsConfig) -> Result<Self, FeedError> {
        Ok(Self {
            http: FeedHttpClient::new(FeedKind::Recalls, config)?,
            endpoint: format!("{}{}", config.recall_base_url.trim_end_matches('/'), RECALLS_PATH),
        })
    }

    /// Fetch raw recall records for `identity`
    pub async fn fetch_recalls(
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
impl SafetyFeed for RecallFeedClient {
    fn kind(&self) -> FeedKind {
        FeedKind::Recalls
    }

    async fn fetch(&self, identity: &VehicleIdentity) -> Result<RawFeedPayload, FeedError> {
        self.fetch_recalls(identity).await
    }
}
