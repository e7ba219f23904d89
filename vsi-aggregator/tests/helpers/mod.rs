//! Test Helper Utilities
//!
//! Shared mock feeds and fixtures for vsi-aggregator integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vsi_aggregator::cache::SafetyCache;
use vsi_aggregator::feeds::{FeedError, RawFeedPayload, SafetyFeed};
use vsi_aggregator::identity::IdentityResolver;
use vsi_aggregator::models::{AggregateResult, FeedKind, VehicleIdentity};
use vsi_aggregator::severity::SeverityClassifier;
use vsi_aggregator::{AggregatorOptions, SafetyAggregator};
use vsi_common::ManualClock;

/// What a mock feed answers with
#[derive(Debug, Clone)]
pub enum MockResponse {
    Payload(Value),
    Unavailable(Option<u16>),
    Malformed,
}

/// Scriptable feed with a call counter and optional latency
pub struct MockFeed {
    kind: FeedKind,
    response: Mutex<MockResponse>,
    delay: Duration,
    calls: AtomicUsize,
}

impl MockFeed {
    pub fn new(kind: FeedKind, response: MockResponse) -> Arc<Self> {
        Self::with_delay(kind, response, Duration::ZERO)
    }

    pub fn with_delay(kind: FeedKind, response: MockResponse, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            kind,
            response: Mutex::new(response),
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn set_response(&self, response: MockResponse) {
        *self.response.lock().unwrap() = response;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SafetyFeed for MockFeed {
    fn kind(&self) -> FeedKind {
        self.kind
    }

    async fn fetch(&self, _identity: &VehicleIdentity) -> Result<RawFeedPayload, FeedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let response = self.response.lock().unwrap().clone();
        match response {
            MockResponse::Payload(body) => Ok(RawFeedPayload::new(body)),
            MockResponse::Unavailable(status) => Err(FeedError::Unavailable {
                feed: self.kind,
                status,
                message: "mock outage".to_string(),
            }),
            MockResponse::Malformed => Err(FeedError::Malformed {
                feed: self.kind,
                message: "mock malformed body".to_string(),
            }),
        }
    }
}

/// Fixed starting instant for manual clocks
pub fn test_clock() -> ManualClock {
    ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap())
}

pub fn build_aggregator(
    recalls: Arc<MockFeed>,
    complaints: Arc<MockFeed>,
    clock: &ManualClock,
    options: AggregatorOptions,
) -> SafetyAggregator {
    let clock = Arc::new(clock.clone());
    SafetyAggregator::new(
        recalls,
        complaints,
        SeverityClassifier::default(),
        Arc::new(SafetyCache::new(clock.clone())),
        clock,
        options,
    )
}

pub fn resolver(clock: &ManualClock) -> IdentityResolver {
    IdentityResolver::new(Arc::new(clock.clone()))
}

pub fn jeep_wrangler(clock: &ManualClock) -> VehicleIdentity {
    resolver(clock)
        .resolve(Some("Jeep"), Some("Wrangler"), Some("2012"), None)
        .unwrap()
}

/// One brake-related recall (current casing)
pub fn brake_recall_payload() -> Value {
    json!({
        "Count": 1,
        "Message": "Results returned successfully",
        "results": [{
            "Manufacturer": "Chrysler (FCA US LLC)",
            "NHTSACampaignNumber": "12V123000",
            "ReportReceivedDate": "26/02/2012",
            "Component": "SERVICE BRAKES, HYDRAULIC",
            "Summary": "The brake booster may fail.",
            "Consequence": "Loss of brake assist increases stopping distance.",
            "Remedy": "Dealers will replace the booster."
        }]
    })
}

/// One benign complaint (current casing)
pub fn squeaky_brakes_payload() -> Value {
    json!({
        "count": 1,
        "message": "Results returned successfully",
        "results": [{
            "odiNumber": 11223344,
            "crash": false,
            "fire": false,
            "numberOfInjuries": 0,
            "numberOfDeaths": 0,
            "dateOfIncident": "01/15/2020",
            "components": "SERVICE BRAKES",
            "summary": "squeaky brakes"
        }]
    })
}

/// Assert equality ignoring `cache_state` and `retrieved_at`
pub fn assert_same_content(a: &AggregateResult, b: &AggregateResult) {
    assert_eq!(a.identity, b.identity);
    assert_eq!(a.recalls, b.recalls);
    assert_eq!(a.complaints, b.complaints);
    assert_eq!(a.statistics, b.statistics);
    assert_eq!(a.warnings, b.warnings);
}
