//! Safety intelligence aggregator
//!
//! Public entry point of the subsystem. Per lookup:
//! 1. Check the cache (hit → return, no network)
//! 2. Fan out to both feeds concurrently and wait for both outcomes
//! 3. Normalize + classify each feed (panics isolated per feed)
//! 4. Compute statistics, sort complaints, truncate
//! 5. Cache the result, return it as a miss
//!
//! A failing feed degrades to an empty list plus a warning. Only when
//! both feeds fail does the lookup fail, and then nothing is cached.
//!
//! # Single-flight
//! With `single_flight` enabled, concurrent cold-cache lookups for the
//! same key queue behind a per-key gate. The first caller fetches; the
//! rest re-check the cache once the gate opens. If the first caller
//! failed or was cancelled, the next one fetches for itself.

use crate::cache::SafetyCache;
use crate::feeds::{ComplaintFeedClient, FeedError, RawFeedPayload, RecallFeedClient, SafetyFeed};
use crate::identity::IdentityError;
use crate::models::{
    AggregateResult, CacheState, ComplaintRecord, FeedKind, FeedWarning, RecallRecord,
    SafetyStatistics, TierCounts, VehicleIdentity,
};
use crate::normalizer::{normalize_complaints, normalize_recalls, parse_record_date};
use crate::severity::SeverityClassifier;
use chrono::Duration;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use vsi_common::config::{TomlConfig, MAX_TTL_HOURS};
use vsi_common::Clock;

/// Aggregation failures surfaced to callers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SafetyError {
    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error("All safety feeds unavailable ({recalls}; {complaints})")]
    AllFeedsUnavailable {
        recalls: FeedError,
        complaints: FeedError,
    },

    #[error("Request cancelled before both feeds completed")]
    Cancelled,
}

/// Tunables for [`SafetyAggregator`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatorOptions {
    pub ttl: Duration,
    pub single_flight: bool,
    pub max_recalls: usize,
    pub max_complaints: usize,
}

impl Default for AggregatorOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::hours(24),
            single_flight: true,
            max_recalls: 50,
            max_complaints: 100,
        }
    }
}

impl AggregatorOptions {
    pub fn from_config(config: &TomlConfig) -> Self {
        Self {
            ttl: Duration::hours(config.cache.ttl_hours.min(MAX_TTL_HOURS) as i64),
            single_flight: config.cache.single_flight,
            max_recalls: config.limits.max_recalls,
            max_complaints: config.limits.max_complaints,
        }
    }
}

type FlightMap = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// Releases a per-key flight gate; removes it once no other caller holds it
struct FlightSlot<'a> {
    flights: &'a FlightMap,
    key: String,
    gate: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for FlightSlot<'_> {
    fn drop(&mut self) {
        let mut flights = self.flights.lock().unwrap_or_else(|e| e.into_inner());
        let unused = flights
            .get(&self.key)
            .map(|current| Arc::ptr_eq(current, &self.gate) && Arc::strong_count(&self.gate) <= 2)
            .unwrap_or(false);
        if unused {
            flights.remove(&self.key);
        }
    }
}

/// Cached, severity-ranked view over the recall and complaint feeds
pub struct SafetyAggregator {
    recall_feed: Arc<dyn SafetyFeed>,
    complaint_feed: Arc<dyn SafetyFeed>,
    classifier: SeverityClassifier,
    cache: Arc<SafetyCache>,
    clock: Arc<dyn Clock>,
    options: AggregatorOptions,
    flights: FlightMap,
}

impl SafetyAggregator {
    pub fn new(
        recall_feed: Arc<dyn SafetyFeed>,
        complaint_feed: Arc<dyn SafetyFeed>,
        classifier: SeverityClassifier,
        cache: Arc<SafetyCache>,
        clock: Arc<dyn Clock>,
        options: AggregatorOptions,
    ) -> Self {
        Self {
            recall_feed,
            complaint_feed,
            classifier,
            cache,
            clock,
            options,
            flights: Mutex::new(HashMap::new()),
        }
    }

    /// Wire the production feed clients from configuration
    pub fn from_config(config: &TomlConfig, clock: Arc<dyn Clock>) -> Result<Self, FeedError> {
        let recall_feed = Arc::new(RecallFeedClient::new(&config.feeds)?);
        let complaint_feed = Arc::new(ComplaintFeedClient::new(&config.feeds)?);
        let cache = Arc::new(SafetyCache::new(Arc::clone(&clock)));

        Ok(Self::new(
            recall_feed,
            complaint_feed,
            SeverityClassifier::new(&config.severity),
            cache,
            clock,
            AggregatorOptions::from_config(config),
        ))
    }

    pub fn cache(&self) -> &Arc<SafetyCache> {
        &self.cache
    }

    pub fn options(&self) -> &AggregatorOptions {
        &self.options
    }

    /// Safety picture for `identity`
    ///
    /// # Errors
    /// - `AllFeedsUnavailable` when neither feed produced usable data
    /// - `Cancelled` when `cancel` fires first; nothing is cached
    pub async fn get_safety_intelligence(
        &self,
        identity: &VehicleIdentity,
        cancel: &CancellationToken,
    ) -> Result<AggregateResult, SafetyError> {
        let key = identity.cache_key();

        if let Some(hit) = self.cached(identity, &key).await {
            return Ok(hit);
        }

        if !self.options.single_flight {
            return self.fetch_and_store(identity, &key, cancel).await;
        }

        let slot = self.join_flight(&key);
        let _turn = tokio::select! {
            _ = cancel.cancelled() => return Err(SafetyError::Cancelled),
            guard = slot.gate.lock() => guard,
        };

        // An earlier caller may have filled the cache while we queued
        if let Some(hit) = self.cached(identity, &key).await {
            return Ok(hit);
        }

        self.fetch_and_store(identity, &key, cancel).await
    }

    /// Stored result for `key`, reported under the caller's own identity
    ///
    /// Entries are shared by every VIN of a make/model/year, so the stored
    /// identity (and its VIN) never leaves the cache.
    async fn cached(&self, identity: &VehicleIdentity, key: &str) -> Option<AggregateResult> {
        match self.cache.get(key).await {
            Some(stored) => {
                debug!(key = %key, "Safety cache hit");
                Some(stored.as_cache_hit_for(identity))
            }
            None => {
                debug!(key = %key, "Safety cache miss");
                None
            }
        }
    }

    fn join_flight(&self, key: &str) -> FlightSlot<'_> {
        let mut flights = self.flights.lock().unwrap_or_else(|e| e.into_inner());
        let gate = Arc::clone(
            flights
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        );
        FlightSlot {
            flights: &self.flights,
            key: key.to_string(),
            gate,
        }
    }

    async fn fetch_and_store(
        &self,
        identity: &VehicleIdentity,
        key: &str,
        cancel: &CancellationToken,
    ) -> Result<AggregateResult, SafetyError> {
        let started = Instant::now();
        debug!(
            vehicle = %identity,
            feeds = ?[self.recall_feed.kind(), self.complaint_feed.kind()],
            "Fetching safety feeds"
        );

        let fan_out = async {
            tokio::join!(
                self.recall_feed.fetch(identity),
                self.complaint_feed.fetch(identity)
            )
        };

        // Dropping `fan_out` abandons both pending requests
        let (recall_outcome, complaint_outcome) = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(vehicle = %identity, "Safety lookup cancelled; nothing cached");
                return Err(SafetyError::Cancelled);
            }
            outcomes = fan_out => outcomes,
        };

        let recalls = recall_outcome.and_then(|raw| {
            guard_feed(self.recall_feed.kind(), || self.process_recalls(&raw))
        });
        let complaints = complaint_outcome.and_then(|raw| {
            guard_feed(self.complaint_feed.kind(), || self.process_complaints(&raw))
        });

        let mut warnings: Vec<FeedWarning> = Vec::new();
        let (recalls, complaints) = match (recalls, complaints) {
            (Err(recalls), Err(complaints)) => {
                warn!(
                    vehicle = %identity,
                    recall_error = %recalls,
                    complaint_error = %complaints,
                    "All safety feeds unavailable"
                );
                return Err(SafetyError::AllFeedsUnavailable {
                    recalls,
                    complaints,
                });
            }
            (recalls, complaints) => (
                recover(recalls, &mut warnings),
                recover(complaints, &mut warnings),
            ),
        };

        let result = self.assemble(identity.clone(), recalls, complaints, warnings);
        self.cache.put(key, result.clone(), self.options.ttl).await;

        info!(
            vehicle = %identity,
            recalls = result.statistics.recalls.total,
            complaints = result.statistics.complaints.total,
            warnings = result.warnings.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Safety intelligence fetched"
        );

        Ok(result)
    }

    fn process_recalls(&self, raw: &RawFeedPayload) -> Vec<RecallRecord> {
        normalize_recalls(raw)
            .into_iter()
            .map(|record| RecallRecord {
                severity: self.classifier.classify_recall(&record),
                ..record
            })
            .collect()
    }

    fn process_complaints(&self, raw: &RawFeedPayload) -> Vec<ComplaintRecord> {
        normalize_complaints(raw)
            .into_iter()
            .map(|record| ComplaintRecord {
                severity: self.classifier.classify_complaint(&record),
                ..record
            })
            .collect()
    }

    fn assemble(
        &self,
        identity: VehicleIdentity,
        mut recalls: Vec<RecallRecord>,
        mut complaints: Vec<ComplaintRecord>,
        warnings: Vec<FeedWarning>,
    ) -> AggregateResult {
        // Statistics cover everything the feeds returned, before truncation
        let statistics = SafetyStatistics {
            recalls: TierCounts::tally(recalls.iter().map(|r| r.severity)),
            complaints: TierCounts::tally(complaints.iter().map(|c| c.severity)),
            crash_count: complaints.iter().filter(|c| c.crash_indicator).count(),
            fire_count: complaints.iter().filter(|c| c.fire_indicator).count(),
        };

        sort_complaints(&mut complaints);
        recalls.truncate(self.options.max_recalls);
        complaints.truncate(self.options.max_complaints);

        AggregateResult {
            identity,
            recalls,
            complaints,
            statistics,
            warnings,
            retrieved_at: self.clock.now(),
            cache_state: CacheState::Miss,
        }
    }
}

/// Severity descending, then incident date descending
///
/// Unparseable dates sort as oldest; the sort is stable so full ties keep
/// feed order.
pub fn sort_complaints(complaints: &mut [ComplaintRecord]) {
    complaints.sort_by(|a, b| {
        b.severity.cmp(&a.severity).then_with(|| {
            parse_record_date(&b.date_of_incident).cmp(&parse_record_date(&a.date_of_incident))
        })
    });
}

/// Run normalization for one feed, turning a panic into a malformed-payload error
fn guard_feed<T>(feed: FeedKind, work: impl FnOnce() -> T) -> Result<T, FeedError> {
    catch_unwind(AssertUnwindSafe(work)).map_err(|panic| {
        let detail = panic
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        error!(feed = %feed, detail = %detail, "Normalization failed; dropping feed results");
        FeedError::Malformed {
            feed,
            message: format!("normalization failed: {}", detail),
        }
    })
}

fn recover<T>(outcome: Result<Vec<T>, FeedError>, warnings: &mut Vec<FeedWarning>) -> Vec<T> {
    match outcome {
        Ok(records) => records,
        Err(e) => {
            warn!(feed = %e.feed(), error = %e, "Safety feed degraded; continuing with partial results");
            warnings.push(e.to_warning());
            Vec::new()
        }
    }
}
