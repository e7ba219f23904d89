//! In-memory result cache with per-entry expiry
//!
//! Entries are immutable `Arc<AggregateResult>` snapshots; `put` replaces
//! the whole entry for a key, so readers never observe a partial write.
//! Expiry is lazy (checked on read). An optional background sweep purges
//! expired entries for memory hygiene only.

use crate::models::AggregateResult;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use vsi_common::Clock;

/// One cached result
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub value: Arc<AggregateResult>,
    pub expires_at: DateTime<Utc>,
}

/// Shared safety-result cache
pub struct SafetyCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    clock: Arc<dyn Clock>,
}

impl SafetyCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Unexpired value for `key`, if any
    pub async fn get(&self, key: &str) -> Option<Arc<AggregateResult>> {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(Arc::clone(&entry.value)),
            Some(_) => {
                debug!(key = %key, "Cache entry expired");
                None
            }
            None => None,
        }
    }

    /// Store `value` under `key` for `ttl`, replacing any previous entry
    pub async fn put(&self, key: &str, value: AggregateResult, ttl: Duration) {
        let entry = CacheEntry {
            key: key.to_string(),
            value: Arc::new(value),
            expires_at: self.clock.now() + ttl,
        };
        self.entries.write().await.insert(key.to_string(), entry);
    }

    /// Drop expired entries; returns how many were removed
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    /// Stored entries, expired ones included until purged
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Purge expired entries every `interval` until `shutdown` fires
    pub fn spawn_sweeper(
        self: Arc<Self>,
        interval: std::time::Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        debug!("Cache sweeper stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let removed = self.purge_expired().await;
                        if removed > 0 {
                            debug!(removed, "Purged expired cache entries");
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityResolver;
    use crate::models::{CacheState, SafetyStatistics};
    use chrono::TimeZone;
    use vsi_common::ManualClock;

    fn sample_result(clock: &ManualClock) -> AggregateResult {
        let identity = IdentityResolver::default()
            .resolve(Some("Jeep"), Some("Wrangler"), Some("2012"), None)
            .unwrap();
        AggregateResult {
            identity,
            recalls: Vec::new(),
            complaints: Vec::new(),
            statistics: SafetyStatistics::default(),
            warnings: Vec::new(),
            retrieved_at: clock.now(),
            cache_state: CacheState::Miss,
        }
    }

    fn manual_clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn test_put_then_get_round_trip() {
        let clock = manual_clock();
        let cache = SafetyCache::new(Arc::new(clock.clone()));
        let value = sample_result(&clock);

        cache.put("jeep|wrangler|2012", value.clone(), Duration::hours(24)).await;

        let stored = cache.get("jeep|wrangler|2012").await.unwrap();
        assert_eq!(*stored, value);
    }

    #[tokio::test]
    async fn test_entry_expires_after_ttl() {
        let clock = manual_clock();
        let cache = SafetyCache::new(Arc::new(clock.clone()));
        cache
            .put("jeep|wrangler|2012", sample_result(&clock), Duration::hours(24))
            .await;

        clock.advance(Duration::hours(23));
        assert!(cache.get("jeep|wrangler|2012").await.is_some());

        clock.advance(Duration::hours(1));
        assert!(cache.get("jeep|wrangler|2012").await.is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let clock = manual_clock();
        let cache = SafetyCache::new(Arc::new(clock.clone()));
        let first = sample_result(&clock);
        cache.put("k", first, Duration::hours(1)).await;

        clock.advance(Duration::minutes(30));
        let second = sample_result(&clock);
        cache.put("k", second.clone(), Duration::hours(1)).await;

        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get("k").await.unwrap().retrieved_at, second.retrieved_at);

        // New entry carries its own expiry
        clock.advance(Duration::minutes(45));
        assert!(cache.get("k").await.is_some());
    }

    #[tokio::test]
    async fn test_missing_key() {
        let cache = SafetyCache::new(Arc::new(manual_clock()));
        assert!(cache.get("nope").await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let clock = manual_clock();
        let cache = SafetyCache::new(Arc::new(clock.clone()));
        cache.put("short", sample_result(&clock), Duration::minutes(5)).await;
        cache.put("long", sample_result(&clock), Duration::hours(5)).await;

        clock.advance(Duration::minutes(10));
        let removed = cache.purge_expired().await;

        assert_eq!(removed, 1);
        assert_eq!(cache.len().await, 1);
        assert!(cache.get("long").await.is_some());
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_shutdown() {
        let cache = Arc::new(SafetyCache::new(Arc::new(manual_clock())));
        let shutdown = CancellationToken::new();
        let handle = Arc::clone(&cache).spawn_sweeper(
            std::time::Duration::from_millis(10),
            shutdown.clone(),
        );

        shutdown.cancel();
        let joined = tokio::time::timeout(std::time::Duration::from_secs(1), handle).await;
        assert!(joined.is_ok(), "sweeper should exit after shutdown");
    }
}
