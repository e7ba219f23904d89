//! Shared HTTP plumbing for feed clients
//!
//! One reqwest client per feed with a fixed User-Agent and timeout, plus
//! a direct governor quota so bursts of cache misses stay polite to the
//! upstream API. The quota delays a request; it never turns it into a
//! second attempt, and the delay counts against the request timeout.

use super::{FeedError, RawFeedPayload};
use crate::models::FeedKind;
use reqwest::{header, Client};
use std::num::NonZeroU32;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use vsi_common::config::FeedsConfig;

type DirectRateLimiter = governor::RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Timeout-bounded, rate-limited JSON GET for one feed
pub struct FeedHttpClient {
    feed: FeedKind,
    http_client: Client,
    rate_limiter: DirectRateLimiter,
    timeout: Duration,
}

impl FeedHttpClient {
    pub fn new(feed: FeedKind, config: &FeedsConfig) -> Result<Self, FeedError> {
        let timeout = Duration::from_secs(config.timeout_secs);

        let user_agent = header::HeaderValue::from_str(&config.user_agent).map_err(|e| {
            FeedError::Unavailable {
                feed,
                status: None,
                message: format!("invalid User-Agent: {}", e),
            }
        })?;
        let mut headers = header::HeaderMap::new();
        headers.insert(header::USER_AGENT, user_agent);
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let http_client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| FeedError::Unavailable {
                feed,
                status: None,
                message: format!("failed to build HTTP client: {}", e),
            })?;

        let per_second = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = governor::RateLimiter::direct(governor::Quota::per_second(per_second));

        Ok(Self {
            feed,
            http_client,
            rate_limiter,
            timeout,
        })
    }

    pub fn feed(&self) -> FeedKind {
        self.feed
    }

    /// Single GET returning the parsed JSON body
    ///
    /// The timeout bounds the whole call, including any wait for the
    /// rate limiter.
    ///
    /// # Errors
    /// - `Unavailable` on transport error, timeout, or non-2xx status
    /// - `Malformed` when a 2xx body is not JSON
    pub async fn get_json(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<RawFeedPayload, FeedError> {
        let started = Instant::now();

        let payload = tokio::time::timeout(self.timeout, self.paced_get(url, query))
            .await
            .map_err(|_| {
                warn!(feed = %self.feed, url = %url, "Upstream feed timed out");
                self.timed_out()
            })??;

        debug!(
            feed = %self.feed,
            records = payload.results().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Upstream feed responded"
        );

        Ok(payload)
    }

    async fn paced_get(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<RawFeedPayload, FeedError> {
        self.rate_limiter.until_ready().await;

        debug!(feed = %self.feed, url = %url, "Querying upstream feed");
        let response = self
            .http_client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Unavailable {
                feed: self.feed,
                status: Some(status.as_u16()),
                message: format!("upstream returned HTTP {}", status),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?;

        RawFeedPayload::from_slice(&body).map_err(|e| FeedError::Malformed {
            feed: self.feed,
            message: format!("invalid JSON body: {}", e),
        })
    }

    fn timed_out(&self) -> FeedError {
        FeedError::Unavailable {
            feed: self.feed,
            status: None,
            message: format!("request timed out after {}s", self.timeout.as_secs()),
        }
    }

    fn transport_error(&self, error: reqwest::Error) -> FeedError {
        if error.is_timeout() {
            return self.timed_out();
        }
        FeedError::Unavailable {
            feed: self.feed,
            status: error.status().map(|s| s.as_u16()),
            message: format!("request failed: {}", error),
        }
    }
}
