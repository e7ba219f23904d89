//! Data model for safety intelligence results
//!
//! All record types are derived values: built once by the normalizer and
//! classifier, then only cloned or serialized.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Validated vehicle identity
///
/// Construct through [`crate::identity::IdentityResolver`]; fields are
/// private so an unvalidated identity cannot be assembled by hand.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VehicleIdentity {
    make: String,
    model: String,
    year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    vin: Option<String>,
}

impl VehicleIdentity {
    pub(crate) fn new(make: String, model: String, year: i32, vin: Option<String>) -> Self {
        Self {
            make,
            model,
            year,
            vin,
        }
    }

    pub fn make(&self) -> &str {
        &self.make
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// VIN, carried for display only
    pub fn vin(&self) -> Option<&str> {
        self.vin.as_deref()
    }

    /// Canonical cache key: lowercase `make|model|year`
    ///
    /// The VIN is not part of the key.
    pub fn cache_key(&self) -> String {
        format!(
            "{}|{}|{}",
            self.make.to_lowercase(),
            self.model.to_lowercase(),
            self.year
        )
    }
}

impl fmt::Display for VehicleIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.year, self.make, self.model)
    }
}

/// Severity tier, ordered `Low < Medium < High`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityTier {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for SeverityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeverityTier::Low => write!(f, "low"),
            SeverityTier::Medium => write!(f, "medium"),
            SeverityTier::High => write!(f, "high"),
        }
    }
}

/// One normalized recall campaign
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecallRecord {
    pub recall_id: String,
    pub component: String,
    pub summary: String,
    pub consequence: String,
    pub remedy: String,
    /// ISO `YYYY-MM-DD` when recognised, otherwise the upstream text verbatim
    pub date_initiated: String,
    pub severity: SeverityTier,
}

/// One normalized owner complaint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintRecord {
    pub odi_number: String,
    pub component: String,
    pub summary: String,
    /// ISO `YYYY-MM-DD` when recognised, otherwise the upstream text verbatim
    pub date_of_incident: String,
    pub crash_indicator: bool,
    pub fire_indicator: bool,
    pub severity: SeverityTier,
}

/// Per-tier record counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TierCounts {
    pub total: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl TierCounts {
    pub fn tally<I>(tiers: I) -> Self
    where
        I: IntoIterator<Item = SeverityTier>,
    {
        let mut counts = Self::default();
        for tier in tiers {
            counts.total += 1;
            match tier {
                SeverityTier::High => counts.high += 1,
                SeverityTier::Medium => counts.medium += 1,
                SeverityTier::Low => counts.low += 1,
            }
        }
        counts
    }
}

/// Summary statistics over the full (untruncated) record sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyStatistics {
    pub recalls: TierCounts,
    pub complaints: TierCounts,
    pub crash_count: usize,
    pub fire_count: usize,
}

/// Whether a result was served from cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheState {
    Hit,
    Miss,
}

impl CacheState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheState::Hit => "hit",
            CacheState::Miss => "miss",
        }
    }
}

/// Upstream safety-data feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    Recalls,
    Complaints,
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedKind::Recalls => write!(f, "recalls"),
            FeedKind::Complaints => write!(f, "complaints"),
        }
    }
}

/// Category of a non-fatal feed failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    UpstreamUnavailable,
    MalformedPayload,
}

/// Partial-failure warning attached to a result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedWarning {
    pub feed: FeedKind,
    pub kind: WarningKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub message: String,
}

/// Normalized, classified, sorted safety picture for one vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    pub identity: VehicleIdentity,
    pub recalls: Vec<RecallRecord>,
    pub complaints: Vec<ComplaintRecord>,
    pub statistics: SafetyStatistics,
    pub warnings: Vec<FeedWarning>,
    pub retrieved_at: DateTime<Utc>,
    pub cache_state: CacheState,
}

impl AggregateResult {
    /// Copy of this result relabelled as served from cache for `identity`
    pub fn as_cache_hit_for(&self, identity: &VehicleIdentity) -> Self {
        Self {
            identity: identity.clone(),
            cache_state: CacheState::Hit,
            ..self.clone()
        }
    }
}
