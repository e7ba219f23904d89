//! Severity classification
//!
//! Deterministic keyword heuristics over record text. Keyword lists are
//! configuration ([`SeverityKeywords`]), not control flow.
//!
//! # Rules
//! - Recall: evaluate `consequence`. High keyword → High; else low
//!   keyword → Low; else Medium.
//! - Complaint: crash or fire indicator → High unconditionally. Otherwise
//!   evaluate `summary` with the complaint lists, same precedence.
//!
//! High is always checked before Low, so text matching both lists is High.

use crate::models::{ComplaintRecord, RecallRecord, SeverityTier};
use vsi_common::config::SeverityKeywords;

/// Lower-cased keyword lists for one record domain
#[derive(Debug, Clone, PartialEq, Eq)]
struct KeywordRule {
    high: Vec<String>,
    low: Vec<String>,
}

impl KeywordRule {
    fn new(high: &[String], low: &[String]) -> Self {
        fn prepare(words: &[String]) -> Vec<String> {
            words
                .iter()
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect()
        }
        Self {
            high: prepare(high),
            low: prepare(low),
        }
    }

    fn evaluate(&self, text: &str) -> SeverityTier {
        let text = text.to_lowercase();
        if self.high.iter().any(|k| text.contains(k.as_str())) {
            SeverityTier::High
        } else if self.low.iter().any(|k| text.contains(k.as_str())) {
            SeverityTier::Low
        } else {
            SeverityTier::Medium
        }
    }
}

/// Pure severity classifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeverityClassifier {
    recall: KeywordRule,
    complaint: KeywordRule,
}

impl Default for SeverityClassifier {
    fn default() -> Self {
        Self::new(&SeverityKeywords::default())
    }
}

impl SeverityClassifier {
    pub fn new(keywords: &SeverityKeywords) -> Self {
        Self {
            recall: KeywordRule::new(&keywords.recall_high, &keywords.recall_low),
            complaint: KeywordRule::new(&keywords.complaint_high, &keywords.complaint_low),
        }
    }

    pub fn classify_recall(&self, record: &RecallRecord) -> SeverityTier {
        self.recall.evaluate(&record.consequence)
    }

    pub fn classify_complaint(&self, record: &ComplaintRecord) -> SeverityTier {
        if record.crash_indicator || record.fire_indicator {
            return SeverityTier::High;
        }
        self.complaint.evaluate(&record.summary)
    }
}
