//! Feed normalization
//!
//! Maps each feed's raw records into [`RecallRecord`] / [`ComplaintRecord`].
//! Mapping is purely structural:
//! - every logical field is read through an ordered alias list
//! - missing fields become `""` / `false`, never an absent field
//! - dates normalize to ISO `YYYY-MM-DD` when recognised, otherwise the
//!   upstream text passes through verbatim
//!
//! Output depends only on the payload: no clock, no randomness. Records
//! leave here with the default severity; the classifier assigns the real
//! tier.

use crate::feeds::payload::{flag_field, text_field, text_or_list_field};
use crate::feeds::RawFeedPayload;
use crate::models::{ComplaintRecord, RecallRecord, SeverityTier};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde_json::Value;
use tracing::debug;

// Recall field aliases (current convention first). The legacy API spelled
// the consequence field "Conequence".
const RECALL_ID: &[&str] = &["NHTSACampaignNumber", "nhtsaCampaignNumber", "campaignNumber"];
const RECALL_COMPONENT: &[&str] = &["Component", "component"];
const RECALL_SUMMARY: &[&str] = &["Summary", "summary"];
const RECALL_CONSEQUENCE: &[&str] = &["Consequence", "consequence", "Conequence"];
const RECALL_REMEDY: &[&str] = &["Remedy", "remedy"];
const RECALL_DATE: &[&str] = &["ReportReceivedDate", "reportReceivedDate"];

// Complaint field aliases (current convention first)
const COMPLAINT_ID: &[&str] = &["odiNumber", "ODINumber", "OdiNumber"];
const COMPLAINT_COMPONENT: &[&str] = &["components", "Components", "Component", "component"];
const COMPLAINT_SUMMARY: &[&str] = &["summary", "Summary"];
const COMPLAINT_DATE: &[&str] = &["dateOfIncident", "DateofIncident", "DateOfIncident"];
const COMPLAINT_CRASH: &[&str] = &["crash", "Crash"];
const COMPLAINT_FIRE: &[&str] = &["fire", "Fire"];

/// Which component comes first in `NN/NN/YYYY` dates
///
/// The recall feed writes day-first dates, the complaint feed month-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlashDateOrder {
    DayFirst,
    MonthFirst,
}

/// Normalize every recall record in `raw`, preserving feed order
pub fn normalize_recalls(raw: &RawFeedPayload) -> Vec<RecallRecord> {
    raw.results()
        .iter()
        .filter(|record| is_record(record))
        .map(|record| RecallRecord {
            recall_id: text_field(record, RECALL_ID),
            component: text_field(record, RECALL_COMPONENT),
            summary: text_field(record, RECALL_SUMMARY),
            consequence: text_field(record, RECALL_CONSEQUENCE),
            remedy: text_field(record, RECALL_REMEDY),
            date_initiated: normalize_date(
                &text_field(record, RECALL_DATE),
                SlashDateOrder::DayFirst,
            ),
            severity: SeverityTier::default(),
        })
        .collect()
}

/// Normalize every complaint record in `raw`, preserving feed order
pub fn normalize_complaints(raw: &RawFeedPayload) -> Vec<ComplaintRecord> {
    raw.results()
        .iter()
        .filter(|record| is_record(record))
        .map(|record| ComplaintRecord {
            odi_number: text_field(record, COMPLAINT_ID),
            component: text_or_list_field(record, COMPLAINT_COMPONENT),
            summary: text_field(record, COMPLAINT_SUMMARY),
            date_of_incident: normalize_date(
                &text_field(record, COMPLAINT_DATE),
                SlashDateOrder::MonthFirst,
            ),
            crash_indicator: flag_field(record, COMPLAINT_CRASH),
            fire_indicator: flag_field(record, COMPLAINT_FIRE),
            severity: SeverityTier::default(),
        })
        .collect()
}

fn is_record(value: &Value) -> bool {
    if value.is_object() {
        true
    } else {
        debug!(value = %value, "Skipping non-object entry in feed results");
        false
    }
}

/// Normalize an upstream date to ISO `YYYY-MM-DD`, or return it unchanged
pub fn normalize_date(raw: &str, order: SlashDateOrder) -> String {
    match parse_upstream_date(raw, order) {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => raw.to_string(),
    }
}

/// Parse a normalized record date; `None` for pass-through text
///
/// Callers sorting chronologically treat `None` as the oldest date.
pub fn parse_record_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

fn parse_upstream_date(raw: &str, order: SlashDateOrder) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(date) = parse_legacy_json_date(raw) {
        return Some(date);
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(raw) {
        return Some(datetime.date_naive());
    }
    if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(datetime.date());
    }
    if raw.len() == 8 && raw.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y%m%d") {
            return Some(date);
        }
    }

    let formats = match order {
        SlashDateOrder::DayFirst => ["%d/%m/%Y", "%m/%d/%Y"],
        SlashDateOrder::MonthFirst => ["%m/%d/%Y", "%d/%m/%Y"],
    };
    formats
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

/// `/Date(1427256000000-0400)/` as emitted by the legacy API
fn parse_legacy_json_date(raw: &str) -> Option<NaiveDate> {
    let inner = raw.strip_prefix("/Date(")?.strip_suffix(")/")?;
    if inner.is_empty() {
        return None;
    }

    // Millis may be negative; the zone suffix always carries a sign after the first char
    let split = inner.get(1..)?.find(['+', '-']).map(|i| i + 1);
    let (millis, zone) = match split {
        Some(i) => {
            let (millis, zone) = inner.split_at(i);
            (millis, Some(zone))
        }
        None => (inner, None),
    };

    let instant = DateTime::from_timestamp_millis(millis.parse().ok()?)?;
    let offset = match zone {
        Some(zone) if zone.len() == 5 => {
            let sign = if zone.starts_with('-') { -1 } else { 1 };
            let hours: i32 = zone.get(1..3)?.parse().ok()?;
            let minutes: i32 = zone.get(3..5)?.parse().ok()?;
            FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))?
        }
        Some(_) => return None,
        None => FixedOffset::east_opt(0)?,
    };

    Some(instant.with_timezone(&offset).date_naive())
}
