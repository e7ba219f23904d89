//! Loosely-typed upstream payloads and alias-aware field access
//!
//! Upstream feeds answer with either a legacy (`Results`, `ODINumber`,
//! `Crash`) or a current (`results`, `odiNumber`, `crash`) naming
//! convention, and may omit fields entirely. Every field read goes
//! through [`lookup`] with an ordered alias list, so the normalizer never
//! special-cases casing per field.

use serde_json::Value;

/// Results array keys in priority order
pub const RESULTS_KEYS: &[&str] = &["results", "Results"];

/// Raw JSON body returned by a feed client
#[derive(Debug, Clone, PartialEq)]
pub struct RawFeedPayload {
    body: Value,
}

impl RawFeedPayload {
    pub fn new(body: Value) -> Self {
        Self { body }
    }

    /// Parse a response body
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes).map(Self::new)
    }

    /// Result records; empty when neither `results` nor `Results` holds an array
    pub fn results(&self) -> &[Value] {
        lookup(&self.body, RESULTS_KEYS)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// First non-null value among `aliases`, checked in order
pub fn lookup<'a>(record: &'a Value, aliases: &[&str]) -> Option<&'a Value> {
    let object = record.as_object()?;
    aliases
        .iter()
        .filter_map(|key| object.get(*key))
        .find(|value| !value.is_null())
}

/// Field as text; missing or non-scalar values become `""`
pub fn text_field(record: &Value, aliases: &[&str]) -> String {
    match lookup(record, aliases) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Field as a yes/no indicator; missing or unrecognised values are `false`
///
/// Accepts JSON booleans, `"Yes"`/`"No"`, `"Y"`/`"N"`, `"true"`/`"false"`
/// and `1`/`0` (as number or string).
pub fn flag_field(record: &Value, aliases: &[&str]) -> bool {
    match lookup(record, aliases) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64().map(|v| v != 0).unwrap_or(false),
        Some(Value::String(s)) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "yes" | "y" | "true" | "1"
        ),
        _ => false,
    }
}

/// Field as text, joining array values with `", "`
///
/// The complaint feed reports `components` as a comma-joined string in
/// the current API but an array in some responses.
pub fn text_or_list_field(record: &Value, aliases: &[&str]) -> String {
    match lookup(record, aliases) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        _ => text_field(record, aliases),
    }
}
