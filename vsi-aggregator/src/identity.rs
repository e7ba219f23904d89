//! Identity resolution
//!
//! Validates and normalizes a vehicle identity before any network call.
//! Make and model are trimmed, whitespace-collapsed and upper-cased, so
//! resolving an already-resolved identity yields the same value.

use crate::models::VehicleIdentity;
use std::sync::Arc;
use thiserror::Error;
use vsi_common::{Clock, SystemClock};

/// Earliest model year accepted
pub const MIN_MODEL_YEAR: i32 = 1900;

const VIN_LENGTH: usize = 17;

/// Caller input errors; never retried, surfaced as 4xx
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("Invalid vehicle identity: {0}")]
    InvalidIdentity(String),

    #[error("Invalid VIN: {0}")]
    InvalidVin(String),
}

/// Builds [`VehicleIdentity`] values from raw request input
#[derive(Clone)]
pub struct IdentityResolver {
    clock: Arc<dyn Clock>,
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl IdentityResolver {
    /// Create resolver; the clock bounds the newest accepted model year
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Newest accepted model year (current year + 1)
    pub fn max_model_year(&self) -> i32 {
        self.clock.current_year() + 1
    }

    /// Resolve raw request fields into a validated identity
    ///
    /// # Errors
    /// - `InvalidIdentity` when make or model is missing/blank, or the year
    ///   is non-numeric or outside `[1900, current year + 1]`
    /// - `InvalidVin` when a non-blank VIN is not 17 characters of
    ///   `[A-HJ-NPR-Z0-9]` (case-insensitive)
    pub fn resolve(
        &self,
        raw_make: Option<&str>,
        raw_model: Option<&str>,
        raw_year: Option<&str>,
        raw_vin: Option<&str>,
    ) -> Result<VehicleIdentity, IdentityError> {
        let make = normalize_name(raw_make)
            .ok_or_else(|| IdentityError::InvalidIdentity("make is required".to_string()))?;
        let model = normalize_name(raw_model)
            .ok_or_else(|| IdentityError::InvalidIdentity("model is required".to_string()))?;
        let year = self.parse_year(raw_year)?;

        let vin = match raw_vin.map(str::trim).filter(|v| !v.is_empty()) {
            Some(vin) => Some(validate_vin(vin)?),
            None => None,
        };

        Ok(VehicleIdentity::new(make, model, year, vin))
    }

    fn parse_year(&self, raw_year: Option<&str>) -> Result<i32, IdentityError> {
        let raw = raw_year
            .map(str::trim)
            .filter(|y| !y.is_empty())
            .ok_or_else(|| IdentityError::InvalidIdentity("year is required".to_string()))?;

        let year: i32 = raw.parse().map_err(|_| {
            IdentityError::InvalidIdentity(format!("year '{}' is not a number", raw))
        })?;

        let max = self.max_model_year();
        if !(MIN_MODEL_YEAR..=max).contains(&year) {
            return Err(IdentityError::InvalidIdentity(format!(
                "year {} outside {}..={}",
                year, MIN_MODEL_YEAR, max
            )));
        }

        Ok(year)
    }
}

fn normalize_name(raw: Option<&str>) -> Option<String> {
    let collapsed = raw?.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed.to_uppercase())
    }
}

/// Check VIN shape; returns the upper-cased VIN
pub fn validate_vin(raw: &str) -> Result<String, IdentityError> {
    let vin = raw.trim().to_ascii_uppercase();

    if vin.chars().count() != VIN_LENGTH {
        return Err(IdentityError::InvalidVin(format!(
            "expected {} characters, got {}",
            VIN_LENGTH,
            vin.chars().count()
        )));
    }

    if let Some(bad) = vin
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() || matches!(c, 'I' | 'O' | 'Q'))
    {
        return Err(IdentityError::InvalidVin(format!(
            "character '{}' is not allowed",
            bad
        )));
    }

    Ok(vin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use vsi_common::ManualClock;

    fn resolver_in(year: i32) -> IdentityResolver {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(year, 6, 1, 0, 0, 0).unwrap());
        IdentityResolver::new(Arc::new(clock))
    }

    #[test]
    fn test_resolve_normalizes_names() {
        let identity = resolver_in(2025)
            .resolve(Some("  jeep "), Some("grand   cherokee"), Some(" 2012 "), None)
            .unwrap();

        assert_eq!(identity.make(), "JEEP");
        assert_eq!(identity.model(), "GRAND CHEROKEE");
        assert_eq!(identity.year(), 2012);
        assert_eq!(identity.vin(), None);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let resolver = resolver_in(2025);
        let first = resolver
            .resolve(Some("Jeep"), Some("Wrangler"), Some("2012"), None)
            .unwrap();
        let year = first.year().to_string();
        let second = resolver
            .resolve(Some(first.make()), Some(first.model()), Some(&year), None)
            .unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_make_or_model() {
        let resolver = resolver_in(2025);
        assert!(matches!(
            resolver.resolve(None, Some("Wrangler"), Some("2012"), None),
            Err(IdentityError::InvalidIdentity(_))
        ));
        assert!(matches!(
            resolver.resolve(Some("Jeep"), Some("   "), Some("2012"), None),
            Err(IdentityError::InvalidIdentity(_))
        ));
    }

    #[test]
    fn test_year_bounds() {
        let resolver = resolver_in(2025);
        assert!(resolver.resolve(Some("Ford"), Some("Model T"), Some("1900"), None).is_ok());
        assert!(resolver.resolve(Some("Ford"), Some("F-150"), Some("2026"), None).is_ok());
        assert!(matches!(
            resolver.resolve(Some("Ford"), Some("F-150"), Some("2027"), None),
            Err(IdentityError::InvalidIdentity(_))
        ));
        assert!(matches!(
            resolver.resolve(Some("Ford"), Some("Model T"), Some("1899"), None),
            Err(IdentityError::InvalidIdentity(_))
        ));
    }

    #[test]
    fn test_non_numeric_year() {
        let result = resolver_in(2025).resolve(Some("Ford"), Some("F-150"), Some("20x2"), None);
        assert!(matches!(result, Err(IdentityError::InvalidIdentity(_))));
    }

    #[test]
    fn test_valid_vin_is_uppercased() {
        let identity = resolver_in(2025)
            .resolve(Some("Jeep"), Some("Wrangler"), Some("2012"), Some("1c4ajwag5cl123456"))
            .unwrap();
        assert_eq!(identity.vin(), Some("1C4AJWAG5CL123456"));
    }

    #[test]
    fn test_blank_vin_is_absent() {
        let identity = resolver_in(2025)
            .resolve(Some("Jeep"), Some("Wrangler"), Some("2012"), Some("  "))
            .unwrap();
        assert_eq!(identity.vin(), None);
    }

    #[test]
    fn test_malformed_vins_rejected() {
        let resolver = resolver_in(2025);
        for vin in [
            "1C4AJWAG5CL12345",   // 16 chars
            "1C4AJWAG5CL1234567", // 18 chars
            "1C4AJWAG5CL12345I",
            "1C4AJWAG5CL12345o",
            "1C4AJWAG5CL12345Q",
            "1C4AJWAG5CL1234-6",
        ] {
            assert!(
                matches!(
                    resolver.resolve(Some("Jeep"), Some("Wrangler"), Some("2012"), Some(vin)),
                    Err(IdentityError::InvalidVin(_))
                ),
                "VIN {} should be rejected",
                vin
            );
        }
    }
}
