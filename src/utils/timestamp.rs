//! Timestamp format conversion
//!
//! Token timestamps were first written in PostgreSQL's text rendering
//! (`2022-02-02 18:01:49.345261+00`). The canonical form is RFC 3339 with
//! nanosecond precision and an explicit `Z` (`2022-02-02T18:01:49.345261000Z`).

use chrono::{NaiveDateTime, Timelike};

/// Offset suffix of the legacy rendering
pub const LEGACY_UTC_SUFFIX: &str = "+00";

/// UTC marker of the canonical rendering
pub const CANONICAL_UTC_SUFFIX: &str = "Z";

const LEGACY_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

pub fn is_canonical(timestamp: &str) -> bool {
    timestamp.ends_with(CANONICAL_UTC_SUFFIX)
}

pub fn is_legacy(timestamp: &str) -> bool {
    timestamp.ends_with(LEGACY_UTC_SUFFIX)
}

/// Convert a legacy timestamp to canonical form.
///
/// Microseconds are zero-extended to nanoseconds; fractional digits past the
/// sixth are dropped, never rounded.
pub fn legacy_to_canonical(timestamp: &str) -> Result<String, TimestampError> {
    let body = timestamp
        .strip_suffix(LEGACY_UTC_SUFFIX)
        .ok_or_else(|| TimestampError::NotLegacy(timestamp.to_string()))?;

    let parsed = NaiveDateTime::parse_from_str(body, LEGACY_FORMAT).map_err(|e| {
        TimestampError::Parse {
            timestamp: timestamp.to_string(),
            reason: e.to_string(),
        }
    })?;

    // Leap seconds carry nanos >= 1s, which would not fit six digits
    let micros = parsed.nanosecond() / 1_000;
    if micros >= 1_000_000 {
        return Err(TimestampError::Parse {
            timestamp: timestamp.to_string(),
            reason: "leap second".to_string(),
        });
    }

    Ok(format!(
        "{}.{:06}000{}",
        parsed.format("%Y-%m-%dT%H:%M:%S"),
        micros,
        CANONICAL_UTC_SUFFIX
    ))
}

/// Errors converting timestamps
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimestampError {
    #[error("Timestamp does not end with +00: {0}")]
    NotLegacy(String),

    #[error("Cannot parse timestamp {timestamp}: {reason}")]
    Parse { timestamp: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANONICAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.9fZ";

    /// Strict check that `timestamp` is exactly in canonical form
    fn is_canonical_format(timestamp: &str) -> bool {
        // 2022-02-02T18:01:49.345261000Z
        timestamp.len() == 30 && NaiveDateTime::parse_from_str(timestamp, CANONICAL_FORMAT).is_ok()
    }

    #[test]
    fn test_converts_microsecond_timestamp_exactly() {
        assert_eq!(
            legacy_to_canonical("2022-02-02 18:01:49.345261+00").unwrap(),
            "2022-02-02T18:01:49.345261000Z"
        );
    }

    #[test]
    fn test_zero_extends_short_fractions() {
        assert_eq!(
            legacy_to_canonical("2023-01-01 00:00:00.000000+00").unwrap(),
            "2023-01-01T00:00:00.000000000Z"
        );
        assert_eq!(
            legacy_to_canonical("2023-01-01 00:00:00.5+00").unwrap(),
            "2023-01-01T00:00:00.500000000Z"
        );
        // PostgreSQL omits the fraction entirely when it is zero
        assert_eq!(
            legacy_to_canonical("2023-01-01 12:30:00+00").unwrap(),
            "2023-01-01T12:30:00.000000000Z"
        );
    }

    #[test]
    fn test_never_invents_sub_microsecond_digits() {
        assert_eq!(
            legacy_to_canonical("2022-02-02 18:01:49.3452619+00").unwrap(),
            "2022-02-02T18:01:49.345261000Z"
        );
    }

    #[test]
    fn test_converted_output_is_canonical() {
        let inputs = [
            "2022-02-02 18:01:49.345261+00",
            "1999-12-31 23:59:59.999999+00",
            "2024-02-29 00:00:00.000001+00",
            "2030-06-15 08:07:06+00",
        ];
        for input in inputs {
            let converted = legacy_to_canonical(input).unwrap();
            assert!(is_canonical(&converted), "{converted}");
            assert!(is_canonical_format(&converted), "{converted}");
            assert!(!is_legacy(&converted));
        }
    }

    #[test]
    fn test_rejects_non_legacy_and_garbage() {
        assert_eq!(
            legacy_to_canonical("2022-02-02T18:01:49.345261000Z"),
            Err(TimestampError::NotLegacy("2022-02-02T18:01:49.345261000Z".to_string()))
        );
        assert!(matches!(
            legacy_to_canonical("yesterday+00"),
            Err(TimestampError::Parse { .. })
        ));
        assert!(matches!(
            legacy_to_canonical("2022-13-02 18:01:49.345261+00"),
            Err(TimestampError::Parse { .. })
        ));
    }

    #[test]
    fn test_canonical_format_is_strict() {
        assert!(is_canonical_format("2022-02-02T18:01:49.345261000Z"));
        assert!(!is_canonical_format("2022-02-02T18:01:49.345261Z"));
        assert!(!is_canonical_format("2022-02-02 18:01:49.345261000Z"));
    }
}
