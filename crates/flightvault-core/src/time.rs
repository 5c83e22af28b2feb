//! Timestamp exchange format.
//!
//! Every timestamp crossing the engine boundary is RFC 3339 with
//! microsecond precision and an explicit offset. Offset-less input is
//! rejected rather than interpreted as local time.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::errors::{FlightVaultResult, RecoveryError};

/// Render a timestamp in the canonical exchange format
/// (`2024-05-01T12:00:00.000000Z`).
///
/// The fixed width keeps lexical and chronological order identical, which
/// the SQLite adapter relies on for range predicates.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an RFC 3339 timestamp with an explicit offset into UTC.
pub fn parse_timestamp(input: &str) -> FlightVaultResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(input.trim())
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| {
            RecoveryError::InvalidTimestamp {
                input: input.to_string(),
                reason: e.to_string(),
            }
            .into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn offset_is_normalized_to_utc() {
        let ts = parse_timestamp("2024-05-01T14:30:00.250+02:00").unwrap();
        assert_eq!(format_timestamp(&ts), "2024-05-01T12:30:00.250000Z");
    }

    #[test]
    fn missing_offset_is_rejected() {
        assert!(parse_timestamp("2024-05-01 14:30:00").is_err());
        assert!(parse_timestamp("2024-05-01T14:30:00").is_err());
    }

    #[test]
    fn formatted_timestamps_sort_chronologically() {
        let a = Utc.with_ymd_and_hms(2024, 1, 9, 23, 59, 59).unwrap();
        let b = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        assert!(format_timestamp(&a) < format_timestamp(&b));
    }
}
