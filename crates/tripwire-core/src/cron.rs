// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Pure cron evaluation: next fire instant for an expression in a timezone.
//!
//! Shared by the trigger service (first schedule on create/update) and the
//! scheduler engine (next occurrence after a cron fire). Deterministic: the
//! same `(expr, tz, from)` triple always yields the same instant.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::error::{Error, Result};

/// Convert a standard 5-field cron expression to the 6-field form the parser
/// expects, by prepending a zero seconds field. 6-field (seconds-first) and
/// 7-field (with year) expressions pass through unchanged.
fn normalize_expression(expr: &str) -> String {
    match expr.split_whitespace().count() {
        5 => format!("0 {expr}"),
        _ => expr.to_string(),
    }
}

fn parse_expression(expr: &str) -> Result<::cron::Schedule> {
    // Field-based syntax only; "@yearly"-style aliases are not accepted.
    if expr.trim_start().starts_with('@') {
        return Err(Error::validation(format!(
            "invalid cron expression '{expr}': aliases are not supported"
        )));
    }
    normalize_expression(expr)
        .parse::<::cron::Schedule>()
        .map_err(|e| Error::validation(format!("invalid cron expression '{expr}': {e}")))
}

/// Validate a cron expression without computing an occurrence.
pub fn validate_expression(expr: &str) -> Result<()> {
    parse_expression(expr).map(|_| ())
}

/// Resolve a timezone name to an IANA zone. Empty or blank input means UTC.
pub fn resolve_timezone(tz: &str) -> Result<Tz> {
    let trimmed = tz.trim();
    if trimmed.is_empty() {
        return Ok(Tz::UTC);
    }
    trimmed
        .parse::<Tz>()
        .map_err(|_| Error::validation(format!("invalid timezone: {trimmed}")))
}

/// Compute the next fire instant strictly after `from`.
///
/// The reference instant is converted into `tz` for the occurrence search and
/// the result is returned in UTC. Fails on an invalid expression or an
/// unknown timezone.
pub fn next_fire_time(expr: &str, tz: &str, from: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let zone = resolve_timezone(tz)?;
    let schedule = parse_expression(expr)?;

    let next = schedule
        .after(&from.with_timezone(&zone))
        .next()
        .ok_or_else(|| {
            Error::validation(format!("cron expression '{expr}' has no upcoming occurrences"))
        })?;

    Ok(next.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn next_fire_time_utc() {
        let from = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 0).unwrap();
        let next = next_fire_time("*/5 * * * *", "", from).unwrap();
        // Next multiple of 5 minutes: 03:05.
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 1, 2, 3, 5, 0).unwrap());
    }

    #[test]
    fn next_fire_time_in_timezone() {
        // 02:00 in America/New_York (UTC-5 in January).
        let from = Utc.with_ymd_and_hms(2025, 1, 2, 7, 0, 0).unwrap();
        let next = next_fire_time("0 3 * * *", "America/New_York", from).unwrap();
        // Next 3 AM New York is 08:00 UTC.
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 1, 2, 8, 0, 0).unwrap());
    }

    #[test]
    fn six_field_expression_has_seconds() {
        let from = Utc.with_ymd_and_hms(2025, 1, 2, 3, 0, 0).unwrap();
        let next = next_fire_time("30 * * * * *", "UTC", from).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 1, 2, 3, 0, 30).unwrap());
    }

    #[test]
    fn strictly_after_reference() {
        // A reference that lies exactly on a boundary must advance.
        let from = Utc.with_ymd_and_hms(2025, 1, 2, 3, 5, 0).unwrap();
        let next = next_fire_time("*/5 * * * *", "UTC", from).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 1, 2, 3, 10, 0).unwrap());
    }

    #[test]
    fn deterministic_for_same_inputs() {
        let from = Utc.with_ymd_and_hms(2025, 3, 1, 12, 34, 56).unwrap();
        let a = next_fire_time("15 9 * * 1-5", "Europe/Warsaw", from).unwrap();
        let b = next_fire_time("15 9 * * 1-5", "Europe/Warsaw", from).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn invalid_expression_is_rejected() {
        let err = next_fire_time("not-a-cron", "", Utc::now()).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("invalid cron expression"));
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        let err = next_fire_time("*/5 * * * *", "Mars/Olympus_Mons", Utc::now()).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("invalid timezone"));
    }

    #[test]
    fn blank_timezone_resolves_to_utc() {
        assert_eq!(resolve_timezone("").unwrap(), Tz::UTC);
        assert_eq!(resolve_timezone("  ").unwrap(), Tz::UTC);
        assert_eq!(resolve_timezone("UTC").unwrap().name(), "UTC");
    }

    #[test]
    fn validate_expression_only_parses() {
        assert!(validate_expression("*/1 * * * *").is_ok());
        assert!(validate_expression("0 9 * * 1-5").is_ok());
        assert!(validate_expression("@yearly").is_err());
        assert!(validate_expression("61 * * * *").is_err());
    }
}
