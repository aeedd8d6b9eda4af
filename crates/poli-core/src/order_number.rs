//! # Order Numbers
//!
//! Human-facing sale identifiers of the form `ddMMyyyy-NNN`.
//!
//! ```text
//!   17102026-007
//!   ────┬─── ─┬─
//!       │     └── 7th sale of the business day (zero-padded to 3, grows past 999)
//!       └──────── business day in the restaurant's local time
//! ```
//!
//! The sequence itself is allocated by the store (a per-day counter row
//! incremented inside the sale transaction); this module only decides
//! which day a sale belongs to and how the number is written.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::error::ValidationError;

/// Builds the restaurant's UTC offset from minutes east of UTC.
///
/// ## Example
/// ```rust
/// use poli_core::order_number::business_offset;
///
/// let asuncion = business_offset(-180).unwrap();
/// assert_eq!(asuncion.local_minus_utc(), -3 * 3600);
/// ```
pub fn business_offset(minutes: i32) -> Result<FixedOffset, ValidationError> {
    FixedOffset::east_opt(minutes * 60).ok_or_else(|| ValidationError::OutOfRange {
        field: "business UTC offset".to_string(),
        min: -(24 * 60 - 1),
        max: 24 * 60 - 1,
    })
}

/// The calendar date of `now` in the restaurant's local time.
pub fn business_day(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    now.with_timezone(&offset).date_naive()
}

/// UTC half-open range `[start, end)` covering one local business day.
pub fn business_day_bounds(day: NaiveDate, offset: FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
    let local_midnight = day.and_time(NaiveTime::default());
    let start = offset
        .from_local_datetime(&local_midnight)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&local_midnight));
    (start, start + Duration::days(1))
}

/// Storage key of the per-day counter (`YYYY-MM-DD`).
pub fn business_day_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// Formats an order number.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use poli_core::order_number::format_order_number;
///
/// let day = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
/// assert_eq!(format_order_number(day, 1), "17102026-001");
/// assert_eq!(format_order_number(day, 1234), "17102026-1234");
/// ```
pub fn format_order_number(day: NaiveDate, sequence: i64) -> String {
    format!("{}-{:03}", day.format("%d%m%Y"), sequence)
}

/// Parses an order number back into its day and sequence.
pub fn parse_order_number(value: &str) -> Result<(NaiveDate, i64), ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "orderNumber".to_string(),
        reason: reason.to_string(),
    };

    let (date_part, seq_part) = value
        .trim()
        .split_once('-')
        .ok_or_else(|| invalid("expected ddMMyyyy-NNN"))?;

    if date_part.len() != 8 || !date_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("date must be 8 digits (ddMMyyyy)"));
    }
    let day = NaiveDate::parse_from_str(date_part, "%d%m%Y")
        .map_err(|_| invalid("date is not a valid calendar day"))?;

    if seq_part.len() < 3 || !seq_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("sequence must be at least 3 digits"));
    }
    let sequence: i64 = seq_part
        .parse()
        .map_err(|_| invalid("sequence is too large"))?;
    if sequence == 0 {
        return Err(invalid("sequence starts at 001"));
    }

    Ok((day, sequence))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn asuncion() -> FixedOffset {
        business_offset(-180).unwrap()
    }

    #[test]
    fn test_business_day_uses_local_date() {
        // 01:30 UTC on the 18th is still 22:30 on the 17th in Asunción
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 1, 30, 0).unwrap();
        assert_eq!(
            business_day(now, asuncion()),
            NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
        );

        let now = Utc.with_ymd_and_hms(2026, 10, 18, 3, 0, 0).unwrap();
        assert_eq!(
            business_day(now, asuncion()),
            NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
        );
    }

    #[test]
    fn test_day_bounds() {
        let day = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        let (start, end) = business_day_bounds(day, asuncion());
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 10, 17, 3, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 10, 18, 3, 0, 0).unwrap());
    }

    #[test]
    fn test_format_and_parse() {
        let day = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let number = format_order_number(day, 42);
        assert_eq!(number, "05012026-042");
        assert_eq!(parse_order_number(&number).unwrap(), (day, 42));
        assert_eq!(business_day_key(day), "2026-01-05");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_order_number("").is_err());
        assert!(parse_order_number("17102026").is_err());
        assert!(parse_order_number("32132026-001").is_err());
        assert!(parse_order_number("17102026-01").is_err());
        assert!(parse_order_number("17102026-000").is_err());
        assert!(parse_order_number("1710202a-001").is_err());
    }

    #[test]
    fn test_offset_out_of_range() {
        assert!(business_offset(24 * 60).is_err());
        assert!(business_offset(0).is_ok());
    }
}
