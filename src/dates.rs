//! Temporal coercion and arithmetic backing the date predicates.
//!
//! Every date operand passes through [`ensure_datetime`] first, so the
//! evaluator only ever works with timezone-aware instants. Naive inputs are
//! assumed UTC; numeric inputs are Unix epoch seconds.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::DilemmaError;
use crate::types::{TimeUnit, Value};

/// Parse formats tried in order for string operands. Date-only strings get
/// midnight; anything without an offset is taken as UTC.
const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Coerce a runtime value into a timezone-aware datetime.
///
/// Accepts timestamps as-is, strings in the supported formats, and numbers
/// as Unix epoch seconds. Everything else is a [`DilemmaError::DateTime`].
pub(crate) fn ensure_datetime(value: &Value) -> Result<DateTime<FixedOffset>, DilemmaError> {
    match value {
        Value::Timestamp(dt) => Ok(*dt),
        Value::String(s) => parse_datetime_str(s),
        // Integer epochs must not round-trip through f64: above 2^53 the
        // mantissa can no longer hold every second.
        Value::Int(n) => DateTime::from_timestamp(*n, 0)
            .map(|dt| dt.fixed_offset())
            .ok_or_else(|| DilemmaError::DateTime {
                detail: format!("{n} is out of range for an epoch timestamp"),
            }),
        Value::Float(f) => from_epoch_seconds(*f),
        other => Err(DilemmaError::DateTime {
            detail: format!(
                "cannot interpret {} value as a datetime",
                other.type_name()
            ),
        }),
    }
}

fn parse_datetime_str(s: &str) -> Result<DateTime<FixedOffset>, DilemmaError> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(|| invalid(s))?;
        return Ok(assume_utc(midnight));
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(assume_utc(naive));
        }
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z") {
        return Ok(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt);
    }
    Err(invalid(s))
}

fn invalid(s: &str) -> DilemmaError {
    DilemmaError::DateTime {
        detail: format!("'{s}' is not a recognized datetime format"),
    }
}

fn assume_utc(naive: NaiveDateTime) -> DateTime<FixedOffset> {
    Utc.from_utc_datetime(&naive).fixed_offset()
}

fn from_epoch_seconds(secs: f64) -> Result<DateTime<FixedOffset>, DilemmaError> {
    if !secs.is_finite() {
        return Err(DilemmaError::DateTime {
            detail: format!("{secs} is not a valid epoch timestamp"),
        });
    }
    // Floor keeps the fractional part in [0, 1) for negative epochs too.
    let whole = secs.floor() as i64;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let nanos = ((secs - whole as f64) * 1e9) as u32;
    DateTime::from_timestamp(whole, nanos)
        .map(|dt| dt.fixed_offset())
        .ok_or_else(|| DilemmaError::DateTime {
            detail: format!("{secs} is out of range for an epoch timestamp"),
        })
}

/// Fixed-length duration for `within` and `older than`. Months and years use
/// 30-day and 365-day approximations.
pub(crate) fn unit_duration(amount: i64, unit: TimeUnit) -> Duration {
    Duration::seconds(amount.saturating_mul(unit.seconds()))
}

pub(crate) fn now() -> DateTime<FixedOffset> {
    Utc::now().fixed_offset()
}
