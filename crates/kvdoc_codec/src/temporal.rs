//! Date and time parsing for temporal attributes.

use crate::value::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Naive layouts accepted besides RFC 3339. Interpreted as UTC.
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Parses a stored value into a point in time.
///
/// Accepts:
/// - RFC 3339 text (`2016-11-22T08:30:00.000Z`, any offset)
/// - naive `YYYY-MM-DD HH:MM:SS` / `YYYY-MM-DDTHH:MM:SS` text, taken as UTC
/// - `YYYY-MM-DD` text, taken as midnight UTC
/// - integers and floats, taken as milliseconds since the Unix epoch
/// - values that already are dates
///
/// Returns `None` for anything else.
pub fn parse_datetime(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::DateTime(dt) => Some(*dt),
        Value::Integer(millis) => Utc.timestamp_millis_opt(*millis).single(),
        #[allow(clippy::cast_possible_truncation)]
        Value::Float(millis) if millis.is_finite() => {
            Utc.timestamp_millis_opt(*millis as i64).single()
        }
        Value::Text(text) => parse_text(text.trim()),
        _ => None,
    }
}

fn parse_text(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn parses_rfc3339_with_offset() {
        let parsed = parse_datetime(&Value::from("2016-11-22T10:30:00+02:00")).unwrap();
        assert_eq!(parsed, utc(2016, 11, 22, 8, 30, 0));
    }

    #[test]
    fn parses_naive_layouts_as_utc() {
        assert_eq!(
            parse_datetime(&Value::from("2016-11-22 08:30:00")),
            Some(utc(2016, 11, 22, 8, 30, 0))
        );
        assert_eq!(
            parse_datetime(&Value::from("2016-11-22")),
            Some(utc(2016, 11, 22, 0, 0, 0))
        );
    }

    #[test]
    fn parses_epoch_millis() {
        assert_eq!(
            parse_datetime(&Value::Integer(1_479_803_400_000)),
            Some(utc(2016, 11, 22, 8, 30, 0))
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_datetime(&Value::from("not a date")), None);
        assert_eq!(parse_datetime(&Value::Bool(true)), None);
        assert_eq!(parse_datetime(&Value::Null), None);
    }
}
