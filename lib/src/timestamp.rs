use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Parse the timestamp formats found in registry `time` maps.
///
/// Publish clients write RFC 3339 (`2020-01-01T00:00:00.000Z`), but older
/// documents also carry zone-less datetimes and bare dates, both read as
/// UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    if let Ok(t) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(DateTime::from_naive_utc_and_offset(t, Utc));
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return d
            .and_hms_opt(0, 0, 0)
            .map(|t| DateTime::from_naive_utc_and_offset(t, Utc));
    }
    None
}
