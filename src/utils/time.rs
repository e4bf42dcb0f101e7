use chrono::{DateTime, FixedOffset, NaiveDateTime, SecondsFormat, TimeZone};
use chrono_tz::Tz;

/// Accepted layouts for datetimes that carry no offset
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse an ISO-8601 datetime.
///
/// Strings with an offset (`2024-03-15T09:00:00-07:00`, `...Z`, `...+0200`) keep it.
/// Strings without one are read as wall-clock time in `tz`; for a wall-clock time
/// that occurs twice (DST fold) the earlier instant wins, and a time skipped by a
/// DST gap is rejected.
pub fn parse_iso8601(value: &str, tz: Tz) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt);
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return tz
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.fixed_offset());
        }
    }

    None
}

/// Reformat a datetime as RFC 3339 with an explicit offset.
///
/// Whole seconds print without a fraction; sub-second precision is kept.
pub fn to_iso8601(dt: &DateTime<FixedOffset>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

/// Human-readable rendering in the given timezone, falling back to the raw value
pub fn format_for_display(value: &str, tz: Tz) -> String {
    match parse_iso8601(value, tz) {
        Some(dt) => dt.with_timezone(&tz).format("%a %Y-%m-%d %H:%M").to_string(),
        None => value.to_string(),
    }
}

/// Current time in the given timezone, as used in model prompts
pub fn now_in(tz: Tz) -> DateTime<Tz> {
    chrono::Utc::now().with_timezone(&tz)
}
