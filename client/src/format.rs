//! Display formatters for durations, counts, sizes and timestamps.
//!
//! Every formatter is total: invalid or empty input renders as `""` rather
//! than failing, so view code can call them unconditionally.

#[cfg(test)]
#[path = "format_test.rs"]
mod format_test;

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

const TEN_THOUSAND: i64 = 10_000;
const HUNDRED_MILLION: i64 = 100_000_000;
const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// `m:ss`, or `h:mm:ss` from one hour up.
#[must_use]
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

/// Count with `万`/`亿` abbreviation at one decimal.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_number(n: i64) -> String {
    if n >= HUNDRED_MILLION {
        format!("{:.1}亿", n as f64 / HUNDRED_MILLION as f64)
    } else if n >= TEN_THOUSAND {
        format!("{:.1}万", n as f64 / TEN_THOUSAND as f64)
    } else {
        n.to_string()
    }
}

/// View count as shown on video cards; only the `万` tier applies.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_views(views: i64) -> String {
    if views >= TEN_THOUSAND {
        format!("{:.1}万", views as f64 / TEN_THOUSAND as f64)
    } else {
        views.to_string()
    }
}

/// 1024-based size with up to two decimals (`1536` → `"1.5 KB"`).
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_owned();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let fixed = format!("{value:.2}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", SIZE_UNITS[unit])
}

/// Parse a server timestamp: epoch milliseconds, RFC 3339, or
/// `YYYY-MM-DD HH:MM:SS` taken as UTC.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(millis) = raw.parse::<i64>() {
        return from_millis(millis);
    }
    if let Ok(parsed) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(parsed);
    }
    PrimitiveDateTime::parse(raw, format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
        .ok()
        .map(PrimitiveDateTime::assume_utc)
}

#[must_use]
pub fn from_millis(millis: i64) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).ok()
}

/// Relative time of `t` as seen at `now`, rendered in `now`'s offset.
#[must_use]
pub fn format_time(t: OffsetDateTime, now: OffsetDateTime) -> String {
    let elapsed = now - t;
    if elapsed.whole_minutes() < 1 {
        return "刚刚".to_owned();
    }
    if elapsed.whole_hours() < 1 {
        return format!("{}分钟前", elapsed.whole_minutes());
    }
    if elapsed.whole_days() < 1 {
        return format!("{}小时前", elapsed.whole_hours());
    }
    if elapsed.whole_days() < 30 {
        return format!("{}天前", elapsed.whole_days());
    }

    let local = t.to_offset(now.offset());
    let rendered = if local.year() == now.year() {
        local.format(format_description!("[month]-[day] [hour]:[minute]"))
    } else {
        local.format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
    };
    rendered.unwrap_or_default()
}

/// [`format_time`] over a raw server timestamp.
#[must_use]
pub fn format_time_str(raw: &str, now: OffsetDateTime) -> String {
    parse_timestamp(raw).map_or_else(String::new, |t| format_time(t, now))
}

/// `YYYY-MM-DD` in `t`'s own offset.
#[must_use]
pub fn format_date(t: OffsetDateTime) -> String {
    t.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_default()
}

/// [`format_date`] over a raw server timestamp, in the local offset.
#[must_use]
pub fn format_date_str(raw: &str) -> String {
    let offset = local_now().offset();
    parse_timestamp(raw).map_or_else(String::new, |t| format_date(t.to_offset(offset)))
}

/// Current local time, falling back to UTC when the offset is unknown.
#[must_use]
pub fn local_now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}
