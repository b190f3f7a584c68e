use time::macros::datetime;

use super::*;

#[test]
fn duration_switches_to_hours_past_one_hour() {
    assert_eq!(format_duration(0), "0:00");
    assert_eq!(format_duration(65), "1:05");
    assert_eq!(format_duration(3599), "59:59");
    assert_eq!(format_duration(3661), "1:01:01");
}

#[test]
fn number_abbreviates_large_counts() {
    assert_eq!(format_number(999), "999");
    assert_eq!(format_number(12_345), "1.2万");
    assert_eq!(format_number(150_000_000), "1.5亿");
    assert_eq!(format_number(-5), "-5");
}

#[test]
fn views_never_uses_hundred_million_tier() {
    assert_eq!(format_views(9_999), "9999");
    assert_eq!(format_views(25_000), "2.5万");
    assert_eq!(format_views(200_000_000), "20000.0万");
}

#[test]
fn file_size_trims_trailing_zeros() {
    assert_eq!(format_file_size(0), "0 B");
    assert_eq!(format_file_size(512), "512 B");
    assert_eq!(format_file_size(1024), "1 KB");
    assert_eq!(format_file_size(1536), "1.5 KB");
    assert_eq!(format_file_size(5 * 1024 * 1024 + 1024 * 256), "5.25 MB");
}

#[test]
fn parse_timestamp_accepts_millis_and_rfc3339() {
    assert_eq!(parse_timestamp("0"), Some(datetime!(1970-01-01 0:00 UTC)));
    assert_eq!(
        parse_timestamp("2024-03-01T08:30:00Z"),
        Some(datetime!(2024-03-01 8:30 UTC))
    );
    assert_eq!(
        parse_timestamp("2024-03-01 08:30:00"),
        Some(datetime!(2024-03-01 8:30 UTC))
    );
    assert_eq!(parse_timestamp(""), None);
    assert_eq!(parse_timestamp("yesterday"), None);
}

#[test]
fn relative_time_buckets() {
    let now = datetime!(2024-06-15 12:00 UTC);
    assert_eq!(format_time(datetime!(2024-06-15 11:59:30 UTC), now), "刚刚");
    assert_eq!(format_time(datetime!(2024-06-15 11:55 UTC), now), "5分钟前");
    assert_eq!(format_time(datetime!(2024-06-15 9:00 UTC), now), "3小时前");
    assert_eq!(format_time(datetime!(2024-06-13 12:00 UTC), now), "2天前");
}

#[test]
fn future_time_renders_as_just_now() {
    let now = datetime!(2024-06-15 12:00 UTC);
    assert_eq!(format_time(datetime!(2024-06-16 12:00 UTC), now), "刚刚");
}

#[test]
fn old_time_omits_year_only_within_current_year() {
    let now = datetime!(2024-06-15 12:00 UTC);
    assert_eq!(format_time(datetime!(2024-01-02 03:04 UTC), now), "01-02 03:04");
    assert_eq!(format_time(datetime!(2023-01-02 03:04 UTC), now), "2023-01-02 03:04");
}

#[test]
fn absolute_time_uses_viewer_offset() {
    let now = datetime!(2024-06-15 20:00 +08:00);
    assert_eq!(format_time(datetime!(2024-03-01 0:30 UTC), now), "03-01 08:30");
}

#[test]
fn invalid_input_renders_empty() {
    let now = datetime!(2024-06-15 12:00 UTC);
    assert_eq!(format_time_str("", now), "");
    assert_eq!(format_time_str("not a date", now), "");
    assert_eq!(format_date_str(""), "");
}

#[test]
fn date_is_year_month_day() {
    assert_eq!(format_date(datetime!(2024-03-01 23:59 UTC)), "2024-03-01");
}
