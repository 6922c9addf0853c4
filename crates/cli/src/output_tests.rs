// SPDX-License-Identifier: MIT

use super::*;
use chrono::TimeZone;

#[test]
fn time_ago_buckets() {
    let now = chrono::Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).single().unwrap();
    let at = |secs: i64| now - chrono::Duration::seconds(secs);

    assert_eq!(format_time_ago(at(5), now), "5s");
    assert_eq!(format_time_ago(at(90), now), "1m");
    assert_eq!(format_time_ago(at(2 * 3600), now), "2h");
    assert_eq!(format_time_ago(at(3 * 86_400), now), "3d");
    // Clock skew never produces negative ages.
    assert_eq!(format_time_ago(at(-30), now), "0s");
}

#[test]
fn format_from_flag() {
    assert_eq!(OutputFormat::from_json_flag(false), OutputFormat::Text);
    assert_eq!(OutputFormat::from_json_flag(true), OutputFormat::Json);
}
