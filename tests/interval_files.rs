use anyhow::Result;
use chrono::{Duration, NaiveDate};
use tempfile::tempdir;

use motion_witness::export::{read_intervals_csv, write_intervals_csv};
use motion_witness::timeline::write_timeline;
use motion_witness::{MotionInterval, Timestamp};

fn at(seconds: i64) -> Timestamp {
    NaiveDate::from_ymd_opt(2024, 5, 1)
        .and_then(|d| d.and_hms_opt(21, 15, 0))
        .expect("valid timestamp")
        + Duration::seconds(seconds)
}

#[test]
fn interval_log_feeds_timeline() -> Result<()> {
    let dir = tempdir()?;
    let csv_path = dir.path().join("nested").join("motion_intervals.csv");
    let html_path = dir.path().join("motion_intervals.html");
    let intervals = vec![
        MotionInterval {
            start: at(0),
            end: at(12) + Duration::milliseconds(250),
        },
        MotionInterval {
            start: at(40),
            end: at(41),
        },
    ];

    write_intervals_csv(&csv_path, &intervals)?;
    let raw = std::fs::read_to_string(&csv_path)?;
    assert_eq!(
        raw,
        "Start,End\n\
         2024-05-01 21:15:00.000000,2024-05-01 21:15:12.250000\n\
         2024-05-01 21:15:40.000000,2024-05-01 21:15:41.000000\n"
    );

    let read_back = read_intervals_csv(&csv_path)?;
    assert_eq!(read_back, intervals);

    write_timeline(&html_path, &read_back)?;
    let html = std::fs::read_to_string(&html_path)?;
    assert!(html.contains("<title>Motion Intervals</title>"));
    assert_eq!(html.matches("fill=\"green\"").count(), 2);
    assert!(html.contains(">Time</text>"));
    assert!(html.contains(">Motion</text>"));
    Ok(())
}

#[test]
fn empty_log_renders_placeholder() -> Result<()> {
    let dir = tempdir()?;
    let csv_path = dir.path().join("empty.csv");
    let html_path = dir.path().join("empty.html");

    write_intervals_csv(&csv_path, &[])?;
    let intervals = read_intervals_csv(&csv_path)?;
    assert!(intervals.is_empty());

    write_timeline(&html_path, &intervals)?;
    let html = std::fs::read_to_string(&html_path)?;
    assert!(html.contains("No motion recorded"));
    assert!(!html.contains("<rect"));
    Ok(())
}

#[test]
fn missing_log_is_an_error() {
    let dir = tempdir().expect("tempdir");
    assert!(read_intervals_csv(&dir.path().join("absent.csv")).is_err());
}
