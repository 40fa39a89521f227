//! Interval log export.
//!
//! The interval log is a flat CSV file with a `Start,End` header and one row
//! per closed interval. Timestamps use a locale-independent, lexically sortable
//! format (`2024-05-01 09:00:00.000000`). The file is written once, at session
//! end; intervals gathered before an unclean process exit are lost.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

use crate::state::MotionInterval;
use crate::Timestamp;

pub const DEFAULT_CSV_PATH: &str = "motion_intervals.csv";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

const HEADER: [&str; 2] = ["Start", "End"];

/// Formats accepted when reading a log back, newest first.
const ACCEPTED_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Serialize, Deserialize)]
struct IntervalRow {
    #[serde(rename = "Start")]
    start: String,
    #[serde(rename = "End")]
    end: String,
}

pub fn format_timestamp(at: &Timestamp) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a timestamp in any of the accepted layouts, including RFC 3339.
/// Offsets are dropped after conversion; the log holds local wall-clock times.
pub fn parse_timestamp(raw: &str) -> Result<Timestamp> {
    let raw = raw.trim();
    for format in ACCEPTED_FORMATS {
        if let Ok(at) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(at);
        }
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.naive_local())
        .map_err(|_| anyhow!("unrecognized timestamp '{}'", raw))
}

/// Write the interval log to any writer.
pub fn write_intervals<W: io::Write>(writer: W, intervals: &[MotionInterval]) -> Result<()> {
    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv.write_record(HEADER)?;
    for interval in intervals {
        csv.serialize(IntervalRow {
            start: format_timestamp(&interval.start),
            end: format_timestamp(&interval.end),
        })?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_intervals_csv(path: &Path, intervals: &[MotionInterval]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output directory {}", parent.display()))?;
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("create interval log {}", path.display()))?;
    write_intervals(file, intervals)?;
    log::info!(
        "wrote {} motion interval(s) to {}",
        intervals.len(),
        path.display()
    );
    Ok(())
}

/// Read an interval log back. Rows must carry both columns and satisfy `start <= end`.
pub fn read_intervals<R: io::Read>(reader: R) -> Result<Vec<MotionInterval>> {
    let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = csv.headers()?.clone();
    if headers.iter().collect::<Vec<_>>() != HEADER {
        return Err(anyhow!(
            "interval log header must be Start,End (got {})",
            headers.iter().collect::<Vec<_>>().join(",")
        ));
    }

    let mut intervals = Vec::new();
    for (index, row) in csv.deserialize::<IntervalRow>().enumerate() {
        let line = index + 2;
        let row = row.with_context(|| format!("interval log line {}", line))?;
        let start = parse_timestamp(&row.start).with_context(|| format!("line {} Start", line))?;
        let end = parse_timestamp(&row.end).with_context(|| format!("line {} End", line))?;
        if end < start {
            return Err(anyhow!("line {}: End precedes Start", line));
        }
        intervals.push(MotionInterval { start, end });
    }
    Ok(intervals)
}

pub fn read_intervals_csv(path: &Path) -> Result<Vec<MotionInterval>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("open interval log {}", path.display()))?;
    read_intervals(file)
}
