//! Standalone timeline rendering of an interval log.
//!
//! Produces a self-contained HTML page holding one inline SVG chart: time on
//! the x axis, each interval as a green bar spanning motion levels 0 to 1.

use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::path::Path;

use crate::export::format_timestamp;
use crate::state::MotionInterval;
use crate::Timestamp;

pub const DEFAULT_TIMELINE_PATH: &str = "motion_intervals.html";

const TITLE: &str = "Motion Intervals";
const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 400.0;
const MARGIN_LEFT: f64 = 60.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 60.0;
const TICKS: i64 = 5;
const BAR_COLOUR: &str = "green";
/// Zero-length intervals still get a visible sliver.
const MIN_BAR_WIDTH: f64 = 1.0;

/// Time range covered by the chart, in milliseconds since the first start.
struct Axis {
    origin: Timestamp,
    span_ms: f64,
}

impl Axis {
    fn new(intervals: &[MotionInterval]) -> Option<Self> {
        let origin = intervals.iter().map(|i| i.start).min()?;
        let last = intervals.iter().map(|i| i.end).max()?;
        let span_ms = (last - origin).num_milliseconds().max(1000) as f64;
        Some(Self { origin, span_ms })
    }

    fn x(&self, at: Timestamp) -> f64 {
        let offset = (at - self.origin).num_milliseconds() as f64;
        MARGIN_LEFT + (offset / self.span_ms) * plot_width()
    }

    fn tick(&self, index: i64) -> Timestamp {
        let step = (self.span_ms / TICKS as f64) as i64;
        self.origin + chrono::Duration::milliseconds(step * index)
    }
}

fn plot_width() -> f64 {
    WIDTH - MARGIN_LEFT - MARGIN_RIGHT
}

fn plot_height() -> f64 {
    HEIGHT - MARGIN_TOP - MARGIN_BOTTOM
}

/// Render the page for `intervals`.
pub fn render_html(intervals: &[MotionInterval]) -> Result<String> {
    let mut svg = String::new();
    render_svg(&mut svg, intervals).context("render timeline svg")?;

    Ok(format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{TITLE}</title>\n</head>\n<body>\n{svg}</body>\n</html>\n"
    ))
}

fn render_svg(out: &mut String, intervals: &[MotionInterval]) -> std::fmt::Result {
    let (plot_left, plot_top) = (MARGIN_LEFT, MARGIN_TOP);
    let plot_bottom = plot_top + plot_height();
    let plot_right = plot_left + plot_width();

    writeln!(
        out,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{WIDTH}\" height=\"{HEIGHT}\" \
         font-family=\"sans-serif\" font-size=\"12\">"
    )?;
    writeln!(
        out,
        "<text x=\"{}\" y=\"24\" text-anchor=\"middle\" font-size=\"16\">{TITLE}</text>",
        WIDTH / 2.0
    )?;

    // Axes and labels.
    writeln!(
        out,
        "<line x1=\"{plot_left}\" y1=\"{plot_bottom}\" x2=\"{plot_right}\" y2=\"{plot_bottom}\" stroke=\"black\"/>"
    )?;
    writeln!(
        out,
        "<line x1=\"{plot_left}\" y1=\"{plot_top}\" x2=\"{plot_left}\" y2=\"{plot_bottom}\" stroke=\"black\"/>"
    )?;
    writeln!(
        out,
        "<text x=\"{}\" y=\"{}\" text-anchor=\"middle\">Time</text>",
        plot_left + plot_width() / 2.0,
        HEIGHT - 12.0
    )?;
    writeln!(
        out,
        "<text x=\"16\" y=\"{y}\" text-anchor=\"middle\" transform=\"rotate(-90 16 {y})\">Motion</text>",
        y = plot_top + plot_height() / 2.0
    )?;
    for (level, y) in [("0", plot_bottom), ("1", plot_top)] {
        writeln!(
            out,
            "<text x=\"{}\" y=\"{}\" text-anchor=\"end\">{level}</text>",
            plot_left - 6.0,
            y + 4.0
        )?;
    }

    let Some(axis) = Axis::new(intervals) else {
        writeln!(
            out,
            "<text x=\"{}\" y=\"{}\" text-anchor=\"middle\">No motion recorded</text>",
            plot_left + plot_width() / 2.0,
            plot_top + plot_height() / 2.0
        )?;
        return writeln!(out, "</svg>");
    };

    for index in 0..=TICKS {
        let at = axis.tick(index);
        let x = axis.x(at);
        writeln!(
            out,
            "<line x1=\"{x:.1}\" y1=\"{plot_bottom}\" x2=\"{x:.1}\" y2=\"{}\" stroke=\"black\"/>",
            plot_bottom + 5.0
        )?;
        writeln!(
            out,
            "<text x=\"{x:.1}\" y=\"{}\" text-anchor=\"middle\">{}</text>",
            plot_bottom + 20.0,
            at.format("%H:%M:%S")
        )?;
    }

    for interval in intervals {
        let left = axis.x(interval.start);
        let width = (axis.x(interval.end) - left).max(MIN_BAR_WIDTH);
        writeln!(
            out,
            "<rect x=\"{left:.1}\" y=\"{plot_top}\" width=\"{width:.1}\" height=\"{}\" fill=\"{BAR_COLOUR}\">\
             <title>{} to {}</title></rect>",
            plot_height(),
            format_timestamp(&interval.start),
            format_timestamp(&interval.end)
        )?;
    }

    writeln!(out, "</svg>")
}

pub fn write_timeline(path: &Path, intervals: &[MotionInterval]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output directory {}", parent.display()))?;
    }
    std::fs::write(path, render_html(intervals)?)
        .with_context(|| format!("write timeline {}", path.display()))?;
    log::info!("rendered {} interval(s) to {}", intervals.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn t(seconds: i64) -> Timestamp {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .and_then(|d| d.and_hms_opt(9, 0, 0))
            .expect("valid timestamp")
            + Duration::seconds(seconds)
    }

    #[test]
    fn one_bar_per_interval() -> Result<()> {
        let html = render_html(&[
            MotionInterval {
                start: t(0),
                end: t(10),
            },
            MotionInterval {
                start: t(30),
                end: t(45),
            },
        ])?;
        assert!(html.contains("<title>Motion Intervals</title>"));
        assert_eq!(html.matches("<rect ").count(), 2);
        assert!(html.contains(">Time<"));
        assert!(html.contains(">Motion<"));
        Ok(())
    }

    #[test]
    fn bars_are_placed_proportionally() {
        let intervals = [
            MotionInterval {
                start: t(0),
                end: t(50),
            },
            MotionInterval {
                start: t(50),
                end: t(100),
            },
        ];
        let axis = Axis::new(&intervals).expect("axis");
        assert_eq!(axis.x(t(0)), MARGIN_LEFT);
        assert_eq!(axis.x(t(100)), MARGIN_LEFT + plot_width());
        assert_eq!(axis.x(t(50)), MARGIN_LEFT + plot_width() / 2.0);
    }

    #[test]
    fn empty_log_renders_placeholder() -> Result<()> {
        let html = render_html(&[])?;
        assert!(html.contains("No motion recorded"));
        assert!(!html.contains("<rect "));
        Ok(())
    }

    #[test]
    fn zero_length_interval_is_still_visible() -> Result<()> {
        let html = render_html(&[MotionInterval {
            start: t(5),
            end: t(5),
        }])?;
        assert!(html.contains(&format!("width=\"{MIN_BAR_WIDTH:.1}\"")));
        Ok(())
    }
}
