//! motion_timeline - render a motion interval log as an HTML timeline
//!
//! Reads a `Start,End` CSV written by motiond and draws one horizontal bar per
//! interval against a time axis.

use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

use motion_witness::export::{read_intervals_csv, DEFAULT_CSV_PATH};
use motion_witness::timeline::{write_timeline, DEFAULT_TIMELINE_PATH};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Interval log to read.
    #[arg(long, env = "MOTIONWITNESS_OUTPUT", default_value = DEFAULT_CSV_PATH)]
    input: PathBuf,
    /// Timeline page to write.
    #[arg(long, env = "MOTIONWITNESS_TIMELINE", default_value = DEFAULT_TIMELINE_PATH)]
    output: PathBuf,
    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, default_value = "auto", value_name = "MODE")]
    ui: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let is_tty = std::io::stderr().is_terminal();
    let stdout_is_tty = std::io::stdout().is_terminal();
    let ui = ui::Ui::from_args(Some(&args.ui), is_tty, !stdout_is_tty);

    let intervals = {
        let mut stage = ui.stage("Read interval log");
        match read_intervals_csv(&args.input) {
            Ok(intervals) => intervals,
            Err(err) => {
                stage.fail(format!("{:#}", err));
                return Err(err);
            }
        }
    };
    {
        let mut stage = ui.stage("Render timeline");
        if let Err(err) = write_timeline(&args.output, &intervals) {
            stage.fail(format!("{:#}", err));
            return Err(err);
        }
    }

    let total = intervals
        .iter()
        .fold(chrono::Duration::zero(), |acc, interval| acc + interval.duration());
    ui.summary(&[
        ("intervals", intervals.len().to_string()),
        ("motion", format!("{:.1}s", total.num_milliseconds() as f64 / 1000.0)),
        ("timeline", args.output.display().to_string()),
    ]);
    Ok(())
}
