//! motiond - watch a camera and log motion intervals
//!
//! This daemon:
//! 1. Opens the configured capture device (camera index, device path, or stub://)
//! 2. Primes a reference frame and flags frames that differ from it
//! 3. Records when motion starts and stops
//! 4. On quit (q / Ctrl-C), end of stream or failure, writes the interval log
//! 5. Optionally renders the log as an HTML timeline

use anyhow::{anyhow, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

use motion_witness::export::read_intervals_csv;
use motion_witness::timeline::write_timeline;
use motion_witness::{
    resolve_source, Display, HeadlessDisplay, MotionConfig, QuitSignal, Session, SessionSettings,
    SnapshotDisplay, StopReason,
};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Capture device: camera index, device node path, or stub://<name>.
    #[arg(long)]
    device: Option<String>,
    /// Minimum contour area (px²) that counts as motion.
    #[arg(long)]
    min_area: Option<f64>,
    /// Output path for the interval log.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Render an HTML timeline of the intervals after the session.
    #[arg(long)]
    timeline: bool,
    /// Output path for the timeline (implies --timeline).
    #[arg(long)]
    timeline_path: Option<PathBuf>,
    /// Keep the latest annotated frame at this path as a JPEG.
    #[arg(long)]
    snapshot: Option<PathBuf>,
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

    let cfg = {
        let _stage = ui.stage("Load configuration");
        let mut cfg = MotionConfig::load()?;
        apply_args(&mut cfg, &args);
        cfg.validate()?;
        cfg
    };

    let quit = QuitSignal::new();
    quit.install_ctrlc()?;

    let mut source = resolve_source(&cfg.device, &cfg.capture);
    let mut display: Box<dyn Display> = match &cfg.display.snapshot_path {
        Some(path) => Box::new(SnapshotDisplay::new(
            quit.clone(),
            path.clone(),
            cfg.display.snapshot_interval,
        )),
        None => Box::new(HeadlessDisplay::new(quit.clone())),
    };

    let settings = SessionSettings {
        key_poll: cfg.key_poll,
        fps_interval: cfg.fps_interval,
        csv_path: cfg.output.csv_path.clone(),
        ..SessionSettings::default()
    };

    log::info!(
        "watching {} (min area {} px², press Ctrl-C to stop)",
        cfg.device,
        cfg.detection.min_contour_area
    );
    let report = {
        let mut stage = ui.stage("Watch for motion");
        let session = Session::new(
            source.as_mut(),
            display.as_mut(),
            cfg.detection.clone(),
            settings,
        )?;
        let report = session.run()?;
        if let Some(err) = report.error() {
            stage.fail(err.kind());
        }
        report
    };

    ui.summary(&[
        ("stopped", describe_stop(&report.stop)),
        ("frames", report.frames_read.to_string()),
        ("boundaries", report.boundaries.len().to_string()),
        ("intervals", report.intervals.len().to_string()),
        ("fps", format!("{:.2}", report.last_fps)),
        ("log", cfg.output.csv_path.display().to_string()),
    ]);

    if cfg.output.render_timeline {
        let _stage = ui.stage("Render timeline");
        let intervals = read_intervals_csv(&cfg.output.csv_path)?;
        write_timeline(&cfg.output.timeline_path, &intervals)?;
        println!("timeline written to {}", cfg.output.timeline_path.display());
    }

    match report.error() {
        Some(err) => Err(anyhow!("{}", err)),
        None => Ok(()),
    }
}

fn apply_args(cfg: &mut MotionConfig, args: &Args) {
    if let Some(device) = &args.device {
        cfg.device = device.clone();
    }
    if let Some(area) = args.min_area {
        cfg.detection.min_contour_area = area;
    }
    if let Some(path) = &args.output {
        cfg.output.csv_path = path.clone();
    }
    if args.timeline {
        cfg.output.render_timeline = true;
    }
    if let Some(path) = &args.timeline_path {
        cfg.output.timeline_path = path.clone();
        cfg.output.render_timeline = true;
    }
    if let Some(path) = &args.snapshot {
        cfg.display.snapshot_path = Some(path.clone());
    }
}

fn describe_stop(stop: &StopReason) -> String {
    match stop {
        StopReason::QuitKey => "quit".to_string(),
        StopReason::EndOfStream => "end of stream".to_string(),
        StopReason::Failed(err) => format!("{} ({})", err.kind(), err),
    }
}
