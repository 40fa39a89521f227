use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::detect::DifferencerSettings;
use crate::export::DEFAULT_CSV_PATH;
use crate::ingest::CaptureSettings;
use crate::timeline::DEFAULT_TIMELINE_PATH;

const DEFAULT_DEVICE: &str = "0";
const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const DEFAULT_TARGET_FPS: u32 = 30;
const DEFAULT_FPS_INTERVAL_SECS: f64 = 2.0;
const DEFAULT_KEY_POLL_MS: u64 = 10;
const DEFAULT_SNAPSHOT_INTERVAL_SECS: f64 = 1.0;

#[derive(Debug, Deserialize, Default)]
struct MotionConfigFile {
    device: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    target_fps: Option<u32>,
    fps_interval_secs: Option<f64>,
    key_poll_ms: Option<u64>,
    detection: Option<DetectionConfigFile>,
    output: Option<OutputConfigFile>,
    display: Option<DisplayConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectionConfigFile {
    min_contour_area: Option<f64>,
    diff_threshold: Option<u8>,
    dilate_iterations: Option<u8>,
    blur_kernel: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct OutputConfigFile {
    csv_path: Option<PathBuf>,
    timeline_path: Option<PathBuf>,
    render_timeline: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct DisplayConfigFile {
    snapshot_path: Option<PathBuf>,
    snapshot_interval_secs: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct MotionConfig {
    pub device: String,
    pub capture: CaptureSettings,
    pub detection: DifferencerSettings,
    pub fps_interval: Duration,
    pub key_poll: Duration,
    pub output: OutputSettings,
    pub display: DisplaySettings,
}

#[derive(Debug, Clone)]
pub struct OutputSettings {
    pub csv_path: PathBuf,
    pub timeline_path: PathBuf,
    pub render_timeline: bool,
}

#[derive(Debug, Clone)]
pub struct DisplaySettings {
    /// When set, the latest annotated frame is kept here as a JPEG.
    pub snapshot_path: Option<PathBuf>,
    pub snapshot_interval: Duration,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_string(),
            capture: CaptureSettings {
                width: DEFAULT_WIDTH,
                height: DEFAULT_HEIGHT,
                target_fps: DEFAULT_TARGET_FPS,
            },
            detection: DifferencerSettings::default(),
            fps_interval: Duration::from_secs_f64(DEFAULT_FPS_INTERVAL_SECS),
            key_poll: Duration::from_millis(DEFAULT_KEY_POLL_MS),
            output: OutputSettings {
                csv_path: PathBuf::from(DEFAULT_CSV_PATH),
                timeline_path: PathBuf::from(DEFAULT_TIMELINE_PATH),
                render_timeline: false,
            },
            display: DisplaySettings {
                snapshot_path: None,
                snapshot_interval: Duration::from_secs_f64(DEFAULT_SNAPSHOT_INTERVAL_SECS),
            },
        }
    }
}

impl MotionConfig {
    /// Defaults, then the JSON file named by `MOTIONWITNESS_CONFIG`, then environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("MOTIONWITNESS_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: MotionConfigFile) -> Result<Self> {
        let mut cfg = Self::default();
        if let Some(device) = file.device {
            cfg.device = device;
        }
        cfg.capture.width = file.width.unwrap_or(cfg.capture.width);
        cfg.capture.height = file.height.unwrap_or(cfg.capture.height);
        cfg.capture.target_fps = file.target_fps.unwrap_or(cfg.capture.target_fps);
        if let Some(secs) = file.fps_interval_secs {
            cfg.fps_interval = secs_to_duration("fps_interval_secs", secs)?;
        }
        if let Some(ms) = file.key_poll_ms {
            cfg.key_poll = Duration::from_millis(ms);
        }

        if let Some(detection) = file.detection {
            let settings = &mut cfg.detection;
            settings.min_contour_area = detection
                .min_contour_area
                .unwrap_or(settings.min_contour_area);
            settings.diff_threshold = detection.diff_threshold.unwrap_or(settings.diff_threshold);
            settings.dilate_iterations = detection
                .dilate_iterations
                .unwrap_or(settings.dilate_iterations);
            settings.blur_kernel = detection.blur_kernel.unwrap_or(settings.blur_kernel);
        }

        if let Some(output) = file.output {
            if let Some(path) = output.csv_path {
                cfg.output.csv_path = path;
            }
            if let Some(path) = output.timeline_path {
                cfg.output.timeline_path = path;
            }
            cfg.output.render_timeline = output
                .render_timeline
                .unwrap_or(cfg.output.render_timeline);
        }

        if let Some(display) = file.display {
            cfg.display.snapshot_path = display.snapshot_path;
            if let Some(secs) = display.snapshot_interval_secs {
                cfg.display.snapshot_interval = secs_to_duration("snapshot_interval_secs", secs)?;
            }
        }
        Ok(cfg)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(device) = std::env::var("MOTIONWITNESS_DEVICE") {
            if !device.trim().is_empty() {
                self.device = device.trim().to_string();
            }
        }
        if let Ok(area) = std::env::var("MOTIONWITNESS_MIN_AREA") {
            self.detection.min_contour_area = area
                .trim()
                .parse()
                .map_err(|_| anyhow!("MOTIONWITNESS_MIN_AREA must be a number"))?;
        }
        if let Ok(path) = std::env::var("MOTIONWITNESS_OUTPUT") {
            if !path.trim().is_empty() {
                self.output.csv_path = PathBuf::from(path);
            }
        }
        if let Ok(path) = std::env::var("MOTIONWITNESS_TIMELINE") {
            if !path.trim().is_empty() {
                self.output.timeline_path = PathBuf::from(path);
                self.output.render_timeline = true;
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.device.trim().is_empty() {
            return Err(anyhow!("device must not be empty"));
        }
        if self.capture.width == 0 || self.capture.height == 0 {
            return Err(anyhow!(
                "capture size must be non-zero (got {}x{})",
                self.capture.width,
                self.capture.height
            ));
        }
        if self.fps_interval.is_zero() {
            return Err(anyhow!("fps interval must be greater than zero"));
        }
        self.detection.validate()?;
        Ok(())
    }
}

fn secs_to_duration(name: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .map_err(|_| anyhow!("{} must be a non-negative number of seconds", name))
}

fn read_config_file(path: &Path) -> Result<MotionConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
