//! Frame sources.
//!
//! - V4L2 camera devices (feature: ingest-v4l2)
//! - Synthetic scene (`stub://` devices)
//! - Scripted playback of prepared frames (tests, replays)
//!
//! Every source stamps frames with their wall-clock capture instant. Sources
//! are driven from the single detection thread and hold no shared state.

use anyhow::{anyhow, Result};

mod normalize;
pub mod synthetic;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

pub use normalize::{normalize_to_rgb, PixelFormat};
pub use synthetic::{ScriptedSource, SyntheticConfig, SyntheticSource};
#[cfg(feature = "ingest-v4l2")]
pub use v4l2::{V4l2Config, V4l2Source};

use crate::frame::Frame;

/// A capture device as seen by the detection loop.
pub trait FrameSource {
    /// Human-readable device identifier for logs.
    fn describe(&self) -> String;

    /// Acquire the device. Failure here means the device is unavailable.
    fn open(&mut self) -> Result<()>;

    /// Block until the next frame. `Ok(None)` marks a clean end of stream.
    fn read_frame(&mut self) -> Result<Option<Frame>>;

    /// Give the device back. Must be safe to call on an unopened or released source.
    fn release(&mut self);
}

/// Capture geometry requested from a device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureSettings {
    pub width: u32,
    pub height: u32,
    pub target_fps: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            target_fps: 30,
        }
    }
}

/// Resolve a device string to a source.
///
/// - `stub://<name>`: synthetic scene
/// - `N`: camera index, mapped to `/dev/videoN`
/// - anything else: a device node path
pub fn open_source(device: &str, settings: &CaptureSettings) -> Result<Box<dyn FrameSource>> {
    let device = device.trim();
    if device.is_empty() {
        return Err(anyhow!("capture device must not be empty"));
    }
    if device.starts_with("stub://") {
        let config = SyntheticConfig {
            name: device.to_string(),
            width: settings.width,
            height: settings.height,
            ..SyntheticConfig::default()
        };
        return Ok(Box::new(SyntheticSource::new(config)));
    }
    if device.contains("://") {
        return Err(anyhow!(
            "unsupported capture device '{}' (expected an index, a device path or stub://)",
            device
        ));
    }
    open_camera(&device_path(device), settings)
}

/// Like `open_source`, but a device that cannot be resolved becomes an
/// `UnavailableSource` so the session still runs its cleanup and export.
pub fn resolve_source(device: &str, settings: &CaptureSettings) -> Box<dyn FrameSource> {
    match open_source(device, settings) {
        Ok(source) => source,
        Err(err) => Box::new(UnavailableSource::new(device, err)),
    }
}

/// A device that failed to resolve. `open` always fails with the resolve error.
pub struct UnavailableSource {
    device: String,
    reason: String,
}

impl UnavailableSource {
    pub fn new(device: impl Into<String>, err: anyhow::Error) -> Self {
        Self {
            device: device.into(),
            reason: format!("{:#}", err),
        }
    }
}

impl FrameSource for UnavailableSource {
    fn describe(&self) -> String {
        self.device.clone()
    }

    fn open(&mut self) -> Result<()> {
        Err(anyhow!("{}", self.reason))
    }

    fn read_frame(&mut self) -> Result<Option<Frame>> {
        Err(anyhow!("{} is not open", self.device))
    }

    fn release(&mut self) {}
}

/// `0` becomes `/dev/video0`; paths pass through.
pub fn device_path(device: &str) -> String {
    if !device.is_empty() && device.chars().all(|c| c.is_ascii_digit()) {
        format!("/dev/video{}", device)
    } else {
        device.to_string()
    }
}

#[cfg(feature = "ingest-v4l2")]
fn open_camera(path: &str, settings: &CaptureSettings) -> Result<Box<dyn FrameSource>> {
    Ok(Box::new(V4l2Source::new(V4l2Config {
        device: path.to_string(),
        width: settings.width,
        height: settings.height,
        target_fps: settings.target_fps,
    })))
}

#[cfg(not(feature = "ingest-v4l2"))]
fn open_camera(path: &str, _settings: &CaptureSettings) -> Result<Box<dyn FrameSource>> {
    Err(anyhow!(
        "camera capture from {} requires the ingest-v4l2 feature",
        path
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_index_maps_to_device_node() {
        assert_eq!(device_path("0"), "/dev/video0");
        assert_eq!(device_path("12"), "/dev/video12");
        assert_eq!(device_path("/dev/video3"), "/dev/video3");
    }

    #[test]
    fn stub_devices_resolve_to_synthetic_source() -> Result<()> {
        let source = open_source("stub://front", &CaptureSettings::default())?;
        assert_eq!(source.describe(), "stub://front (synthetic)");
        Ok(())
    }

    #[test]
    fn url_schemes_are_rejected() {
        assert!(open_source("rtsp://camera", &CaptureSettings::default()).is_err());
        assert!(open_source("  ", &CaptureSettings::default()).is_err());
    }

    #[test]
    fn unresolvable_device_fails_on_open() {
        let mut source = resolve_source("rtsp://camera", &CaptureSettings::default());
        assert_eq!(source.describe(), "rtsp://camera");
        let err = source.open().unwrap_err();
        assert!(format!("{err}").contains("unsupported capture device"));
        source.release();
    }
}
