//! V4L2 camera source.
//!
//! Opens a local device node (e.g. /dev/video0), negotiates a capture format,
//! and streams frames through memory-mapped buffers. Buffers are converted to
//! RGB before they leave this module.

use anyhow::{anyhow, Context, Result};
use ouroboros::self_referencing;

use super::normalize::{normalize_to_rgb, PixelFormat};
use super::FrameSource;
use crate::frame::Frame;

/// Fourccs requested in order of preference.
const PREFERRED_FOURCCS: [&[u8; 4]; 3] = [b"YUYV", b"MJPG", b"RGB3"];

/// Configuration for a V4L2 source.
#[derive(Clone, Debug)]
pub struct V4l2Config {
    /// Device path (e.g., "/dev/video0")
    pub device: String,
    /// Requested frame rate; drivers may pick the nearest supported one.
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
}

impl Default for V4l2Config {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            target_fps: 30,
            width: 640,
            height: 480,
        }
    }
}

#[self_referencing]
struct DeviceState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

pub struct V4l2Source {
    config: V4l2Config,
    state: Option<DeviceState>,
    format: PixelFormat,
    active_width: u32,
    active_height: u32,
    frame_count: u64,
}

impl V4l2Source {
    pub fn new(config: V4l2Config) -> Self {
        Self {
            active_width: config.width,
            active_height: config.height,
            config,
            state: None,
            format: PixelFormat::Yuyv,
            frame_count: 0,
        }
    }

    pub fn frames_captured(&self) -> u64 {
        self.frame_count
    }

    fn negotiate(&mut self, device: &mut v4l::Device) -> Result<()> {
        use v4l::video::Capture;

        let mut chosen = None;
        for fourcc in PREFERRED_FOURCCS {
            let mut format = device.format().context("read v4l2 format")?;
            format.width = self.config.width;
            format.height = self.config.height;
            format.fourcc = v4l::FourCC::new(fourcc);
            match device.set_format(&format) {
                Ok(applied) => {
                    if let Some(pixel_format) = PixelFormat::from_fourcc(&applied.fourcc.repr) {
                        chosen = Some((applied, pixel_format));
                        break;
                    }
                }
                Err(err) => log::warn!(
                    "V4l2Source: {} rejected {}: {}",
                    self.config.device,
                    String::from_utf8_lossy(fourcc),
                    err
                ),
            }
        }
        let (applied, pixel_format) = chosen.ok_or_else(|| {
            anyhow!(
                "{} offers none of the supported formats (YUYV, MJPG, RGB3)",
                self.config.device
            )
        })?;

        if self.config.target_fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(self.config.target_fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!(
                    "V4l2Source: failed to set fps on {}: {}",
                    self.config.device,
                    err
                );
            }
        }

        self.format = pixel_format;
        self.active_width = applied.width;
        self.active_height = applied.height;
        Ok(())
    }
}

impl FrameSource for V4l2Source {
    fn describe(&self) -> String {
        self.config.device.clone()
    }

    fn open(&mut self) -> Result<()> {
        use v4l::buffer::Type;

        let mut device = v4l::Device::with_path(&self.config.device)
            .with_context(|| format!("open v4l2 device {}", self.config.device))?;
        self.negotiate(&mut device)?;

        let state = DeviceStateTryBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
            },
        }
        .try_build()?;
        self.state = Some(state);

        log::info!(
            "V4l2Source: connected to {} ({}x{}, {:?})",
            self.config.device,
            self.active_width,
            self.active_height,
            self.format
        );
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<Frame>> {
        use v4l::io::traits::CaptureStream;

        let (width, height, format) = (self.active_width, self.active_height, self.format);
        let state = self.state.as_mut().context("v4l2 device not connected")?;
        let rgb = state.with_stream_mut(|stream| -> Result<Vec<u8>> {
            let (buf, meta) = stream.next().context("capture v4l2 frame")?;
            let used = (meta.bytesused as usize).min(buf.len());
            let used = if used == 0 { buf.len() } else { used };
            normalize_to_rgb(&buf[..used], width, height, format)
        })?;

        self.frame_count += 1;
        Frame::from_rgb(width, height, rgb, crate::now()).map(Some)
    }

    fn release(&mut self) {
        if self.state.take().is_some() {
            log::info!(
                "V4l2Source: released {} after {} frames",
                self.config.device,
                self.frame_count
            );
        }
    }
}
