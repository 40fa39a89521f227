//! Frame containers.
//!
//! - `Frame`: one captured image plus its wall-clock capture instant.
//! - `ReferenceFrame`: the normalized static background a session compares against.
//! - `MotionMask`: binary per-pixel change map derived from one comparison.
//!
//! Frames are owned by the loop iteration that read them. The reference is owned
//! by `FrameDifferencer` and never handed out mutably.

use anyhow::{anyhow, Result};
use image::{GrayImage, RgbImage};

use crate::Timestamp;

// ----------------------------------------------------------------------------
// Frame: one captured image
// ----------------------------------------------------------------------------

/// A captured frame, always stored as 8-bit RGB so overlays can be drawn in colour.
#[derive(Clone, Debug)]
pub struct Frame {
    image: RgbImage,

    /// Wall-clock capture instant. Transition timestamps are taken from here.
    pub captured_at: Timestamp,
}

impl Frame {
    /// Wrap an RGB image. Rejects zero-sized images.
    pub fn from_image(image: RgbImage, captured_at: Timestamp) -> Result<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(anyhow!(
                "frame must be non-empty (got {}x{})",
                image.width(),
                image.height()
            ));
        }
        Ok(Self { image, captured_at })
    }

    /// Build a frame from packed 3-channel RGB bytes.
    pub fn from_rgb(
        width: u32,
        height: u32,
        pixels: Vec<u8>,
        captured_at: Timestamp,
    ) -> Result<Self> {
        let expected = expected_len(width, height, 3)?;
        if pixels.len() != expected {
            return Err(anyhow!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                pixels.len()
            ));
        }
        let image = RgbImage::from_raw(width, height, pixels)
            .ok_or_else(|| anyhow!("RGB buffer does not fit {}x{}", width, height))?;
        Self::from_image(image, captured_at)
    }

    /// Build a frame from single-channel bytes. Gray is replicated into all channels.
    pub fn from_gray(width: u32, height: u32, pixels: &[u8], captured_at: Timestamp) -> Result<Self> {
        let expected = expected_len(width, height, 1)?;
        if pixels.len() != expected {
            return Err(anyhow!(
                "gray frame length mismatch: expected {}, got {}",
                expected,
                pixels.len()
            ));
        }
        let rgb = pixels.iter().flat_map(|&p| [p, p, p]).collect();
        Self::from_rgb(width, height, rgb, captured_at)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Mutable pixels, used to draw motion overlays in place.
    pub fn image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }
}

fn expected_len(width: u32, height: u32, channels: u32) -> Result<usize> {
    if width == 0 || height == 0 {
        return Err(anyhow!("frame must be non-empty (got {}x{})", width, height));
    }
    width
        .checked_mul(height)
        .and_then(|v| v.checked_mul(channels))
        .map(|v| v as usize)
        .ok_or_else(|| anyhow!("frame dimensions overflow"))
}

// ----------------------------------------------------------------------------
// ReferenceFrame: static background
// ----------------------------------------------------------------------------

/// Normalized (grayscale, blurred) background captured when a session primes.
///
/// Only the differencer constructs one; there is no way to mutate it afterwards.
#[derive(Debug)]
pub struct ReferenceFrame {
    gray: GrayImage,
}

impl ReferenceFrame {
    pub(crate) fn new(gray: GrayImage) -> Self {
        Self { gray }
    }

    pub fn width(&self) -> u32 {
        self.gray.width()
    }

    pub fn height(&self) -> u32 {
        self.gray.height()
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.gray
    }
}

// ----------------------------------------------------------------------------
// MotionMask: binary change map
// ----------------------------------------------------------------------------

/// Binary mask; nonzero pixels (255) changed relative to the reference.
#[derive(Debug)]
pub struct MotionMask {
    mask: GrayImage,
}

impl MotionMask {
    pub(crate) fn new(mask: GrayImage) -> Self {
        Self { mask }
    }

    pub fn width(&self) -> u32 {
        self.mask.width()
    }

    pub fn height(&self) -> u32 {
        self.mask.height()
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.mask
    }

    /// Number of pixels flagged as changed.
    pub fn changed_pixels(&self) -> usize {
        self.mask.pixels().filter(|p| p.0[0] != 0).count()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
