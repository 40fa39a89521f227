//! Synthetic and scripted sources.
//!
//! `SyntheticSource` renders a blank scene in which a bright square appears for a
//! few frames at a fixed period. It backs `stub://` devices so the whole
//! pipeline runs without a camera. `ScriptedSource` plays back frames prepared
//! by the caller.

use anyhow::{anyhow, Result};
use image::{Rgb, RgbImage};
use std::collections::VecDeque;

use super::FrameSource;
use crate::frame::Frame;

/// Configuration for a synthetic scene.
#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    pub name: String,
    pub width: u32,
    pub height: u32,
    /// A motion episode starts every `period` frames.
    pub period: u64,
    /// Frames per episode during which the square is visible.
    pub motion_frames: u64,
    /// Square edge length in pixels.
    pub square: u32,
    /// Stop with end of stream after this many frames.
    pub frame_limit: Option<u64>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            name: "stub://camera".to_string(),
            width: 640,
            height: 480,
            period: 90,
            motion_frames: 30,
            square: 80,
            frame_limit: None,
        }
    }
}

pub struct SyntheticSource {
    config: SyntheticConfig,
    frame_count: u64,
    opened: bool,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Self {
        Self {
            config,
            frame_count: 0,
            opened: false,
        }
    }

    pub fn frames_captured(&self) -> u64 {
        self.frame_count
    }

    /// Whether frame number `index` (0-based) shows the square.
    fn shows_square(&self, index: u64) -> bool {
        if self.config.period == 0 {
            return false;
        }
        let phase = index % self.config.period;
        // Frame 0 is always blank so the reference primes on an empty scene.
        index > 0 && phase >= self.config.period - self.config.motion_frames.min(self.config.period)
    }

    fn render(&self, index: u64) -> RgbImage {
        let (width, height) = (self.config.width, self.config.height);
        let mut image = RgbImage::from_pixel(width, height, Rgb([16, 16, 16]));
        if self.shows_square(index) {
            let edge = self.config.square.min(width).min(height);
            // Sweep the square across the frame from one episode to the next.
            let episode = index / self.config.period.max(1);
            let span = width.saturating_sub(edge).max(1) as u64;
            let x0 = ((episode * 97) % span) as u32;
            let y0 = (height - edge) / 2;
            for y in y0..y0 + edge {
                for x in x0..x0 + edge {
                    image.put_pixel(x, y, Rgb([240, 240, 240]));
                }
            }
        }
        image
    }
}

impl FrameSource for SyntheticSource {
    fn describe(&self) -> String {
        format!("{} (synthetic)", self.config.name)
    }

    fn open(&mut self) -> Result<()> {
        if self.config.width == 0 || self.config.height == 0 {
            return Err(anyhow!(
                "synthetic scene needs non-zero dimensions (got {}x{})",
                self.config.width,
                self.config.height
            ));
        }
        self.opened = true;
        log::info!(
            "SyntheticSource: connected to {} ({}x{})",
            self.config.name,
            self.config.width,
            self.config.height
        );
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<Frame>> {
        if !self.opened {
            return Err(anyhow!("synthetic source {} not opened", self.config.name));
        }
        if self
            .config
            .frame_limit
            .is_some_and(|limit| self.frame_count >= limit)
        {
            return Ok(None);
        }
        let image = self.render(self.frame_count);
        self.frame_count += 1;
        Frame::from_image(image, crate::now()).map(Some)
    }

    fn release(&mut self) {
        if self.opened {
            log::info!(
                "SyntheticSource: released {} after {} frames",
                self.config.name,
                self.frame_count
            );
        }
        self.opened = false;
    }
}

/// Plays back a fixed list of frames, then reports end of stream (or an error).
pub struct ScriptedSource {
    name: String,
    frames: VecDeque<Frame>,
    fail_when_drained: Option<String>,
    opened: bool,
    released: bool,
}

impl ScriptedSource {
    pub fn new(name: &str, frames: Vec<Frame>) -> Self {
        Self {
            name: name.to_string(),
            frames: frames.into(),
            fail_when_drained: None,
            opened: false,
            released: false,
        }
    }

    /// Report a read error instead of end of stream once playback is exhausted.
    pub fn failing_when_drained(mut self, reason: &str) -> Self {
        self.fail_when_drained = Some(reason.to_string());
        self
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }

    pub fn was_released(&self) -> bool {
        self.released
    }
}

impl FrameSource for ScriptedSource {
    fn describe(&self) -> String {
        format!("{} (scripted, {} frames)", self.name, self.frames.len())
    }

    fn open(&mut self) -> Result<()> {
        self.opened = true;
        Ok(())
    }

    fn read_frame(&mut self) -> Result<Option<Frame>> {
        if !self.opened {
            return Err(anyhow!("scripted source {} not opened", self.name));
        }
        match self.frames.pop_front() {
            Some(frame) => Ok(Some(frame)),
            None => match &self.fail_when_drained {
                Some(reason) => Err(anyhow!("{}", reason)),
                None => Ok(None),
            },
        }
    }

    fn release(&mut self) {
        self.opened = false;
        self.released = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_scene(limit: u64) -> SyntheticConfig {
        SyntheticConfig {
            name: "stub://test".to_string(),
            width: 160,
            height: 120,
            period: 10,
            motion_frames: 3,
            square: 40,
            frame_limit: Some(limit),
        }
    }

    #[test]
    fn synthetic_source_produces_frames_until_limit() -> Result<()> {
        let mut source = SyntheticSource::new(small_scene(4));
        source.open()?;
        for _ in 0..4 {
            let frame = source.read_frame()?.expect("frame");
            assert_eq!((frame.width(), frame.height()), (160, 120));
        }
        assert!(source.read_frame()?.is_none());
        assert_eq!(source.frames_captured(), 4);
        Ok(())
    }

    #[test]
    fn synthetic_square_appears_at_end_of_each_period() {
        let source = SyntheticSource::new(small_scene(100));
        let visible: Vec<u64> = (0..20).filter(|&i| source.shows_square(i)).collect();
        assert_eq!(visible, vec![7, 8, 9, 17, 18, 19]);
    }

    #[test]
    fn synthetic_source_requires_open() {
        let mut source = SyntheticSource::new(small_scene(1));
        assert!(source.read_frame().is_err());
    }

    #[test]
    fn scripted_source_drains_then_ends_or_fails() -> Result<()> {
        let frame = Frame::from_image(RgbImage::new(4, 4), crate::now())?;

        let mut ending = ScriptedSource::new("script", vec![frame.clone()]);
        ending.open()?;
        assert!(ending.read_frame()?.is_some());
        assert!(ending.read_frame()?.is_none());

        let mut failing = ScriptedSource::new("script", vec![frame]).failing_when_drained("unplugged");
        failing.open()?;
        assert!(failing.read_frame()?.is_some());
        assert!(failing.read_frame().is_err());
        failing.release();
        assert!(failing.was_released());
        Ok(())
    }
}
