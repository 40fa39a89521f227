//! The detection loop.
//!
//! One thread, one frame at a time:
//!
//! 1. read a frame (blocking)
//! 2. compare against the reference, classify, record transitions
//! 3. tick the FPS monitor and hand the annotated frame to the display
//! 4. poll the display for the quit key (bounded wait, the only cancellation point)
//!
//! Whatever ends the loop (quit key, end of stream, device or pipeline failure),
//! cleanup runs the same way: release the source, close the display, close any
//! open interval at the termination instant, and export the interval log.

use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

use crate::detect::{classify_comparison, DifferencerSettings, FrameDifferencer};
use crate::display::{Display, DEFAULT_WINDOW_NAME, QUIT_KEY};
use crate::error::SessionError;
use crate::export::{self, DEFAULT_CSV_PATH};
use crate::fps::{FrameRateMonitor, DEFAULT_FPS_INTERVAL};
use crate::ingest::FrameSource;
use crate::state::{Boundary, MotionInterval, TransitionLogger};
use crate::Timestamp;

#[derive(Clone, Debug)]
pub struct SessionSettings {
    pub window_name: String,
    pub key_poll: Duration,
    pub fps_interval: Duration,
    pub csv_path: PathBuf,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            window_name: DEFAULT_WINDOW_NAME.to_string(),
            key_poll: Duration::from_millis(10),
            fps_interval: DEFAULT_FPS_INTERVAL,
            csv_path: PathBuf::from(DEFAULT_CSV_PATH),
        }
    }
}

/// Why the loop stopped.
#[derive(Debug)]
pub enum StopReason {
    QuitKey,
    EndOfStream,
    Failed(SessionError),
}

#[derive(Debug)]
pub struct SessionReport {
    pub stop: StopReason,
    /// Frames read from the source, including the priming frame.
    pub frames_read: u64,
    /// Frames that produced a status sample.
    pub frames_observed: usize,
    pub boundaries: Vec<Boundary>,
    pub intervals: Vec<MotionInterval>,
    pub stopped_at: Timestamp,
    pub last_fps: f64,
}

impl SessionReport {
    pub fn is_failure(&self) -> bool {
        matches!(self.stop, StopReason::Failed(_))
    }

    pub fn error(&self) -> Option<&SessionError> {
        match &self.stop {
            StopReason::Failed(err) => Some(err),
            _ => None,
        }
    }
}

pub struct Session<'a> {
    source: &'a mut dyn FrameSource,
    display: &'a mut dyn Display,
    differencer: FrameDifferencer,
    logger: TransitionLogger,
    fps: FrameRateMonitor,
    settings: SessionSettings,
    frames_read: u64,
    last_frame_at: Option<Timestamp>,
}

impl<'a> Session<'a> {
    pub fn new(
        source: &'a mut dyn FrameSource,
        display: &'a mut dyn Display,
        detection: DifferencerSettings,
        settings: SessionSettings,
    ) -> Result<Self> {
        Ok(Self {
            source,
            display,
            differencer: FrameDifferencer::new(detection)?,
            logger: TransitionLogger::new(),
            fps: FrameRateMonitor::new(settings.fps_interval),
            settings,
            frames_read: 0,
            last_frame_at: None,
        })
    }

    /// Run until stopped, clean up, and export the interval log.
    ///
    /// Session failures are reported in `SessionReport::stop`. `Err` is returned
    /// only when the interval log could not be written.
    pub fn run(mut self) -> Result<SessionReport> {
        let device = self.source.describe();
        log::info!("session starting on {}", device);

        let outcome = match self.source.open() {
            Ok(()) => self.detect_loop(),
            Err(err) => Err(SessionError::device_unavailable(device, &err)),
        };

        self.source.release();
        self.display.close();

        // Never earlier than the last frame, so a closing interval cannot invert.
        let now = crate::now();
        let stopped_at = self.last_frame_at.map_or(now, |last| now.max(last));
        if let Some(interval) = self.logger.finish(stopped_at) {
            log::info!(
                "closed open motion interval at session end ({} -> {})",
                interval.start,
                interval.end
            );
        }

        let stop = match outcome {
            Ok(reason) => {
                log::info!("session stopped: {:?}", reason);
                reason
            }
            Err(err) => {
                log::error!("session stopped on {}: {}", err.kind(), err);
                StopReason::Failed(err)
            }
        };

        export::write_intervals_csv(&self.settings.csv_path, self.logger.intervals())?;

        Ok(SessionReport {
            stop,
            frames_read: self.frames_read,
            frames_observed: self.logger.observed(),
            boundaries: self.logger.boundaries().to_vec(),
            intervals: self.logger.intervals().to_vec(),
            stopped_at,
            last_fps: self.fps.current_rate(),
        })
    }

    fn detect_loop(&mut self) -> Result<StopReason, SessionError> {
        loop {
            let mut frame = match self.source.read_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    log::warn!("{}: end of stream", self.source.describe());
                    return Ok(StopReason::EndOfStream);
                }
                Err(err) => return Err(SessionError::acquisition(&err)),
            };
            self.frames_read += 1;
            self.last_frame_at = Some(frame.captured_at);

            let comparison = self
                .differencer
                .compare(&mut frame)
                .map_err(|err| SessionError::processing(&err))?;
            if comparison.is_primed() {
                log::info!(
                    "reference frame captured ({}x{})",
                    frame.width(),
                    frame.height()
                );
                continue;
            }

            let status = classify_comparison(&comparison);
            self.logger.observe(status, frame.captured_at);

            self.fps.tick();
            let overlay = format!("FPS: {:.2}", self.fps.current_rate());
            self.display
                .show(&self.settings.window_name, &frame, &overlay)
                .map_err(|err| SessionError::processing(&err))?;

            if self.display.poll_key(self.settings.key_poll) == Some(QUIT_KEY) {
                return Ok(StopReason::QuitKey);
            }
        }
    }
}
