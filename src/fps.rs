use std::time::{Duration, Instant};

pub const DEFAULT_FPS_INTERVAL: Duration = Duration::from_secs(2);

/// Periodic frames-per-second estimate.
///
/// The rate is recomputed once per window and held between windows, so the
/// overlay does not flicker from frame to frame.
#[derive(Debug)]
pub struct FrameRateMonitor {
    interval: Duration,
    window_start: Instant,
    frames: u64,
    rate: f64,
}

impl FrameRateMonitor {
    pub fn new(interval: Duration) -> Self {
        Self::starting_at(interval, Instant::now())
    }

    /// Monitor whose first window opens at `start`.
    pub fn starting_at(interval: Duration, start: Instant) -> Self {
        Self {
            interval,
            window_start: start,
            frames: 0,
            rate: 0.0,
        }
    }

    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// Count one frame processed at `now`.
    pub fn tick_at(&mut self, now: Instant) {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed >= self.interval && !elapsed.is_zero() {
            self.rate = self.frames as f64 / elapsed.as_secs_f64();
            self.frames = 0;
            self.window_start = now;
        }
    }

    /// Last computed rate; 0.0 until the first window closes.
    pub fn current_rate(&self) -> f64 {
        self.rate
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for FrameRateMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_FPS_INTERVAL)
    }
}
