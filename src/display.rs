//! Display collaborators.
//!
//! The detection loop hands every annotated frame plus an overlay line to a
//! `Display`, then polls it for a key with a bounded wait. That wait is also
//! the loop's cancellation point.
//!
//! - `HeadlessDisplay`: no window. Ctrl-C is reported as the quit key.
//! - `SnapshotDisplay`: headless, plus the latest annotated frame (boxes and
//!   overlay text) written to a JPEG file at a fixed interval.

use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::frame::Frame;

pub const DEFAULT_WINDOW_NAME: &str = "Motion Detection";
pub const QUIT_KEY: char = 'q';

/// Overlay logging cadence for headless displays.
const OVERLAY_LOG_INTERVAL: Duration = Duration::from_secs(5);

const OVERLAY_ORIGIN: (i32, i32) = (10, 15);
const OVERLAY_COLOUR: Rgb<u8> = Rgb([0, 255, 0]);
/// Screen pixels per glyph cell.
const OVERLAY_SCALE: u32 = 3;

pub trait Display {
    /// Present `frame` in `window` with one line of overlay text.
    fn show(&mut self, window: &str, frame: &Frame, overlay: &str) -> Result<()>;

    /// Wait up to `timeout` for a key press.
    fn poll_key(&mut self, timeout: Duration) -> Option<char>;

    /// Tear down any surfaces. Must be safe to call more than once.
    fn close(&mut self);
}

/// Cooperative quit flag shared with a signal handler.
#[derive(Clone, Debug, Default)]
pub struct QuitSignal {
    flag: Arc<AtomicBool>,
}

impl QuitSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route Ctrl-C (SIGINT/SIGTERM) into this flag. Only one handler may be installed per process.
    pub fn install_ctrlc(&self) -> Result<()> {
        let flag = Arc::clone(&self.flag);
        ctrlc::set_handler(move || {
            flag.store(true, Ordering::SeqCst);
        })
        .context("install Ctrl-C handler")
    }

    pub fn request(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

pub struct HeadlessDisplay {
    quit: QuitSignal,
    frames_shown: u64,
    last_overlay_log: Option<Instant>,
    closed: bool,
}

impl HeadlessDisplay {
    pub fn new(quit: QuitSignal) -> Self {
        Self {
            quit,
            frames_shown: 0,
            last_overlay_log: None,
            closed: false,
        }
    }

    pub fn frames_shown(&self) -> u64 {
        self.frames_shown
    }
}

impl Display for HeadlessDisplay {
    fn show(&mut self, window: &str, _frame: &Frame, overlay: &str) -> Result<()> {
        self.frames_shown += 1;
        let due = self
            .last_overlay_log
            .map_or(true, |at| at.elapsed() >= OVERLAY_LOG_INTERVAL);
        if due {
            log::debug!("[{}] {} (frame {})", window, overlay, self.frames_shown);
            self.last_overlay_log = Some(Instant::now());
        }
        Ok(())
    }

    fn poll_key(&mut self, timeout: Duration) -> Option<char> {
        if !self.quit.is_requested() && !timeout.is_zero() {
            std::thread::sleep(timeout);
        }
        self.quit.is_requested().then_some(QUIT_KEY)
    }

    fn close(&mut self) {
        if !self.closed {
            log::debug!("headless display closed after {} frames", self.frames_shown);
            self.closed = true;
        }
    }
}

/// Headless display that also keeps a JPEG snapshot of the latest annotated frame.
pub struct SnapshotDisplay {
    inner: HeadlessDisplay,
    path: PathBuf,
    interval: Duration,
    last_write: Option<Instant>,
}

impl SnapshotDisplay {
    pub fn new(quit: QuitSignal, path: PathBuf, interval: Duration) -> Self {
        Self {
            inner: HeadlessDisplay::new(quit),
            path,
            interval,
            last_write: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Display for SnapshotDisplay {
    fn show(&mut self, window: &str, frame: &Frame, overlay: &str) -> Result<()> {
        self.inner.show(window, frame, overlay)?;
        let due = self
            .last_write
            .map_or(true, |at| at.elapsed() >= self.interval);
        if due {
            let mut annotated = frame.image().clone();
            draw_overlay(&mut annotated, overlay);
            write_snapshot(&self.path, &annotated)?;
            self.last_write = Some(Instant::now());
        }
        Ok(())
    }

    fn poll_key(&mut self, timeout: Duration) -> Option<char> {
        self.inner.poll_key(timeout)
    }

    fn close(&mut self) {
        self.inner.close();
    }
}

/// Write through a temporary sibling so readers never see a half-written file.
fn write_snapshot(path: &Path, image: &RgbImage) -> Result<()> {
    let tmp = path.with_extension("jpg.tmp");
    let file = std::fs::File::create(&tmp)
        .with_context(|| format!("create snapshot {}", tmp.display()))?;
    let mut writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut writer, 85)
        .encode_image(image)
        .context("encode snapshot")?;
    std::io::Write::flush(&mut writer).context("flush snapshot")?;
    drop(writer);
    std::fs::rename(&tmp, path)
        .with_context(|| format!("replace snapshot {}", path.display()))?;
    Ok(())
}

/// 3x5 cells for the characters the FPS overlay uses. Rows are top to bottom,
/// bit 2 is the left column.
fn glyph(c: char) -> Option<[u8; 5]> {
    let rows = match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        'F' => [0b111, 0b100, 0b110, 0b100, 0b100],
        'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        _ => return None,
    };
    Some(rows)
}

/// Burn `text` into the top-left corner of `image`. Unknown characters leave a gap.
pub fn draw_overlay(image: &mut RgbImage, text: &str) {
    let cell = OVERLAY_SCALE as i32;
    let (mut x, y) = OVERLAY_ORIGIN;
    for c in text.chars() {
        if let Some(rows) = glyph(c) {
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..3 {
                    if bits & (0b100 >> col) != 0 {
                        let rect = Rect::at(x + col * cell, y + row as i32 * cell)
                            .of_size(OVERLAY_SCALE, OVERLAY_SCALE);
                        draw_filled_rect_mut(image, rect, OVERLAY_COLOUR);
                    }
                }
            }
        }
        x += 4 * cell;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_display_reports_quit_once_requested() {
        let quit = QuitSignal::new();
        let mut display = HeadlessDisplay::new(quit.clone());
        assert_eq!(display.poll_key(Duration::ZERO), None);
        quit.request();
        assert_eq!(display.poll_key(Duration::from_millis(10)), Some(QUIT_KEY));
    }

    #[test]
    fn headless_display_counts_frames() -> Result<()> {
        let mut display = HeadlessDisplay::new(QuitSignal::new());
        let frame = Frame::from_image(RgbImage::new(4, 4), crate::now())?;
        display.show(DEFAULT_WINDOW_NAME, &frame, "FPS: 0.00")?;
        display.show(DEFAULT_WINDOW_NAME, &frame, "FPS: 0.00")?;
        assert_eq!(display.frames_shown(), 2);
        display.close();
        display.close();
        Ok(())
    }

    #[test]
    fn snapshot_display_writes_jpeg() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("latest.jpg");
        let mut display =
            SnapshotDisplay::new(QuitSignal::new(), path.clone(), Duration::from_secs(60));
        let frame = Frame::from_image(RgbImage::new(120, 48), crate::now())?;
        display.show(DEFAULT_WINDOW_NAME, &frame, "FPS: 0.00")?;

        let decoded = image::open(&path)?.to_rgb8();
        assert_eq!((decoded.width(), decoded.height()), (120, 48));
        // Middle of the F's top bar.
        let px = decoded.get_pixel(14, 16).0;
        assert!(px[1] > 80 && px[1] > px[0] + 30, "overlay missing: {px:?}");
        // The shown frame itself is left untouched.
        assert_eq!(frame.image().get_pixel(14, 16).0, [0, 0, 0]);
        Ok(())
    }

    #[test]
    fn overlay_draws_known_glyphs() {
        let mut image = RgbImage::new(80, 40);
        draw_overlay(&mut image, "F");
        assert_eq!(image.get_pixel(10, 15).0, [0, 255, 0]);
        assert_eq!(image.get_pixel(18, 15).0, [0, 255, 0]);
        // Right column of the F's lower rows is empty.
        assert_eq!(image.get_pixel(18, 27).0, [0, 0, 0]);

        let mut blank = RgbImage::new(80, 40);
        draw_overlay(&mut blank, "??");
        assert!(blank.pixels().all(|p| p.0 == [0, 0, 0]));
    }
}
