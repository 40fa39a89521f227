//! Motion Witness
//!
//! Watches a camera, flags frames that differ from a static reference frame,
//! and records when motion starts and stops as a flat `Start,End` interval log.
//!
//! # Pipeline
//!
//! Per frame, on one thread:
//!
//! 1. `FrameDifferencer`: grayscale + blur, difference against the reference,
//!    threshold, dilate, outer contours, area filter
//! 2. `classify`: any surviving region means motion
//! 3. `TransitionLogger`: two-samples-back transition detection, intervals
//! 4. `FrameRateMonitor`: windowed FPS for the overlay
//!
//! # Module Structure
//!
//! - `frame`: Frame, ReferenceFrame, MotionMask
//! - `detect`: differencing and classification
//! - `state`: transition detection and interval bookkeeping
//! - `ingest`: frame sources (V4L2, synthetic, scripted)
//! - `display`: display collaborators and the quit signal
//! - `session`: the control loop and unified cleanup
//! - `export` / `timeline`: CSV interval log and HTML timeline

pub mod config;
pub mod detect;
pub mod display;
pub mod error;
pub mod export;
pub mod fps;
pub mod frame;
pub mod ingest;
pub mod session;
pub mod state;
pub mod timeline;

pub use config::MotionConfig;
pub use detect::{
    classify, Comparison, DifferencerSettings, FrameDifferencer, MotionRegion, MotionStatus,
};
pub use display::{Display, HeadlessDisplay, QuitSignal, SnapshotDisplay};
pub use error::SessionError;
pub use fps::FrameRateMonitor;
pub use frame::{Frame, MotionMask, ReferenceFrame};
pub use ingest::{
    open_source, resolve_source, CaptureSettings, FrameSource, ScriptedSource, SyntheticSource,
    UnavailableSource,
};
#[cfg(feature = "ingest-v4l2")]
pub use ingest::{V4l2Config, V4l2Source};
pub use session::{Session, SessionReport, SessionSettings, StopReason};
pub use state::{Boundary, BoundaryKind, MotionInterval, TransitionLogger};

/// Local wall-clock time without an offset, as recorded in the interval log.
pub type Timestamp = chrono::NaiveDateTime;

pub fn now() -> Timestamp {
    chrono::Local::now().naive_local()
}
