mod classifier;
mod differencer;
mod result;

pub use classifier::{classify, classify_comparison};
pub use differencer::{
    extract_regions, DifferencerSettings, FrameDifferencer, DEFAULT_BLUR_KERNEL,
    DEFAULT_DIFF_THRESHOLD, DEFAULT_DILATE_ITERATIONS, DEFAULT_MIN_CONTOUR_AREA,
};
pub use result::{Comparison, MotionRegion, MotionStatus};
