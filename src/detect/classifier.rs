use crate::detect::result::{Comparison, MotionRegion, MotionStatus};

/// Reduce a frame's regions to one status: motion iff any region survived the area filter.
pub fn classify(regions: &[MotionRegion]) -> MotionStatus {
    MotionStatus::from(!regions.is_empty())
}

/// Status for a whole comparison. A priming comparison is always still.
pub fn classify_comparison(comparison: &Comparison) -> MotionStatus {
    classify(comparison.regions())
}
