use crate::frame::MotionMask;

/// Axis-aligned bounding box of one contiguous motion area, in pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionRegion {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    /// Enclosed contour area that admitted this region.
    pub area: f64,
}

/// Per-frame motion flag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MotionStatus {
    #[default]
    Still,
    Motion,
}

impl MotionStatus {
    pub fn as_u8(self) -> u8 {
        match self {
            MotionStatus::Still => 0,
            MotionStatus::Motion => 1,
        }
    }

    pub fn is_motion(self) -> bool {
        self == MotionStatus::Motion
    }
}

impl From<bool> for MotionStatus {
    fn from(motion: bool) -> Self {
        if motion {
            MotionStatus::Motion
        } else {
            MotionStatus::Still
        }
    }
}

/// Outcome of comparing one frame against the reference.
#[derive(Debug)]
pub enum Comparison {
    /// No reference existed; this frame became the reference. Never motion.
    Primed,
    /// Frame was compared against the reference.
    Compared {
        mask: MotionMask,
        regions: Vec<MotionRegion>,
    },
}

impl Comparison {
    pub fn is_primed(&self) -> bool {
        matches!(self, Comparison::Primed)
    }

    pub fn regions(&self) -> &[MotionRegion] {
        match self {
            Comparison::Primed => &[],
            Comparison::Compared { regions, .. } => regions,
        }
    }

    pub fn mask(&self) -> Option<&MotionMask> {
        match self {
            Comparison::Primed => None,
            Comparison::Compared { mask, .. } => Some(mask),
        }
    }
}
