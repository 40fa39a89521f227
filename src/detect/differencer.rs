//! Static-background frame differencing.
//!
//! Each frame is normalized (grayscale, Gaussian blur) and compared against the
//! reference captured when the session primed:
//!
//! 1. absolute per-pixel difference
//! 2. binary threshold
//! 3. dilation to merge nearby fragments
//! 4. external contour extraction, area filter, bounding boxes
//!
//! The reference is never refreshed after priming. Slow lighting drift therefore
//! shows up as persistent motion until `reset()` is called.

use anyhow::{anyhow, Result};
use image::{GrayImage, Luma, Rgb};
use imageproc::contours::find_contours;
use imageproc::contrast::{threshold, ThresholdType};
use imageproc::distance_transform::Norm;
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometry::contour_area;
use imageproc::map::map_colors2;
use imageproc::morphology::dilate;
use imageproc::rect::Rect;

use crate::detect::result::{Comparison, MotionRegion};
use crate::frame::{Frame, MotionMask, ReferenceFrame};

pub const DEFAULT_BLUR_KERNEL: u32 = 21;
pub const DEFAULT_DIFF_THRESHOLD: u8 = 30;
pub const DEFAULT_DILATE_ITERATIONS: u8 = 2;
pub const DEFAULT_MIN_CONTOUR_AREA: f64 = 1000.0;

const BOX_COLOUR: Rgb<u8> = Rgb([0, 255, 0]);
const BOX_THICKNESS: i32 = 3;

/// Tunables for the differencing pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct DifferencerSettings {
    /// Odd Gaussian kernel edge length; sigma is derived from it.
    pub blur_kernel: u32,
    /// Differences strictly above this become motion pixels.
    pub diff_threshold: u8,
    /// Passes of a 3x3 square dilation.
    pub dilate_iterations: u8,
    /// Contours enclosing less than this area are ignored.
    pub min_contour_area: f64,
}

impl Default for DifferencerSettings {
    fn default() -> Self {
        Self {
            blur_kernel: DEFAULT_BLUR_KERNEL,
            diff_threshold: DEFAULT_DIFF_THRESHOLD,
            dilate_iterations: DEFAULT_DILATE_ITERATIONS,
            min_contour_area: DEFAULT_MIN_CONTOUR_AREA,
        }
    }
}

impl DifferencerSettings {
    pub fn validate(&self) -> Result<()> {
        if self.blur_kernel < 3 || self.blur_kernel % 2 == 0 {
            return Err(anyhow!(
                "blur kernel must be odd and at least 3 (got {})",
                self.blur_kernel
            ));
        }
        if !(self.min_contour_area > 0.0) {
            return Err(anyhow!(
                "min contour area must be greater than zero (got {})",
                self.min_contour_area
            ));
        }
        Ok(())
    }

    /// Sigma for a kernel of this size, using the same rule as OpenCV's `sigma = 0` case.
    pub fn blur_sigma(&self) -> f32 {
        0.3 * ((self.blur_kernel as f32 - 1.0) * 0.5 - 1.0) + 0.8
    }
}

/// Compares frames against an owned, prime-once reference.
pub struct FrameDifferencer {
    settings: DifferencerSettings,
    reference: Option<ReferenceFrame>,
}

impl FrameDifferencer {
    pub fn new(settings: DifferencerSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            reference: None,
        })
    }

    pub fn settings(&self) -> &DifferencerSettings {
        &self.settings
    }

    pub fn reference(&self) -> Option<&ReferenceFrame> {
        self.reference.as_ref()
    }

    pub fn is_primed(&self) -> bool {
        self.reference.is_some()
    }

    /// Drop the reference. The next `compare` primes again.
    pub fn reset(&mut self) {
        if self.reference.take().is_some() {
            log::info!("FrameDifferencer: reference cleared");
        }
    }

    /// Compare `frame` against the reference, drawing motion boxes onto it.
    ///
    /// Without a reference the normalized frame becomes the reference and the
    /// result is `Comparison::Primed`.
    pub fn compare(&mut self, frame: &mut Frame) -> Result<Comparison> {
        let gray = self.normalize(frame);

        let Some(reference) = self.reference.as_ref() else {
            log::debug!(
                "FrameDifferencer: primed reference ({}x{})",
                gray.width(),
                gray.height()
            );
            self.reference = Some(ReferenceFrame::new(gray));
            return Ok(Comparison::Primed);
        };

        if reference.width() != gray.width() || reference.height() != gray.height() {
            return Err(anyhow!(
                "frame dimensions {}x{} do not match reference {}x{}",
                gray.width(),
                gray.height(),
                reference.width(),
                reference.height()
            ));
        }

        let mask = self.motion_mask(reference.as_image(), &gray);
        let regions = extract_regions(&mask, self.settings.min_contour_area);
        for region in &regions {
            draw_region(frame, region);
        }

        Ok(Comparison::Compared {
            mask: MotionMask::new(mask),
            regions,
        })
    }

    fn normalize(&self, frame: &Frame) -> GrayImage {
        let gray = image::imageops::grayscale(frame.image());
        gaussian_blur_f32(&gray, self.settings.blur_sigma())
    }

    fn motion_mask(&self, reference: &GrayImage, gray: &GrayImage) -> GrayImage {
        let delta = map_colors2(reference, gray, |a: Luma<u8>, b: Luma<u8>| {
            Luma([a.0[0].abs_diff(b.0[0])])
        });
        let binary = threshold(&delta, self.settings.diff_threshold, ThresholdType::Binary);
        if self.settings.dilate_iterations == 0 {
            return binary;
        }
        // k passes of a 3x3 square element equal one L-inf dilation of radius k.
        dilate(&binary, Norm::LInf, self.settings.dilate_iterations)
    }
}

/// Bounding boxes of outermost contours in `mask` whose area is at least `min_area`.
///
/// Pixels outside the mask count as background, so blobs touching the frame
/// edge (or covering the whole frame) still trace a closed outer contour.
pub fn extract_regions(mask: &GrayImage, min_area: f64) -> Vec<MotionRegion> {
    let mut padded = GrayImage::new(mask.width() + 2, mask.height() + 2);
    image::imageops::replace(&mut padded, mask, 1, 1);

    find_contours::<i32>(&padded)
        .into_iter()
        .filter(|contour| contour.parent.is_none())
        .filter_map(|contour| {
            let area = contour_area(&contour.points).abs();
            if area < min_area {
                return None;
            }
            let min_x = contour.points.iter().map(|p| p.x).min()? - 1;
            let max_x = contour.points.iter().map(|p| p.x).max()? - 1;
            let min_y = contour.points.iter().map(|p| p.y).min()? - 1;
            let max_y = contour.points.iter().map(|p| p.y).max()? - 1;
            Some(MotionRegion {
                x: min_x.max(0) as u32,
                y: min_y.max(0) as u32,
                w: (max_x - min_x + 1) as u32,
                h: (max_y - min_y + 1) as u32,
                area,
            })
        })
        .collect()
}

fn draw_region(frame: &mut Frame, region: &MotionRegion) {
    let (x, y) = (region.x as i32, region.y as i32);
    for grow in 0..BOX_THICKNESS {
        let rect = Rect::at(x - grow, y - grow)
            .of_size(region.w + 2 * grow as u32, region.h + 2 * grow as u32);
        draw_hollow_rect_mut(frame.image_mut(), rect, BOX_COLOUR);
    }
}
