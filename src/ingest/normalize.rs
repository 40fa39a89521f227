use anyhow::{anyhow, Context, Result};

/// Pixel layouts delivered by capture devices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb24,
    Gray8,
    /// Packed YUV 4:2:2 (Y0 U Y1 V), the usual webcam default.
    Yuyv,
    /// Motion JPEG: each buffer is a complete JPEG image.
    Mjpeg,
}

impl PixelFormat {
    /// Map a V4L2 fourcc to a supported layout.
    pub fn from_fourcc(fourcc: &[u8; 4]) -> Option<Self> {
        match fourcc {
            b"RGB3" => Some(PixelFormat::Rgb24),
            b"GREY" => Some(PixelFormat::Gray8),
            b"YUYV" => Some(PixelFormat::Yuyv),
            b"MJPG" => Some(PixelFormat::Mjpeg),
            _ => None,
        }
    }
}

/// Convert a device buffer into packed RGB24 of `width` x `height`.
pub fn normalize_to_rgb(
    pixels: &[u8],
    width: u32,
    height: u32,
    format: PixelFormat,
) -> Result<Vec<u8>> {
    let area = (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
    match format {
        PixelFormat::Rgb24 => {
            let expected = area * 3;
            // Drivers may pad the last buffer; anything shorter is corrupt.
            if pixels.len() < expected {
                return Err(anyhow!(
                    "RGB frame length mismatch: expected {}, got {}",
                    expected,
                    pixels.len()
                ));
            }
            Ok(pixels[..expected].to_vec())
        }
        PixelFormat::Gray8 => {
            if pixels.len() < area {
                return Err(anyhow!(
                    "gray frame length mismatch: expected {}, got {}",
                    area,
                    pixels.len()
                ));
            }
            Ok(pixels[..area].iter().flat_map(|&p| [p, p, p]).collect())
        }
        PixelFormat::Yuyv => yuyv_to_rgb(pixels, width, height),
        PixelFormat::Mjpeg => mjpeg_to_rgb(pixels, width, height),
    }
}

fn yuyv_to_rgb(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    if width % 2 != 0 {
        return Err(anyhow!("YUYV frames need an even width (got {})", width));
    }
    let area = width as usize * height as usize;
    let expected = area * 2;
    if pixels.len() < expected {
        return Err(anyhow!(
            "YUYV frame length mismatch: expected {}, got {}",
            expected,
            pixels.len()
        ));
    }

    let mut rgb = Vec::with_capacity(area * 3);
    for chunk in pixels[..expected].chunks_exact(4) {
        let u = chunk[1] as f32 - 128.0;
        let v = chunk[3] as f32 - 128.0;
        for y in [chunk[0], chunk[2]] {
            let y = y as f32;
            rgb.push(clamp_to_u8(y + 1.402_f32 * v));
            rgb.push(clamp_to_u8(y - 0.344_136_f32 * u - 0.714_136_f32 * v));
            rgb.push(clamp_to_u8(y + 1.772_f32 * u));
        }
    }
    Ok(rgb)
}

fn mjpeg_to_rgb(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory_with_format(pixels, image::ImageFormat::Jpeg)
        .context("decode MJPEG frame")?
        .to_rgb8();
    if decoded.width() != width || decoded.height() != height {
        return Err(anyhow!(
            "MJPEG frame is {}x{}, device reported {}x{}",
            decoded.width(),
            decoded.height(),
            width,
            height
        ));
    }
    Ok(decoded.into_raw())
}

fn clamp_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yuyv_neutral_chroma_produces_gray() -> Result<()> {
        let yuyv = vec![128u8, 128, 64, 128];
        let rgb = normalize_to_rgb(&yuyv, 2, 1, PixelFormat::Yuyv)?;
        assert_eq!(rgb, vec![128, 128, 128, 64, 64, 64]);
        Ok(())
    }

    #[test]
    fn yuyv_rejects_short_buffers() {
        assert!(normalize_to_rgb(&[0u8; 6], 2, 2, PixelFormat::Yuyv).is_err());
    }

    #[test]
    fn rgb_pass_through_validates_length() -> Result<()> {
        let pixels = vec![1u8; 9];
        let rgb = normalize_to_rgb(&pixels, 1, 3, PixelFormat::Rgb24)?;
        assert_eq!(rgb, pixels);
        assert!(normalize_to_rgb(&pixels[..8], 1, 3, PixelFormat::Rgb24).is_err());
        Ok(())
    }

    #[test]
    fn gray_is_widened() -> Result<()> {
        let rgb = normalize_to_rgb(&[7, 9], 2, 1, PixelFormat::Gray8)?;
        assert_eq!(rgb, vec![7, 7, 7, 9, 9, 9]);
        Ok(())
    }

    #[test]
    fn mjpeg_round_trips_dimensions() -> Result<()> {
        let image = image::RgbImage::from_pixel(8, 8, image::Rgb([90, 90, 90]));
        let mut jpeg = Vec::new();
        image::codecs::jpeg::JpegEncoder::new(&mut jpeg).encode_image(&image)?;

        let rgb = normalize_to_rgb(&jpeg, 8, 8, PixelFormat::Mjpeg)?;
        assert_eq!(rgb.len(), 8 * 8 * 3);
        assert!(normalize_to_rgb(&jpeg, 4, 4, PixelFormat::Mjpeg).is_err());
        Ok(())
    }

    #[test]
    fn fourcc_mapping() {
        assert_eq!(PixelFormat::from_fourcc(b"YUYV"), Some(PixelFormat::Yuyv));
        assert_eq!(PixelFormat::from_fourcc(b"NV12"), None);
    }
}
