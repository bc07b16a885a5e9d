use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageEncoder, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::{FaceGateError, Result};

/// Quality used for every generated variant.
pub const DEFAULT_QUALITY: f32 = 0.9;

/// Resampling filter handed to the resize primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResizeFilter {
    /// Nearest neighbour. Blocky, no smoothing.
    Nearest,
    /// Linear.
    Triangle,
    /// Cubic.
    CatmullRom,
    /// Gaussian.
    Gaussian,
    /// Lanczos with window 3. Highest quality, slowest.
    #[default]
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Decode input bytes (JPEG or PNG) into an opaque RGB raster.
pub fn decode_image(input: &[u8]) -> Result<RgbImage> {
    let decoded =
        image::load_from_memory(input).map_err(|e| FaceGateError::DecodeError(e.to_string()))?;
    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(FaceGateError::ZeroDimensions);
    }
    Ok(flatten_alpha(&decoded))
}

/// Flatten alpha channel by compositing onto a white background.
pub fn flatten_alpha(image: &DynamicImage) -> RgbImage {
    if let DynamicImage::ImageRgb8(rgb) = image {
        return rgb.clone();
    }

    let rgba: RgbaImage = image.to_rgba8();
    let mut rgb = RgbImage::new(rgba.width(), rgba.height());

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let [r, g, b, a] = pixel.0;
        let alpha = a as f32 / 255.0;
        let inv_alpha = 1.0 - alpha;
        let out_r = (r as f32 * alpha + 255.0 * inv_alpha).round() as u8;
        let out_g = (g as f32 * alpha + 255.0 * inv_alpha).round() as u8;
        let out_b = (b as f32 * alpha + 255.0 * inv_alpha).round() as u8;
        rgb.put_pixel(x, y, image::Rgb([out_r, out_g, out_b]));
    }

    rgb
}

pub(crate) fn validate_quality(quality: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&quality) {
        return Err(FaceGateError::InvalidQuality(quality));
    }
    Ok(())
}

/// Encode as baseline JPEG. `quality` is in `0.0..=1.0`.
pub fn encode_jpeg(image: &RgbImage, quality: f32) -> Result<Vec<u8>> {
    validate_quality(quality)?;

    let mut buffer = Vec::new();
    let quality_percent = ((quality * 100.0).round() as u8).max(1);
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality_percent);
    encoder
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| FaceGateError::EncodeError(e.to_string()))?;

    Ok(buffer)
}

/// Resize to exactly `width` × `height`. Deterministic for fixed inputs.
///
/// Returns a plain copy when the size already matches.
pub fn resize(image: &RgbImage, width: u32, height: u32, filter: ResizeFilter) -> RgbImage {
    if image.width() == width && image.height() == height {
        return image.clone();
    }
    image::imageops::resize(image, width.max(1), height.max(1), filter.into())
}

/// Height matching `width` at the aspect ratio of a `source_width` × `source_height` image.
pub fn scaled_height(source_width: u32, source_height: u32, width: u32) -> u32 {
    let h = (f64::from(source_height) * f64::from(width) / f64::from(source_width.max(1))).round();
    (h as u32).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_rgb(width: u32, height: u32) -> RgbImage {
        let mut img = RgbImage::new(width, height);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = image::Rgb([
                (x * 255 / width.max(1)) as u8,
                (y * 255 / height.max(1)) as u8,
                128,
            ]);
        }
        img
    }

    fn make_test_png(width: u32, height: u32) -> Vec<u8> {
        let img = make_test_rgb(width, height);
        let mut buffer = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buffer);
        encoder
            .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
            .unwrap();
        buffer
    }

    #[test]
    fn encode_jpeg_produces_valid_output() {
        let img = make_test_rgb(48, 64);
        let data = encode_jpeg(&img, 0.9).unwrap();
        assert_eq!(data[0], 0xFF);
        assert_eq!(data[1], 0xD8);
    }

    #[test]
    fn encode_rejects_bad_quality() {
        let img = make_test_rgb(4, 4);
        assert!(matches!(
            encode_jpeg(&img, 1.5),
            Err(FaceGateError::InvalidQuality(_))
        ));
        assert!(encode_jpeg(&img, -0.1).is_err());
    }

    #[test]
    fn jpeg_round_trip_keeps_dimensions() {
        let img = make_test_rgb(33, 17);
        let decoded = decode_image(&encode_jpeg(&img, 0.9).unwrap()).unwrap();
        assert_eq!(decoded.dimensions(), (33, 17));
    }

    #[test]
    fn decode_png_input() {
        let decoded = decode_image(&make_test_png(20, 10)).unwrap();
        assert_eq!(decoded.dimensions(), (20, 10));
        assert_eq!(decoded.get_pixel(0, 0), &image::Rgb([0, 0, 128]));
    }

    #[test]
    fn decode_garbage_fails() {
        assert!(matches!(
            decode_image(b"not an image"),
            Err(FaceGateError::DecodeError(_))
        ));
    }

    #[test]
    fn flatten_alpha_composites_over_white() {
        let mut rgba = RgbaImage::new(1, 1);
        rgba.put_pixel(0, 0, image::Rgba([255, 0, 0, 0]));
        let rgb = flatten_alpha(&DynamicImage::ImageRgba8(rgba));
        assert_eq!(rgb.get_pixel(0, 0), &image::Rgb([255, 255, 255]));
    }

    #[test]
    fn flatten_alpha_preserves_opaque() {
        let mut rgba = RgbaImage::new(1, 1);
        rgba.put_pixel(0, 0, image::Rgba([100, 150, 200, 255]));
        let rgb = flatten_alpha(&DynamicImage::ImageRgba8(rgba));
        assert_eq!(rgb.get_pixel(0, 0), &image::Rgb([100, 150, 200]));
    }

    #[test]
    fn resize_is_exact_and_deterministic() {
        let img = make_test_rgb(200, 100);
        let a = resize(&img, 48, 24, ResizeFilter::Lanczos3);
        let b = resize(&img, 48, 24, ResizeFilter::Lanczos3);
        assert_eq!(a.dimensions(), (48, 24));
        assert_eq!(a, b);
    }

    #[test]
    fn resize_to_same_size_is_a_copy() {
        let img = make_test_rgb(30, 20);
        assert_eq!(resize(&img, 30, 20, ResizeFilter::Gaussian), img);
    }

    #[test]
    fn scaled_height_keeps_aspect() {
        assert_eq!(scaled_height(1000, 800, 320), 256);
        assert_eq!(scaled_height(1000, 800, 500), 400);
        assert_eq!(scaled_height(1000, 1, 10), 1);
    }
}
