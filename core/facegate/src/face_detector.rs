use image::RgbImage;

use crate::error::DetectorError;
use crate::region::NormalizedRect;

/// Bounding box of a detected face within an image.
#[derive(Debug, Clone)]
pub struct FaceBounds {
    /// X coordinate of the top-left corner (pixels).
    pub x: f64,
    /// Y coordinate of the top-left corner (pixels).
    pub y: f64,
    /// Width of the bounding box (pixels).
    pub width: f64,
    /// Height of the bounding box (pixels).
    pub height: f64,
    /// Detection confidence score.
    pub confidence: f64,
}

impl FaceBounds {
    /// Express the box relative to a `width` × `height` image, clamped to it.
    pub fn normalized(&self, width: u32, height: u32) -> NormalizedRect {
        NormalizedRect::from_pixels(self.x, self.y, self.width, self.height, width, height)
    }
}

/// Pluggable face detection backend.
///
/// Implement this trait to provide a custom face detector (ONNX, dlib, etc.)
/// and pass it to [`crate::PhotoIngestor::face_detector`].
pub trait FaceDetector: Send + Sync {
    /// Detect faces in a row-major grayscale buffer of `width` × `height` bytes.
    ///
    /// Return [`DetectorError::ModelUnavailable`] when the backing model cannot
    /// be loaded; ingestion treats that as "detection disabled".
    fn detect(
        &self,
        gray: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<FaceBounds>, DetectorError>;
}

/// Run `detector` over `image` and return the detections as normalized,
/// clamped rectangles. Degenerate boxes are dropped.
pub fn detect_normalized(
    detector: &dyn FaceDetector,
    image: &RgbImage,
) -> Result<Vec<NormalizedRect>, DetectorError> {
    let gray = image::imageops::grayscale(image);
    let (width, height) = gray.dimensions();
    let faces = detector.detect(gray.as_raw(), width, height)?;

    Ok(faces
        .iter()
        .map(|face| face.normalized(width, height))
        .filter(|rect| !rect.is_degenerate())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<FaceBounds>);

    impl FaceDetector for Fixed {
        fn detect(
            &self,
            gray: &[u8],
            width: u32,
            height: u32,
        ) -> Result<Vec<FaceBounds>, DetectorError> {
            assert_eq!(gray.len(), (width * height) as usize);
            Ok(self.0.clone())
        }
    }

    fn bounds(x: f64, y: f64, width: f64, height: f64) -> FaceBounds {
        FaceBounds {
            x,
            y,
            width,
            height,
            confidence: 1.0,
        }
    }

    #[test]
    fn detections_are_normalized() {
        let detector = Fixed(vec![bounds(100.0, 80.0, 200.0, 200.0)]);
        let rects = detect_normalized(&detector, &RgbImage::new(1000, 800)).unwrap();
        assert_eq!(rects.len(), 1);
        assert!((rects[0].x - 0.1).abs() < 1e-12);
        assert!((rects[0].y - 0.1).abs() < 1e-12);
        assert!((rects[0].width - 0.2).abs() < 1e-12);
        assert!((rects[0].height - 0.25).abs() < 1e-12);
    }

    #[test]
    fn boxes_hanging_off_the_edge_are_clamped() {
        let detector = Fixed(vec![bounds(-20.0, 90.0, 50.0, 50.0)]);
        let rects = detect_normalized(&detector, &RgbImage::new(100, 100)).unwrap();
        assert_eq!(rects[0].x, 0.0);
        assert!((rects[0].height - 0.1).abs() < 1e-12);
    }

    #[test]
    fn empty_boxes_are_dropped() {
        let detector = Fixed(vec![bounds(10.0, 10.0, 0.0, 30.0), bounds(200.0, 0.0, 5.0, 5.0)]);
        let rects = detect_normalized(&detector, &RgbImage::new(100, 100)).unwrap();
        assert!(rects.is_empty());
    }
}
