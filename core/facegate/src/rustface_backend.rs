use std::io::Read;
use std::path::Path;

use crate::error::DetectorError;
use crate::face_detector::{FaceBounds, FaceDetector};

/// Face detector backed by the `rustface` crate (SeetaFace engine).
///
/// The model is read at construction time. A missing or corrupt model file
/// surfaces as [`DetectorError::ModelUnavailable`], which ingestion treats as
/// "detection disabled" under the default policy.
pub struct RustfaceDetector {
    model: rustface::Model,
    min_face_size: u32,
}

impl RustfaceDetector {
    /// Load a SeetaFace frontal model (e.g. `seeta_fd_frontal_v1.0.bin`) from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DetectorError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| DetectorError::ModelUnavailable(format!("{}: {e}", path.display())))?;
        Self::from_reader(file)
    }

    /// Load a model from any reader.
    pub fn from_reader(reader: impl Read) -> Result<Self, DetectorError> {
        let model = rustface::read_model(reader)
            .map_err(|e| DetectorError::ModelUnavailable(e.to_string()))?;
        Ok(Self {
            model,
            min_face_size: 20,
        })
    }

    /// Smallest face, in pixels, the detector will report (default: 20).
    pub fn min_face_size(mut self, size: u32) -> Self {
        self.min_face_size = size;
        self
    }
}

impl FaceDetector for RustfaceDetector {
    fn detect(
        &self,
        gray: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<FaceBounds>, DetectorError> {
        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(self.min_face_size);
        detector.set_score_thresh(2.0);
        detector.set_pyramid_scale_factor(0.8);
        detector.set_slide_window_step(4, 4);

        let faces = detector.detect(&rustface::ImageData::new(gray, width, height));

        Ok(faces
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                FaceBounds {
                    x: bbox.x() as f64,
                    y: bbox.y() as f64,
                    width: bbox.width() as f64,
                    height: bbox.height() as f64,
                    confidence: face.score(),
                }
            })
            .collect())
    }
}
