use thiserror::Error;

use crate::records::GroupId;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, FaceGateError>;

/// Errors returned by ingestion, ladder building and rendering.
#[derive(Debug, Error)]
pub enum FaceGateError {
    /// Input bytes are not a supported image.
    #[error("failed to decode image: {0}")]
    DecodeError(String),

    /// A variant could not be encoded.
    #[error("failed to encode image: {0}")]
    EncodeError(String),

    /// The image has zero width or height.
    #[error("image dimensions are zero")]
    ZeroDimensions,

    /// Encoding quality outside `0.0..=1.0`.
    #[error("quality must be between 0.0 and 1.0, got {0}")]
    InvalidQuality(f32),

    /// A ladder was built or deserialized without variants.
    #[error("a resolution ladder needs at least one variant")]
    EmptyLadder,

    /// Rendering was asked for a zero-width canvas.
    #[error("canvas width must be > 0")]
    InvalidCanvasWidth,

    /// The selected base variant could not be fetched.
    #[error("base image could not be loaded: {0}")]
    MissingBaseImage(#[source] StoreError),

    /// The face detector failed and the policy does not allow proceeding.
    #[error("face detection failed: {0}")]
    Detector(#[from] DetectorError),

    /// The store rejected a read or write.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// No permission group with this id is registered.
    #[error("unknown permission group {0}")]
    UnknownGroup(GroupId),
}

/// Failures reported by a [`crate::FaceDetector`].
#[derive(Debug, Clone, Error)]
pub enum DetectorError {
    /// The model could not be loaded; detection is effectively disabled.
    #[error("face detection model unavailable: {0}")]
    ModelUnavailable(String),

    /// The model loaded but detection did not complete.
    #[error("face detection failed: {0}")]
    DetectionFailed(String),
}

/// Failures reported by a [`crate::PhotoStore`].
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Nothing is stored under the requested id.
    #[error("record not found: {0}")]
    NotFound(String),

    /// The backend failed for another reason.
    #[error("storage backend error: {0}")]
    Backend(String),
}
