//! Upload-time pipeline: detect faces, obscure them in the base photo, and
//! build the ladders for the base and for every face.

use chrono::Utc;
use image::{DynamicImage, RgbImage};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::codec::{self, ResizeFilter, DEFAULT_QUALITY};
use crate::error::{DetectorError, FaceGateError, Result};
use crate::face_detector::{detect_normalized, FaceDetector};
use crate::ladder::{self, EncodedVariant, LadderOptions, DEFAULT_CANDIDATE_WIDTHS};
use crate::permission::{GroupRegistry, PermissionGroup};
use crate::records::{AccountId, FaceSlice, FaceSliceId, Photo, PhotoId};
use crate::region::{NormalizedRect, PixelRect};
use crate::store::PhotoStore;

/// What to do when the detector reports its model is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DetectorPolicy {
    /// Log and continue with zero face slices. The photo is then shared with
    /// nothing obscured, so callers should check [`Ingested::detection`].
    #[default]
    Proceed,
    /// Fail the upload.
    Abort,
}

/// Settings for [`PhotoIngestor`]. Loadable from JSON with camelCase keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IngestOptions {
    /// Widths to generate; those not narrower than the source are dropped and
    /// the source width is always added.
    pub candidate_widths: Vec<u32>,
    /// JPEG quality for every variant, `0.0..=1.0`.
    pub quality: f32,
    /// Filter used when resizing to each width.
    pub filter: ResizeFilter,
    /// What to do when the detector model is missing.
    pub detector_policy: DetectorPolicy,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            candidate_widths: DEFAULT_CANDIDATE_WIDTHS.to_vec(),
            quality: DEFAULT_QUALITY,
            filter: ResizeFilter::default(),
            detector_policy: DetectorPolicy::default(),
        }
    }
}

/// How face detection went for an upload.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionOutcome {
    /// The detector ran and found this many faces.
    Detected(usize),
    /// No detector was configured.
    Skipped,
    /// The detector could not run; no faces were obscured.
    Unavailable(String),
}

/// Everything produced by one upload, ready to be persisted.
#[derive(Debug, Clone)]
pub struct Ingested {
    /// The record to save once the blobs are stored.
    pub photo: Photo,
    /// Payloads for the base ladder and every face ladder.
    pub blobs: Vec<EncodedVariant>,
    /// One fresh group per face slice, private to the uploader.
    pub groups: Vec<PermissionGroup>,
    /// How face detection went.
    pub detection: DetectionOutcome,
}

impl Ingested {
    /// Write payloads, register the face groups, then save the photo record
    /// last so that subscribers never see a record whose blobs are missing.
    pub async fn persist(self, store: &dyn PhotoStore, groups: &GroupRegistry) -> Result<Photo> {
        for blob in self.blobs {
            store.save_blob(blob.blob, blob.data).await?;
        }
        for group in self.groups {
            groups.insert(group);
        }
        store.save_photo(self.photo.clone()).await?;
        Ok(self.photo)
    }
}

/// Builder for turning an uploaded image into a [`Photo`].
///
/// The sharp source only lives inside the ingestor and is dropped when
/// [`PhotoIngestor::ingest`] returns; it is never encoded as a base variant.
pub struct PhotoIngestor {
    source: RgbImage,
    options: IngestOptions,
    detector: Option<Box<dyn FaceDetector>>,
    extra_faces: Vec<NormalizedRect>,
}

impl PhotoIngestor {
    /// Create an ingestor from raw image bytes (JPEG or PNG).
    pub fn new(input: &[u8]) -> Result<Self> {
        Ok(Self::with_source(codec::decode_image(input)?))
    }

    /// Create an ingestor from an already decoded image.
    pub fn from_image(image: &DynamicImage) -> Result<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(FaceGateError::ZeroDimensions);
        }
        Ok(Self::with_source(codec::flatten_alpha(image)))
    }

    fn with_source(source: RgbImage) -> Self {
        Self {
            source,
            options: IngestOptions::default(),
            detector: None,
            extra_faces: Vec::new(),
        }
    }

    /// Replace all settings at once.
    pub fn options(mut self, options: IngestOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the widths to generate (default: 320, 1024, 2048, 4096).
    pub fn candidate_widths(mut self, widths: impl Into<Vec<u32>>) -> Self {
        self.options.candidate_widths = widths.into();
        self
    }

    /// Set the JPEG quality from 0.0 to 1.0 (default: 0.9).
    pub fn quality(mut self, quality: f32) -> Self {
        self.options.quality = quality;
        self
    }

    /// Set the resize filter (default: Lanczos3).
    pub fn filter(mut self, filter: ResizeFilter) -> Self {
        self.options.filter = filter;
        self
    }

    /// Choose what happens when the detector model is unavailable.
    pub fn detector_policy(mut self, policy: DetectorPolicy) -> Self {
        self.options.detector_policy = policy;
        self
    }

    /// Provide the face detector. Without one, no faces are obscured.
    pub fn face_detector(mut self, detector: Box<dyn FaceDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Face regions marked by hand, obscured and sliced like detected ones.
    ///
    /// They are added to whatever the detector reports, including when no
    /// detector is configured or its model is unavailable. Degenerate
    /// rectangles are ignored.
    pub fn extra_faces(mut self, faces: impl IntoIterator<Item = NormalizedRect>) -> Self {
        self.extra_faces.extend(faces);
        self
    }

    /// Run the pipeline for a photo uploaded by `uploader`.
    pub fn ingest(self, uploader: AccountId) -> Result<Ingested> {
        codec::validate_quality(self.options.quality)?;

        let (width, height) = self.source.dimensions();
        let (mut rects, detection) = self.detect_faces()?;
        if !self.extra_faces.is_empty() {
            debug!(faces = self.extra_faces.len(), "adding hand-marked face regions");
            rects.extend(self.extra_faces.iter().filter(|r| !r.is_degenerate()));
        }
        let ladder_options = LadderOptions {
            quality: self.options.quality,
            filter: self.options.filter,
        };

        let mut blobs = Vec::new();
        let mut groups = Vec::new();
        let mut face_slices = Vec::new();
        let mut obscured: Vec<PixelRect> = Vec::new();

        for rect in rects {
            let Some(region) = rect.to_pixels(width, height, 0) else {
                continue;
            };

            // extract the sharp face before the base copy is obscured
            let face = image::imageops::crop_imm(
                &self.source,
                region.x,
                region.y,
                region.width,
                region.height,
            )
            .to_image();
            let face_ladder =
                ladder::build(&face, &self.options.candidate_widths, None, &ladder_options)?;

            let group = PermissionGroup::owned_by(uploader);
            face_slices.push(FaceSlice {
                id: FaceSliceId::new(),
                rect: rect.clamped(),
                ladder: face_ladder.ladder,
                owner_group: group.id,
                person: None,
                is_deleted: false,
            });
            blobs.extend(face_ladder.encoded);
            groups.push(group);
            obscured.push(region);
        }

        let base = ladder::build(
            &self.source,
            &self.options.candidate_widths,
            Some(obscured.as_slice()),
            &ladder_options,
        )?;
        blobs.extend(base.encoded);

        info!(
            width,
            height,
            faces = face_slices.len(),
            widths = ?base.ladder.widths(),
            "ingested photo"
        );

        Ok(Ingested {
            photo: Photo {
                id: PhotoId::new(),
                base: base.ladder,
                face_slices,
                uploader,
                created_at: Utc::now(),
                is_deleted: false,
            },
            blobs,
            groups,
            detection,
        })
    }

    fn detect_faces(&self) -> Result<(Vec<NormalizedRect>, DetectionOutcome)> {
        let Some(detector) = self.detector.as_deref() else {
            debug!("no face detector configured, nothing will be obscured");
            return Ok((Vec::new(), DetectionOutcome::Skipped));
        };

        match detect_normalized(detector, &self.source) {
            Ok(rects) => {
                debug!(faces = rects.len(), "face detection finished");
                let count = rects.len();
                Ok((rects, DetectionOutcome::Detected(count)))
            }
            Err(DetectorError::ModelUnavailable(reason))
                if self.options.detector_policy == DetectorPolicy::Proceed =>
            {
                warn!(%reason, "face detector unavailable, continuing without face slices");
                Ok((Vec::new(), DetectionOutcome::Unavailable(reason)))
            }
            Err(e) => Err(e.into()),
        }
    }
}
