//! Resolution ladders: fixed-width variants of one logical image.

use std::borrow::Cow;

use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::codec::{self, ResizeFilter, DEFAULT_QUALITY};
use crate::error::{FaceGateError, Result};
use crate::pixelate::pixelate;
use crate::records::BlobId;
use crate::region::PixelRect;

/// Widths generated at upload time, before filtering against the source width.
pub const DEFAULT_CANDIDATE_WIDTHS: [u32; 4] = [320, 1024, 2048, 4096];

/// One stored rendition of an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageVariant {
    /// Width in pixels; the size tag the ladder is ordered by.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Where the encoded bytes live.
    pub blob: BlobId,
    /// Encoded size in bytes.
    pub byte_len: usize,
}

impl ImageVariant {
    /// Describe a stored variant.
    pub fn new(width: u32, height: u32, blob: BlobId, byte_len: usize) -> Self {
        Self {
            width,
            height,
            blob,
            byte_len,
        }
    }
}

/// Variants of one image sorted by ascending width. Never empty.
///
/// Ladders are immutable: a photo never gains sizes after upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ImageVariant>", into = "Vec<ImageVariant>")]
pub struct ResolutionLadder {
    variants: Vec<ImageVariant>,
}

impl ResolutionLadder {
    /// Build a ladder from variants in any order. Duplicate widths keep the
    /// first occurrence.
    pub fn new(mut variants: Vec<ImageVariant>) -> Result<Self> {
        if variants.is_empty() {
            return Err(FaceGateError::EmptyLadder);
        }
        variants.sort_by_key(|v| v.width);
        variants.dedup_by_key(|v| v.width);
        Ok(Self { variants })
    }

    /// All variants, narrowest first.
    pub fn variants(&self) -> &[ImageVariant] {
        &self.variants
    }

    /// Widths of every variant, ascending.
    pub fn widths(&self) -> Vec<u32> {
        self.variants.iter().map(|v| v.width).collect()
    }

    /// The narrowest variant.
    pub fn smallest(&self) -> &ImageVariant {
        &self.variants[0]
    }

    /// The original, full-size variant.
    pub fn largest(&self) -> &ImageVariant {
        &self.variants[self.variants.len() - 1]
    }

    /// Smallest variant at least `target_width` wide, or the largest one if
    /// none is wide enough. Never picks a bigger variant than needed, and
    /// never upsamples past what is stored.
    pub fn select_for_viewport(&self, target_width: u32) -> &ImageVariant {
        self.variants
            .iter()
            .find(|v| v.width >= target_width)
            .unwrap_or_else(|| self.largest())
    }

    /// Largest variant no wider than `sibling_width`, or the smallest one if
    /// every variant is wider.
    ///
    /// Used for face inserts so they are never sharper than the base variant
    /// they are drawn over.
    pub fn select_by_sibling_width(&self, sibling_width: u32) -> &ImageVariant {
        self.variants
            .iter()
            .rev()
            .find(|v| v.width <= sibling_width)
            .unwrap_or_else(|| self.smallest())
    }
}

impl TryFrom<Vec<ImageVariant>> for ResolutionLadder {
    type Error = FaceGateError;

    fn try_from(variants: Vec<ImageVariant>) -> Result<Self> {
        Self::new(variants)
    }
}

impl From<ResolutionLadder> for Vec<ImageVariant> {
    fn from(ladder: ResolutionLadder) -> Self {
        ladder.variants
    }
}

/// Encoding settings for [`build`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LadderOptions {
    /// JPEG quality, `0.0..=1.0`.
    pub quality: f32,
    /// Filter used for every downscale.
    pub filter: ResizeFilter,
}

impl Default for LadderOptions {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            filter: ResizeFilter::default(),
        }
    }
}

/// Bytes for one variant, to be written to the store under `blob`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedVariant {
    /// Id the variant record points at.
    pub blob: BlobId,
    /// Encoded JPEG bytes.
    pub data: Vec<u8>,
}

/// Output of [`build`]: the ladder record plus one payload per variant.
#[derive(Debug, Clone)]
pub struct LadderBuild {
    /// The record describing every variant.
    pub ladder: ResolutionLadder,
    /// One payload per variant, in ladder order.
    pub encoded: Vec<EncodedVariant>,
}

/// Widths a ladder built from a `source_width` image will contain: the
/// candidates strictly narrower than the source, plus the source width,
/// ascending.
pub fn ladder_widths(source_width: u32, candidate_widths: &[u32]) -> Vec<u32> {
    let mut widths: Vec<u32> = candidate_widths
        .iter()
        .copied()
        .filter(|&w| w > 0 && w < source_width)
        .collect();
    widths.push(source_width);
    widths.sort_unstable();
    widths.dedup();
    widths
}

/// Produce a resolution ladder for `source`.
///
/// `blurred` regions (in source pixel space) are pixelated on a working copy
/// before any resizing, so every variant inherits the obscuring. The source
/// itself is left untouched.
pub fn build(
    source: &RgbImage,
    candidate_widths: &[u32],
    blurred: Option<&[PixelRect]>,
    options: &LadderOptions,
) -> Result<LadderBuild> {
    let (src_w, src_h) = source.dimensions();
    if src_w == 0 || src_h == 0 {
        return Err(FaceGateError::ZeroDimensions);
    }
    codec::validate_quality(options.quality)?;

    let working: Cow<'_, RgbImage> = match blurred {
        Some(regions) if !regions.is_empty() => {
            let mut copy = source.clone();
            for region in regions {
                pixelate(&mut copy, *region);
            }
            Cow::Owned(copy)
        }
        _ => Cow::Borrowed(source),
    };

    let widths = ladder_widths(src_w, candidate_widths);
    let mut variants = Vec::with_capacity(widths.len());
    let mut encoded = Vec::with_capacity(widths.len());

    for width in widths {
        let height = codec::scaled_height(src_w, src_h, width);
        let resized = codec::resize(&working, width, height, options.filter);
        let data = codec::encode_jpeg(&resized, options.quality)?;
        let blob = BlobId::new();

        debug!(width, height, bytes = data.len(), "encoded ladder variant");

        variants.push(ImageVariant::new(width, height, blob, data.len()));
        encoded.push(EncodedVariant { blob, data });
    }

    Ok(LadderBuild {
        ladder: ResolutionLadder::new(variants)?,
        encoded,
    })
}
