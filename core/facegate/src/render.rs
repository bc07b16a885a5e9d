//! Compositing a photo for one viewer.
//!
//! The base variant is drawn first; it is already obscured, so it is safe for
//! anyone. Each face slice then runs as its own task that may replace its
//! rectangle with a sharp insert. A task that is denied, times out, or fails
//! in any way leaves the rectangle as drawn. Denial and failure look the same
//! in the output.
//!
//! Overlays are applied in completion order by the render call itself, so the
//! raster needs no lock. If two rectangles overlap, the slice whose task
//! finished last owns the shared pixels; which one that is, is not defined.

use std::sync::Arc;
use std::time::Duration;

use image::RgbImage;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, instrument};

use crate::codec::{self, ResizeFilter};
use crate::error::{FaceGateError, Result};
use crate::ladder::{ImageVariant, ResolutionLadder};
use crate::permission::AuthorizationGate;
use crate::records::{AccountId, FaceSliceId, GroupId, Photo, PhotoId};
use crate::region::PixelRect;
use crate::store::PhotoStore;

/// Settings for [`Compositor`]. Loadable from JSON with camelCase keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderOptions {
    /// Physical pixels per canvas pixel; scales the width used to pick a rung.
    pub device_pixel_ratio: f32,
    /// Pixels added on every side of a face rectangle so rounding never
    /// leaves a seam between insert and base.
    pub overlay_margin: u32,
    /// Filter used to fit a face variant into its rectangle.
    pub overlay_filter: ResizeFilter,
    /// Filter used for the final resample to the canvas width.
    pub output_filter: ResizeFilter,
    /// Upper bound for one face slice's gate check, fetch and decode.
    pub slice_timeout_ms: u64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            device_pixel_ratio: 1.0,
            overlay_margin: 1,
            overlay_filter: ResizeFilter::Lanczos3,
            output_filter: ResizeFilter::Lanczos3,
            slice_timeout_ms: 10_000,
        }
    }
}

/// A finished render.
#[derive(Debug, Clone)]
pub struct RenderedPhoto {
    /// `canvas_width` wide, height following the base variant's aspect ratio.
    pub image: RgbImage,
    /// The base rung the render was composited on.
    pub base_variant: ImageVariant,
}

/// Renders photos on behalf of viewers.
#[derive(Clone)]
pub struct Compositor {
    store: Arc<dyn PhotoStore>,
    gate: Arc<dyn AuthorizationGate>,
    options: RenderOptions,
}

impl Compositor {
    /// Render from `store`, asking `gate` before every sharp fetch.
    pub fn new(store: Arc<dyn PhotoStore>, gate: Arc<dyn AuthorizationGate>) -> Self {
        Self {
            store,
            gate,
            options: RenderOptions::default(),
        }
    }

    /// Replace all settings at once.
    pub fn options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the display density (default: 1.0). Non-positive values count as 1.0.
    pub fn device_pixel_ratio(mut self, ratio: f32) -> Self {
        self.options.device_pixel_ratio = ratio;
        self
    }

    /// Set the pixels added around each face rectangle (default: 1).
    pub fn overlay_margin(mut self, margin: u32) -> Self {
        self.options.overlay_margin = margin;
        self
    }

    /// Bound the time one face slice may take (default: 10 s).
    pub fn slice_timeout(mut self, timeout: Duration) -> Self {
        self.options.slice_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Pixel width used to choose the base rung for a canvas.
    pub fn target_width(&self, canvas_width: u32) -> u32 {
        let ratio = self.options.device_pixel_ratio;
        let ratio = if ratio.is_finite() && ratio > 0.0 { ratio } else { 1.0 };
        (canvas_width as f32 * ratio).ceil() as u32
    }

    /// Load a photo record and render it.
    pub async fn render_by_id(
        &self,
        photo: PhotoId,
        viewer: AccountId,
        canvas_width: u32,
    ) -> Result<RenderedPhoto> {
        let photo = self.store.load_photo(photo).await?;
        self.render(&photo, viewer, canvas_width).await
    }

    /// Composite `photo` as `viewer` sees it at `canvas_width` pixels.
    ///
    /// Fails only before anything is drawn: for a zero canvas width, or when
    /// the base variant cannot be loaded or decoded. Face slices never fail
    /// the call.
    #[instrument(skip_all, fields(photo = %photo.id, canvas_width = canvas_width))]
    pub async fn render(
        &self,
        photo: &Photo,
        viewer: AccountId,
        canvas_width: u32,
    ) -> Result<RenderedPhoto> {
        if canvas_width == 0 {
            return Err(FaceGateError::InvalidCanvasWidth);
        }

        let target = self.target_width(canvas_width);
        let base_variant = photo.base.select_for_viewport(target).clone();
        let mut raster = {
            let bytes = self
                .store
                .load_blob(base_variant.blob)
                .await
                .map_err(FaceGateError::MissingBaseImage)?;
            codec::decode_image(&bytes)?
        };
        let (base_width, base_height) = raster.dimensions();
        debug!(target, base_width, base_height, "drew base variant");

        let mut tasks = JoinSet::new();
        for slice in photo.live_slices() {
            let Some(rect) = slice
                .rect
                .to_pixels(base_width, base_height, self.options.overlay_margin)
            else {
                debug!(slice = %slice.id, "degenerate face rectangle, left obscured");
                continue;
            };

            let job = SliceJob {
                slice: slice.id,
                ladder: slice.ladder.clone(),
                group: slice.owner_group,
                rect,
                sibling_width: base_width,
            };
            let store = Arc::clone(&self.store);
            let gate = Arc::clone(&self.gate);
            let filter = self.options.overlay_filter;
            let timeout = Duration::from_millis(self.options.slice_timeout_ms);

            tasks.spawn(async move {
                let slice = job.slice;
                match tokio::time::timeout(timeout, job.fetch(store, gate, viewer, filter)).await {
                    Ok(overlay) => overlay,
                    Err(_) => {
                        debug!(%slice, "face slice timed out, left obscured");
                        None
                    }
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Ok(Some(overlay)) = joined {
                image::imageops::replace(
                    &mut raster,
                    &overlay.pixels,
                    i64::from(overlay.rect.x),
                    i64::from(overlay.rect.y),
                );
            }
        }

        let height = codec::scaled_height(base_width, base_height, canvas_width);
        let image = codec::resize(&raster, canvas_width, height, self.options.output_filter);

        Ok(RenderedPhoto {
            image,
            base_variant,
        })
    }
}

/// Everything a face slice task needs, owned so the task can be spawned.
struct SliceJob {
    slice: FaceSliceId,
    ladder: ResolutionLadder,
    group: GroupId,
    rect: PixelRect,
    sibling_width: u32,
}

/// Sharp pixels sized to exactly fill `rect`.
struct Overlay {
    rect: PixelRect,
    pixels: RgbImage,
}

impl SliceJob {
    async fn fetch(
        self,
        store: Arc<dyn PhotoStore>,
        gate: Arc<dyn AuthorizationGate>,
        viewer: AccountId,
        filter: ResizeFilter,
    ) -> Option<Overlay> {
        let variant = self.ladder.select_by_sibling_width(self.sibling_width);

        if !gate.can_read(self.group, viewer).await {
            debug!(slice = %self.slice, "viewer may not read face slice");
            return None;
        }

        let bytes = match store.load_blob(variant.blob).await {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(slice = %self.slice, error = %e, "face variant unavailable");
                return None;
            }
        };

        let rect = self.rect;
        // the encoded bytes are dropped as soon as the decode finishes
        let decoded = tokio::task::spawn_blocking(move || -> Result<RgbImage> {
            let face = codec::decode_image(&bytes)?;
            Ok(codec::resize(&face, rect.width, rect.height, filter))
        })
        .await;

        match decoded {
            Ok(Ok(pixels)) => Some(Overlay { rect, pixels }),
            Ok(Err(e)) => {
                debug!(slice = %self.slice, error = %e, "face variant could not be decoded");
                None
            }
            Err(e) => {
                debug!(slice = %self.slice, error = %e, "face decode task failed");
                None
            }
        }
    }
}
