use serde::{Deserialize, Serialize};

/// A rectangle relative to an image's full dimensions, every field in `0.0..=1.0`.
///
/// Detector output is imprecise, so out-of-range values are clamped before use
/// instead of being rejected.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedRect {
    /// Left edge as a fraction of the image width.
    pub x: f64,
    /// Top edge as a fraction of the image height.
    pub y: f64,
    /// Width as a fraction of the image width.
    pub width: f64,
    /// Height as a fraction of the image height.
    pub height: f64,
}

impl NormalizedRect {
    /// Create a rectangle from raw fractions. No clamping happens here.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Express a pixel-space box relative to an image of `image_width` × `image_height`.
    pub fn from_pixels(
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        image_width: u32,
        image_height: u32,
    ) -> Self {
        let (w, h) = (f64::from(image_width.max(1)), f64::from(image_height.max(1)));
        Self::new(x / w, y / h, width / w, height / h).clamped()
    }

    /// Clamp into the unit square so that `x + width <= 1` and `y + height <= 1`.
    ///
    /// NaN components collapse to zero.
    pub fn clamped(&self) -> Self {
        let x = unit(self.x);
        let y = unit(self.y);
        Self {
            x,
            y,
            width: unit(self.width).min(1.0 - x),
            height: unit(self.height).min(1.0 - y),
        }
    }

    /// True when the clamped rectangle covers no area.
    pub fn is_degenerate(&self) -> bool {
        let r = self.clamped();
        r.width <= 0.0 || r.height <= 0.0
    }

    /// Map onto an image of `image_width` × `image_height` pixels.
    ///
    /// Edges are rounded outward (floor for the origin, ceil for the far edge)
    /// so the pixel rectangle always covers the normalized one, then grown by
    /// `margin` pixels on every side and clamped to the image. Returns `None`
    /// for degenerate rectangles.
    pub fn to_pixels(&self, image_width: u32, image_height: u32, margin: u32) -> Option<PixelRect> {
        if image_width == 0 || image_height == 0 || self.is_degenerate() {
            return None;
        }
        let r = self.clamped();
        let (w, h) = (f64::from(image_width), f64::from(image_height));

        let x0 = (r.x * w + SNAP).floor() as u32;
        let y0 = (r.y * h + SNAP).floor() as u32;
        let x1 = ((r.x + r.width) * w - SNAP).ceil() as u32;
        let y1 = ((r.y + r.height) * h - SNAP).ceil() as u32;

        let x0 = x0.saturating_sub(margin);
        let y0 = y0.saturating_sub(margin);
        let x1 = x1.saturating_add(margin).min(image_width);
        let y1 = y1.saturating_add(margin).min(image_height);

        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        Some(PixelRect {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        })
    }
}

/// Absorbs float noise such as `(0.1 + 0.2) * 1000.0 == 300.00000000000006`.
const SNAP: f64 = 1e-6;

fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Rectangle in pixel space within a concrete raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelRect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelRect {
    /// A rectangle at (`x`, `y`) of `width` × `height` pixels.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Intersect with a `width` × `height` raster. `None` if nothing is left.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<PixelRect> {
        if self.x >= width || self.y >= height {
            return None;
        }
        let w = self.width.min(width - self.x);
        let h = self.height.min(height - self.y);
        if w == 0 || h == 0 {
            return None;
        }
        Some(PixelRect::new(self.x, self.y, w, h))
    }

    /// True if pixel (`x`, `y`) lies inside.
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x
            && y >= self.y
            && u64::from(x) < u64::from(self.x) + u64::from(self.width)
            && u64::from(y) < u64::from(self.y) + u64::from(self.height)
    }
}
