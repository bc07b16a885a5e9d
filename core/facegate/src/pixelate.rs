//! Irreversible obscuring of a rectangular region.
//!
//! The region is box-averaged down to a tiny grid [`PIXELATE_WIDTH`] cells wide
//! (height keeps the region's aspect ratio) and every pixel is then replaced
//! by its cell's average, which is a nearest-neighbour upscale of the grid.
//! Nothing below the grid resolution survives in the output.
//!
//! Cell `i` along an axis of length `len` split into `cells` covers the
//! pixels `p` with `floor(p * cells / len) == i`. The partition depends only
//! on the rectangle, so a second pass averages uniform cells and changes
//! nothing.

use image::RgbImage;

use crate::region::PixelRect;

/// Width of the intermediate grid in cells.
pub const PIXELATE_WIDTH: u32 = 6;

/// Pixelate `rect` of `image` in place.
///
/// The rectangle is clamped to the raster; rectangles with no area left are
/// ignored.
pub fn pixelate(image: &mut RgbImage, rect: PixelRect) {
    let Some(rect) = rect.clamp_to(image.width(), image.height()) else {
        return;
    };

    let (cols, rows) = grid_size(rect.width, rect.height);
    let col_edges = cell_edges(rect.width, cols);
    let row_edges = cell_edges(rect.height, rows);

    for row in 0..rows as usize {
        let (y0, y1) = (rect.y + row_edges[row], rect.y + row_edges[row + 1]);
        for col in 0..cols as usize {
            let (x0, x1) = (rect.x + col_edges[col], rect.x + col_edges[col + 1]);

            let mut sum = [0u64; 3];
            for y in y0..y1 {
                for x in x0..x1 {
                    let p = image.get_pixel(x, y).0;
                    sum[0] += u64::from(p[0]);
                    sum[1] += u64::from(p[1]);
                    sum[2] += u64::from(p[2]);
                }
            }

            let count = u64::from(x1 - x0) * u64::from(y1 - y0);
            let average = image::Rgb(sum.map(|s| ((s + count / 2) / count) as u8));
            for y in y0..y1 {
                for x in x0..x1 {
                    image.put_pixel(x, y, average);
                }
            }
        }
    }
}

/// Grid dimensions for a `width` × `height` region.
///
/// Height is `ceil(cols * height / width)`. Both axes are capped at the
/// region size so that no cell is empty.
fn grid_size(width: u32, height: u32) -> (u32, u32) {
    let cols = PIXELATE_WIDTH.min(width);
    let rows = (u64::from(cols) * u64::from(height)).div_ceil(u64::from(width)) as u32;
    (cols, rows.clamp(1, height))
}

/// `cells + 1` boundaries, the i-th being `ceil(i * len / cells)`.
fn cell_edges(len: u32, cells: u32) -> Vec<u32> {
    (0..=cells)
        .map(|i| (u64::from(i) * u64::from(len)).div_ceil(u64::from(cells)) as u32)
        .collect()
}
