use crate::overlay::model::{CanvasSize, Stroke};
use crate::overlay::raster::RasterCanvas;
use image::{Rgba, RgbaImage};

/// Crop geometry constants. Values are implementation choices, kept
/// configurable rather than pinned as invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropTuning {
    /// Margin added on each side of the raw stroke extent.
    pub padding: i32,
    /// Minimum crop dimensions, so the recognition backend always receives an
    /// image large enough to contain readable glyphs.
    pub min_width: u32,
    pub min_height: u32,
}

impl Default for CropTuning {
    fn default() -> Self {
        Self {
            padding: 30,
            min_width: 100,
            min_height: 100,
        }
    }
}

/// Side length of the blank image produced when there is nothing to crop.
pub const PLACEHOLDER_SIZE: u32 = 200;

/// Axis-aligned rectangle in canvas-local space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Padded bounding box over all stroke points, clamped to the canvas and
/// grown symmetrically to the minimum recognition size. `None` when no
/// strokes exist.
pub fn compute_bounds(
    strokes: &[Stroke],
    canvas: CanvasSize,
    tuning: CropTuning,
) -> Option<BoundingBox> {
    let mut points = strokes.iter().flat_map(|stroke| stroke.points().iter());
    let first = points.next()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for point in points {
        min_x = min_x.min(point.x);
        min_y = min_y.min(point.y);
        max_x = max_x.max(point.x);
        max_y = max_y.max(point.y);
    }

    let min_x = (min_x - tuning.padding).max(0);
    let min_y = (min_y - tuning.padding).max(0);
    let max_x = (max_x + tuning.padding).min(canvas.width as i32);
    let max_y = (max_y + tuning.padding).min(canvas.height as i32);

    let (x, width) = grow_axis(min_x, (max_x - min_x).max(0) as u32, tuning.min_width, canvas.width);
    let (y, height) = grow_axis(
        min_y,
        (max_y - min_y).max(0) as u32,
        tuning.min_height,
        canvas.height,
    );
    Some(BoundingBox {
        x,
        y,
        width,
        height,
    })
}

/// Grows an extent symmetrically around its center up to `min_extent`, then
/// shifts it back inside `[0, limit]`.
fn grow_axis(start: i32, extent: u32, min_extent: u32, limit: u32) -> (i32, u32) {
    let target = min_extent.min(limit).max(1);
    if extent >= target {
        return (start, extent);
    }
    let deficit = (target - extent) as i32;
    let mut start = start - deficit / 2;
    if start < 0 {
        start = 0;
    }
    if start as u32 + target > limit {
        start = (limit - target) as i32;
    }
    (start, target)
}

/// Copies the bounded sub-rectangle of the raster into a new white-backed
/// image; ink drawn over a transparent base is composited onto white so the
/// recognition backend never sees transparency.
///
/// With `None` bounds the uploaded background image is returned when one
/// exists, otherwise a minimal blank placeholder.
pub fn crop_to_image(
    raster: &RasterCanvas,
    bounds: Option<BoundingBox>,
    background: Option<&RgbaImage>,
) -> RgbaImage {
    let Some(bounds) = bounds else {
        return match background {
            Some(image) => image.clone(),
            None => RgbaImage::from_pixel(
                PLACEHOLDER_SIZE,
                PLACEHOLDER_SIZE,
                Rgba([255, 255, 255, 255]),
            ),
        };
    };

    let mut output = RgbaImage::from_pixel(bounds.width, bounds.height, Rgba([255, 255, 255, 255]));
    for y in 0..bounds.height {
        for x in 0..bounds.width {
            let src_x = bounds.x + x as i32;
            let src_y = bounds.y + y as i32;
            if src_x < 0
                || src_y < 0
                || src_x >= raster.width() as i32
                || src_y >= raster.height() as i32
            {
                continue;
            }
            let px = raster.pixel(src_x as u32, src_y as u32);
            output.put_pixel(x, y, blend_over_white(px));
        }
    }
    output
}

fn blend_over_white(px: [u8; 4]) -> Rgba<u8> {
    let alpha = px[3] as u32;
    let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha)) / 255) as u8;
    Rgba([blend(px[0]), blend(px[1]), blend(px[2]), 255])
}
