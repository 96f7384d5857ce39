use crate::overlay::model::{BrushStyle, Point, Stroke};
use image::{imageops, imageops::FilterType, RgbaImage};

const WHITE: [u8; 4] = [255, 255, 255, 255];
const TRANSPARENT: [u8; 4] = [0, 0, 0, 0];

/// Fixed-size RGBA pixel buffer the strokes are rasterized into.
///
/// Derived state: always reconstructable from the stroke sequence (plus an
/// optional background image) via [`RasterCanvas::full_redraw`]. Mutated only
/// from the UI thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterCanvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RasterCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            pixels: vec![0u8; (width as usize) * (height as usize) * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = ((y * self.width + x) * 4) as usize;
        [
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ]
    }

    /// Resets the buffer. With a background image the base is opaque white
    /// with the image scaled (aspect preserved) and centered; without one the
    /// buffer is fully transparent.
    pub fn clear(&mut self, background: Option<&RgbaImage>) {
        let fill = if background.is_some() { WHITE } else { TRANSPARENT };
        for chunk in self.pixels.chunks_exact_mut(4) {
            chunk.copy_from_slice(&fill);
        }
        if let Some(image) = background {
            self.blit_scaled_centered(image);
        }
    }

    /// Draws one line segment with a round brush. Used per pointer-move event
    /// for low-latency live ink.
    pub fn append_segment(&mut self, from: Point, to: Point, brush: BrushStyle) {
        let color = brush.color.to_rgba_array();
        let radius = (brush.width / 2) as i32;
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        let steps = dx.abs().max(dy.abs()).max(1);
        for step in 0..=steps {
            let x = from.x + dx * step / steps;
            let y = from.y + dy * step / steps;
            self.stamp_disc(x, y, radius, color);
        }
    }

    /// Clears the buffer and replays every committed stroke in order. The
    /// resulting raster depends only on the stroke sequence, not on how the
    /// buffer was previously produced.
    pub fn full_redraw(
        &mut self,
        strokes: &[Stroke],
        background: Option<&RgbaImage>,
        brush: BrushStyle,
    ) {
        self.clear(background);
        for stroke in strokes {
            for (from, to) in stroke.segments() {
                self.append_segment(from, to, brush);
            }
        }
    }

    pub fn to_image(&self) -> RgbaImage {
        RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }

    fn stamp_disc(&mut self, cx: i32, cy: i32, radius: i32, color: [u8; 4]) {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy > radius * radius {
                    continue;
                }
                self.set_pixel(cx + dx, cy + dy, color);
            }
        }
    }

    fn set_pixel(&mut self, x: i32, y: i32, color: [u8; 4]) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let idx = ((y as u32 * self.width + x as u32) * 4) as usize;
        self.pixels[idx..idx + 4].copy_from_slice(&color);
    }

    fn blit_scaled_centered(&mut self, image: &RgbaImage) {
        let (iw, ih) = (image.width().max(1), image.height().max(1));
        let scale = (self.width as f64 / iw as f64).min(self.height as f64 / ih as f64);
        let tw = ((iw as f64 * scale).round() as u32).clamp(1, self.width);
        let th = ((ih as f64 * scale).round() as u32).clamp(1, self.height);
        let scaled = imageops::resize(image, tw, th, FilterType::Triangle);
        let ox = (self.width - tw) / 2;
        let oy = (self.height - th) / 2;
        for (x, y, px) in scaled.enumerate_pixels() {
            self.set_pixel((ox + x) as i32, (oy + y) as i32, px.0);
        }
    }
}
