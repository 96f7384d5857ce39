use serde::{Deserialize, Serialize};

/// A 2D integer coordinate in canvas-local space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct InkColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl InkColor {
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const INK_BLUE: Self = Self::rgba(0, 0, 255, 255);

    pub fn to_rgba_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BrushStyle {
    pub width: u32,
    pub color: InkColor,
}

impl Default for BrushStyle {
    fn default() -> Self {
        Self {
            width: 3,
            color: InkColor::INK_BLUE,
        }
    }
}

/// Dimensions of the drawing region. Points outside it never enter a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn contains(self, point: Point) -> bool {
        point.x >= 0
            && point.x < self.width as i32
            && point.y >= 0
            && point.y < self.height as i32
    }
}

/// A completed stroke. Immutable once committed: the points are only
/// reachable by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stroke {
    points: Vec<Point>,
}

impl Stroke {
    /// Returns `None` for fewer than two points; a tap produces no visible
    /// ink and is not retained.
    pub fn from_points(points: Vec<Point>) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        Some(Self { points })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Consecutive point pairs, in draw order.
    pub fn segments(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        self.points.windows(2).map(|pair| (pair[0], pair[1]))
    }
}
