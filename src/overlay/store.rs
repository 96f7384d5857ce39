use crate::overlay::model::{CanvasSize, Point, Stroke};

/// Points closer than this (squared distance) to the previous one are
/// coalesced while a stroke is extended, so pointer jitter does not produce
/// degenerate segments.
const MIN_POINT_DIST_SQ: i64 = 9;

/// A segment newly appended to the in-progress stroke, suitable for
/// incremental rasterization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentAppend {
    pub from: Point,
    pub to: Point,
}

/// Ordered collection of completed strokes plus the in-progress one.
///
/// Lives exactly as long as one overlay: created when it opens, cleared on
/// explicit clear, dropped when it closes. Holds no rendering state; callers
/// are responsible for updating the raster after every mutation.
#[derive(Debug, Clone)]
pub struct StrokeStore {
    region: CanvasSize,
    committed: Vec<Stroke>,
    active: Option<Vec<Point>>,
}

impl StrokeStore {
    pub fn new(region: CanvasSize) -> Self {
        Self {
            region,
            committed: Vec::new(),
            active: None,
        }
    }

    pub fn region(&self) -> CanvasSize {
        self.region
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.committed
    }

    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }

    pub fn stroke_in_progress(&self) -> bool {
        self.active.is_some()
    }

    /// Starts a new in-progress stroke. Silent no-op when a stroke is already
    /// in progress or the point lies outside the drawing region.
    pub fn begin_stroke(&mut self, point: Point) {
        if self.active.is_some() || !self.region.contains(point) {
            return;
        }
        self.active = Some(vec![point]);
    }

    /// Appends a point to the in-progress stroke. Out-of-region points are
    /// ignored so ink never bleeds past the boundary. Returns the appended
    /// segment when one was produced.
    pub fn extend_stroke(&mut self, point: Point) -> Option<SegmentAppend> {
        if !self.region.contains(point) {
            return None;
        }
        let points = self.active.as_mut()?;
        let last = *points.last()?;
        if !far_enough(last, point) {
            return None;
        }
        points.push(point);
        Some(SegmentAppend {
            from: last,
            to: point,
        })
    }

    /// Finalizes the in-progress stroke into the store iff it has at least
    /// two points; otherwise discards it. Returns whether a stroke was kept.
    pub fn commit_stroke(&mut self) -> bool {
        let Some(points) = self.active.take() else {
            return false;
        };
        match Stroke::from_points(points) {
            Some(stroke) => {
                self.committed.push(stroke);
                true
            }
            None => false,
        }
    }

    /// Removes the most recently committed stroke, if any.
    pub fn undo(&mut self) -> bool {
        self.committed.pop().is_some()
    }

    pub fn clear(&mut self) {
        self.committed.clear();
        self.active = None;
    }
}

fn far_enough(last: Point, point: Point) -> bool {
    let dx = point.x as i64 - last.x as i64;
    let dy = point.y as i64 - last.y as i64;
    dx * dx + dy * dy >= MIN_POINT_DIST_SQ
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> StrokeStore {
        StrokeStore::new(CanvasSize::new(100, 100))
    }

    #[test]
    fn begin_while_in_progress_is_a_no_op() {
        let mut store = store();
        store.begin_stroke(Point::new(10, 10));
        store.begin_stroke(Point::new(50, 50));
        store.extend_stroke(Point::new(20, 20));
        assert!(store.commit_stroke());
        assert_eq!(store.strokes()[0].points()[0], Point::new(10, 10));
    }

    #[test]
    fn tap_is_discarded_on_commit() {
        let mut store = store();
        store.begin_stroke(Point::new(10, 10));
        assert!(!store.commit_stroke());
        assert!(store.is_empty());
    }

    #[test]
    fn out_of_region_points_are_ignored() {
        let mut store = store();
        store.begin_stroke(Point::new(-5, 0));
        assert!(!store.stroke_in_progress());

        store.begin_stroke(Point::new(90, 90));
        assert!(store.extend_stroke(Point::new(120, 90)).is_none());
        assert!(store.extend_stroke(Point::new(95, 95)).is_some());
    }

    #[test]
    fn jitter_points_are_coalesced() {
        let mut store = store();
        store.begin_stroke(Point::new(10, 10));
        assert!(store.extend_stroke(Point::new(11, 10)).is_none());
        let segment = store.extend_stroke(Point::new(14, 10)).expect("segment");
        assert_eq!(segment.from, Point::new(10, 10));
        assert_eq!(segment.to, Point::new(14, 10));
    }

    #[test]
    fn undo_removes_most_recent_stroke_only() {
        let mut store = store();
        for start in [10, 30, 50] {
            store.begin_stroke(Point::new(start, start));
            store.extend_stroke(Point::new(start + 10, start));
            store.commit_stroke();
        }
        assert_eq!(store.strokes().len(), 3);
        assert!(store.undo());
        assert_eq!(store.strokes().len(), 2);
        assert_eq!(store.strokes()[1].points()[0], Point::new(30, 30));
    }

    #[test]
    fn undo_on_empty_store_is_a_no_op() {
        let mut store = store();
        assert!(!store.undo());
    }

    #[test]
    fn clear_drops_committed_and_active_strokes() {
        let mut store = store();
        store.begin_stroke(Point::new(10, 10));
        store.extend_stroke(Point::new(20, 10));
        store.commit_stroke();
        store.begin_stroke(Point::new(40, 40));
        store.clear();
        assert!(store.is_empty());
        assert!(!store.stroke_in_progress());
    }
}
