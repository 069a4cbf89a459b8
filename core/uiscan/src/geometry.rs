use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

/// Axis-aligned pixel bounding box, top-left origin.
///
/// Every entity the detectors emit is anchored to one of these. Detected
/// rects always satisfy `w > 0`, `h > 0` and lie within the image bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    /// X coordinate of the top-left corner (pixels).
    pub x: u32,
    /// Y coordinate of the top-left corner (pixels).
    pub y: u32,
    /// Width (pixels).
    pub w: u32,
    /// Height (pixels).
    pub h: u32,
}

impl Rect {
    /// Create a rect from its top-left corner and dimensions.
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.w
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.h
    }

    /// Area in pixels.
    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }

    /// Center point, truncated to integer pixels.
    pub fn center(&self) -> (u32, u32) {
        (self.x + self.w / 2, self.y + self.h / 2)
    }

    /// Whether the point `(px, py)` lies inside the rect.
    pub fn contains_point(&self, px: u32, py: u32) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }

    /// Whether `other` lies entirely inside this rect, allowing `slack`
    /// pixels of overhang on each edge.
    pub fn contains_rect(&self, other: &Rect, slack: u32) -> bool {
        other.x + slack >= self.x
            && other.y + slack >= self.y
            && other.right() <= self.right() + slack
            && other.bottom() <= self.bottom() + slack
    }

    /// Intersection-over-union with another rect. Returns 0.0 for disjoint
    /// rects and for degenerate zero-area inputs.
    pub fn iou(&self, other: &Rect) -> f64 {
        let ix0 = self.x.max(other.x);
        let iy0 = self.y.max(other.y);
        let ix1 = self.right().min(other.right());
        let iy1 = self.bottom().min(other.bottom());
        if ix1 <= ix0 || iy1 <= iy0 {
            return 0.0;
        }
        let inter = (ix1 - ix0) as f64 * (iy1 - iy0) as f64;
        let union = self.area() as f64 + other.area() as f64 - inter;
        if union <= 0.0 {
            return 0.0;
        }
        inter / union
    }

    /// Shrink the rect by `margin` pixels on every side. Returns `None` when
    /// nothing remains.
    pub fn shrink(&self, margin: u32) -> Option<Rect> {
        if self.w <= margin * 2 || self.h <= margin * 2 {
            return None;
        }
        Some(Rect::new(
            self.x + margin,
            self.y + margin,
            self.w - margin * 2,
            self.h - margin * 2,
        ))
    }

    /// Clip the rect to an image of `width` × `height`. Returns `None` when
    /// nothing remains inside the bounds.
    pub fn clip(&self, width: u32, height: u32) -> Option<Rect> {
        let x0 = self.x.min(width);
        let y0 = self.y.min(height);
        let x1 = self.right().min(width);
        let y1 = self.bottom().min(height);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Rect::new(x0, y0, x1 - x0, y1 - y0))
    }

    /// Sort key for reading order: top-to-bottom, then left-to-right.
    pub fn reading_order_key(&self) -> (u32, u32) {
        (self.y, self.x)
    }
}

// Rects serialize as `[x, y, w, h]`, the wire shape consumed downstream.
impl Serialize for Rect {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(4))?;
        seq.serialize_element(&self.x)?;
        seq.serialize_element(&self.y)?;
        seq.serialize_element(&self.w)?;
        seq.serialize_element(&self.h)?;
        seq.end()
    }
}

/// Sort `items` into reading order by their rects.
pub(crate) fn sort_reading_order<T>(items: &mut [T], rect_of: impl Fn(&T) -> Rect) {
    items.sort_by_key(|item| rect_of(item).reading_order_key());
}

/// Greedy overlap suppression shared by the block and button detectors.
///
/// Input order is priority order: an item is kept only if its IoU with every
/// already-kept item stays below `max_iou` (first-seen wins).
pub(crate) fn suppress_overlaps<T>(
    items: Vec<T>,
    rect_of: impl Fn(&T) -> Rect,
    max_iou: f64,
) -> Vec<T> {
    let mut kept: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        let r = rect_of(&item);
        if kept.iter().all(|k| rect_of(k).iou(&r) < max_iou) {
            kept.push(item);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iou_of_identical_rects_is_one() {
        let r = Rect::new(10, 10, 40, 20);
        assert!((r.iou(&r) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn iou_of_disjoint_rects_is_zero() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(20, 20, 10, 10);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn iou_is_symmetric() {
        let a = Rect::new(0, 0, 20, 20);
        let b = Rect::new(10, 10, 20, 20);
        assert!((a.iou(&b) - b.iou(&a)).abs() < 1e-12);
        // 10x10 overlap over 400 + 400 - 100 union
        assert!((a.iou(&b) - 100.0 / 700.0).abs() < 1e-9);
    }

    #[test]
    fn suppression_keeps_first_seen() {
        let rects = vec![
            Rect::new(0, 0, 100, 40),
            Rect::new(5, 2, 100, 40), // heavy overlap with first
            Rect::new(0, 100, 100, 40),
        ];
        let kept = suppress_overlaps(rects, |r| *r, 0.4);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0], Rect::new(0, 0, 100, 40));
        assert_eq!(kept[1], Rect::new(0, 100, 100, 40));
    }

    #[test]
    fn pairwise_iou_invariant_after_suppression() {
        let rects = vec![
            Rect::new(0, 0, 60, 30),
            Rect::new(10, 5, 60, 30),
            Rect::new(20, 10, 60, 30),
            Rect::new(200, 200, 60, 30),
        ];
        let kept = suppress_overlaps(rects, |r| *r, 0.3);
        for i in 0..kept.len() {
            for j in (i + 1)..kept.len() {
                assert!(kept[i].iou(&kept[j]) < 0.3);
            }
        }
    }

    #[test]
    fn clip_trims_to_bounds() {
        let r = Rect::new(90, 40, 30, 30);
        assert_eq!(r.clip(100, 60), Some(Rect::new(90, 40, 10, 20)));
        assert_eq!(Rect::new(120, 0, 10, 10).clip(100, 60), None);
    }

    #[test]
    fn shrink_collapses_small_rects() {
        assert_eq!(Rect::new(0, 0, 4, 10).shrink(2), None);
        assert_eq!(
            Rect::new(10, 10, 20, 12).shrink(2),
            Some(Rect::new(12, 12, 16, 8))
        );
    }

    #[test]
    fn reading_order_sorts_by_y_then_x() {
        let mut rects = vec![
            Rect::new(50, 10, 5, 5),
            Rect::new(0, 10, 5, 5),
            Rect::new(0, 0, 5, 5),
        ];
        sort_reading_order(&mut rects, |r| *r);
        assert_eq!(rects[0], Rect::new(0, 0, 5, 5));
        assert_eq!(rects[1], Rect::new(0, 10, 5, 5));
        assert_eq!(rects[2], Rect::new(50, 10, 5, 5));
    }
}
