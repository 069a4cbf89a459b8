use serde::Serialize;

use crate::geometry::Rect;

/// Vertical rhythm and left-alignment consistency over text boxes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpacingMetrics {
    /// Median vertical gap between consecutive boxes in reading order.
    #[serde(rename = "medianVerticalGapPx")]
    pub median_vertical_gap_px: u32,
    /// Population variance of left-edge x coordinates.
    #[serde(rename = "leftEdgeVariancePx")]
    pub left_edge_variance_px: f64,
}

/// Compute spacing metrics from text bounding boxes. Empty input yields zero
/// metrics, not an error.
pub fn compute_spacing_metrics(boxes: &[Rect]) -> SpacingMetrics {
    if boxes.is_empty() {
        return SpacingMetrics {
            median_vertical_gap_px: 0,
            left_edge_variance_px: 0.0,
        };
    }

    let mut sorted: Vec<Rect> = boxes.to_vec();
    sorted.sort_by_key(|b| b.reading_order_key());

    let mut gaps: Vec<u32> = Vec::with_capacity(sorted.len().saturating_sub(1));
    for pair in sorted.windows(2) {
        // Overlapping or same-line boxes clamp to zero.
        let gap = pair[1].y.saturating_sub(pair[0].bottom());
        gaps.push(gap);
    }
    gaps.sort_unstable();
    let median = if gaps.is_empty() {
        0
    } else if gaps.len() % 2 == 1 {
        gaps[gaps.len() / 2]
    } else {
        // Average of the middle pair, truncated toward zero.
        (gaps[gaps.len() / 2 - 1] + gaps[gaps.len() / 2]) / 2
    };

    let n = sorted.len() as f64;
    let mean_left = sorted.iter().map(|b| b.x as f64).sum::<f64>() / n;
    let variance = sorted
        .iter()
        .map(|b| {
            let d = b.x as f64 - mean_left;
            d * d
        })
        .sum::<f64>()
        / n;

    SpacingMetrics {
        median_vertical_gap_px: median,
        left_edge_variance_px: variance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_zero_metrics() {
        let m = compute_spacing_metrics(&[]);
        assert_eq!(m.median_vertical_gap_px, 0);
        assert_eq!(m.left_edge_variance_px, 0.0);
    }

    #[test]
    fn uniform_rhythm_reports_the_gap() {
        let boxes = vec![
            Rect::new(40, 10, 200, 20),
            Rect::new(40, 42, 200, 20), // gap 12
            Rect::new(40, 74, 200, 20), // gap 12
        ];
        let m = compute_spacing_metrics(&boxes);
        assert_eq!(m.median_vertical_gap_px, 12);
        assert_eq!(m.left_edge_variance_px, 0.0);
    }

    #[test]
    fn overlapping_boxes_clamp_to_zero_gap() {
        let boxes = vec![Rect::new(0, 10, 50, 30), Rect::new(0, 25, 50, 30)];
        let m = compute_spacing_metrics(&boxes);
        assert_eq!(m.median_vertical_gap_px, 0);
    }

    #[test]
    fn ragged_left_edges_raise_variance() {
        let aligned = vec![
            Rect::new(40, 0, 10, 10),
            Rect::new(40, 20, 10, 10),
            Rect::new(40, 40, 10, 10),
        ];
        let ragged = vec![
            Rect::new(40, 0, 10, 10),
            Rect::new(80, 20, 10, 10),
            Rect::new(10, 40, 10, 10),
        ];
        assert_eq!(compute_spacing_metrics(&aligned).left_edge_variance_px, 0.0);
        assert!(compute_spacing_metrics(&ragged).left_edge_variance_px > 0.0);
    }

    #[test]
    fn input_order_does_not_matter() {
        let a = vec![
            Rect::new(0, 60, 50, 20),
            Rect::new(0, 0, 50, 20),
            Rect::new(0, 30, 50, 20),
        ];
        let mut b = a.clone();
        b.reverse();
        assert_eq!(compute_spacing_metrics(&a), compute_spacing_metrics(&b));
    }
}
