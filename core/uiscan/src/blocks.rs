use log::debug;
use serde::Serialize;

use crate::config::Thresholds;
use crate::geometry::{sort_reading_order, suppress_overlaps, Rect};
use crate::mask::{
    adaptive_binarize, connected_components, enclosed_pixels, global_binarize, Mask, ADAPTIVE_C,
    ADAPTIVE_WINDOW,
};
use crate::preprocess::Preprocessed;

/// Classification of a detected layout container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    /// Spans a large fraction of the image in both dimensions.
    Section,
    /// A box-like container: card, panel, tile.
    Card,
    /// Passed the size floors but is not box-like enough to call a card.
    Unknown,
}

/// A rectangular layout container detected in the screenshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    /// Bounding box in image coordinates.
    pub bbox: Rect,
    /// Container classification.
    pub kind: BlockKind,
}

/// Noise floor for connected components, in pixels.
const COMPONENT_NOISE_FLOOR: u32 = 64;

/// Detect rectangular layout containers (sections, cards, modals).
///
/// Deterministic for a fixed input; malformed regions are skipped, never
/// raised. An image with no qualifying contours yields an empty vector.
pub fn detect_blocks(pre: &Preprocessed, thresholds: &Thresholds) -> Vec<Block> {
    let (w, h) = pre.enhanced.dimensions();
    let image_area = w as u64 * h as u64;
    if image_area == 0 {
        return Vec::new();
    }

    // Closing kernel scales with the image so rounded card corners merge
    // into solid blobs.
    let close_radius = (w.min(h) / 150).max(2);

    let global = global_binarize(&pre.enhanced).close(close_radius);
    let adaptive = adaptive_binarize(&pre.enhanced, ADAPTIVE_WINDOW, ADAPTIVE_C)
        .close(close_radius);
    let combined = global.union(&adaptive);

    let regions = connected_components(&combined, COMPONENT_NOISE_FLOOR);
    let min_area = (image_area as f64 * thresholds.min_block_area_ratio) as u64;

    let mut kept: Vec<Block> = Vec::new();
    let mut rejected = 0usize;
    for region in &regions {
        let bbox = region.bbox;
        if bbox.area() < min_area
            || bbox.w < thresholds.min_block_width_px
            || bbox.h < thresholds.min_block_height_px
        {
            rejected += 1;
            continue;
        }
        // Contour-style area: the component's face including holes, so a
        // border-only card still reads as box-like. Components already solid
        // enough on raw pixel count skip the flood fill; enclosure can only
        // raise the count.
        let solid = region.pixels as f64 / bbox.area() as f64;
        let rectangularity = if solid >= thresholds.card_rectangularity {
            solid
        } else {
            enclosed_pixels(&combined, &bbox) as f64 / bbox.area() as f64
        };
        if rectangularity < thresholds.min_rectangularity {
            rejected += 1;
            continue;
        }
        kept.push(Block {
            bbox,
            kind: classify(bbox, rectangularity, w, h, thresholds),
        });
    }
    debug!(
        "block detector: {} regions, {} rejected, {} kept",
        regions.len(),
        rejected,
        kept.len()
    );

    sort_reading_order(&mut kept, |b| b.bbox);
    let mut blocks = suppress_overlaps(kept, |b| b.bbox, thresholds.block_dedup_iou);

    // Secondary pass for low-contrast rounded modals the binarization missed.
    for bbox in detect_central_quads(pre, thresholds) {
        let candidate = Block {
            bbox,
            kind: BlockKind::Section,
        };
        if blocks
            .iter()
            .all(|b| b.bbox.iou(&bbox) < thresholds.block_dedup_iou)
        {
            blocks.push(candidate);
        }
    }

    sort_reading_order(&mut blocks, |b| b.bbox);
    blocks
}

fn classify(
    bbox: Rect,
    rectangularity: f64,
    img_w: u32,
    img_h: u32,
    thresholds: &Thresholds,
) -> BlockKind {
    let w_frac = bbox.w as f64 / img_w as f64;
    let h_frac = bbox.h as f64 / img_h as f64;
    if w_frac >= thresholds.section_width_frac && h_frac >= thresholds.section_height_frac {
        BlockKind::Section
    } else if rectangularity >= thresholds.card_rectangularity {
        BlockKind::Card
    } else {
        BlockKind::Unknown
    }
}

/// Find centrally positioned quadrilaterals in the edge map: components
/// whose bounding box has modal-like aspect, whose centroid sits in the
/// central region, and whose four box sides are substantially covered by
/// edge pixels.
fn detect_central_quads(pre: &Preprocessed, thresholds: &Thresholds) -> Vec<Rect> {
    let (w, h) = pre.edges.dimensions();
    let image_area = w as u64 * h as u64;
    let edge_mask = Mask::from_gray(&pre.edges);
    let regions = connected_components(&edge_mask, COMPONENT_NOISE_FLOOR);

    let cx_lo = (w as f64 * thresholds.modal_center_frac) as u32;
    let cx_hi = (w as f64 * (1.0 - thresholds.modal_center_frac)) as u32;
    let cy_lo = (h as f64 * thresholds.modal_center_frac) as u32;
    let cy_hi = (h as f64 * (1.0 - thresholds.modal_center_frac)) as u32;

    let mut quads = Vec::new();
    for region in &regions {
        let bbox = region.bbox;
        let area_frac = bbox.area() as f64 / image_area as f64;
        if area_frac < thresholds.modal_min_area_ratio
            || area_frac > thresholds.modal_max_area_ratio
        {
            continue;
        }
        let aspect = bbox.w as f64 / bbox.h.max(1) as f64;
        if aspect < thresholds.modal_min_aspect || aspect > thresholds.modal_max_aspect {
            continue;
        }
        let (cx, cy) = bbox.center();
        if cx < cx_lo || cx > cx_hi || cy < cy_lo || cy > cy_hi {
            continue;
        }
        if has_four_covered_sides(&pre.edges, &bbox, thresholds.modal_side_coverage) {
            quads.push(bbox);
        }
    }
    if !quads.is_empty() {
        debug!("modal pass: {} central quadrilateral(s)", quads.len());
    }
    quads
}

/// Side-coverage check approximating a four-corner polygon fit: every side of
/// the bounding box must have at least `min_coverage` of its pixels covered
/// by edges within a small band.
fn has_four_covered_sides(edges: &image::GrayImage, bbox: &Rect, min_coverage: f64) -> bool {
    const BAND: u32 = 2;
    let (w, h) = edges.dimensions();

    let row_coverage = |y: u32| -> f64 {
        let y_lo = y.saturating_sub(BAND);
        let y_hi = (y + BAND).min(h - 1);
        let mut covered = 0u32;
        for x in bbox.x..bbox.right().min(w) {
            if (y_lo..=y_hi).any(|yy| edges.get_pixel(x, yy).0[0] > 0) {
                covered += 1;
            }
        }
        covered as f64 / bbox.w.max(1) as f64
    };
    let col_coverage = |x: u32| -> f64 {
        let x_lo = x.saturating_sub(BAND);
        let x_hi = (x + BAND).min(w - 1);
        let mut covered = 0u32;
        for y in bbox.y..bbox.bottom().min(h) {
            if (x_lo..=x_hi).any(|xx| edges.get_pixel(xx, y).0[0] > 0) {
                covered += 1;
            }
        }
        covered as f64 / bbox.h.max(1) as f64
    };

    row_coverage(bbox.y) >= min_coverage
        && row_coverage(bbox.bottom().saturating_sub(1)) >= min_coverage
        && col_coverage(bbox.x) >= min_coverage
        && col_coverage(bbox.right().saturating_sub(1)) >= min_coverage
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::preprocess;
    use image::RgbImage;

    fn fill(img: &mut RgbImage, r: Rect, color: [u8; 3]) {
        for y in r.y..r.bottom() {
            for x in r.x..r.right() {
                img.put_pixel(x, y, image::Rgb(color));
            }
        }
    }

    #[test]
    fn blank_image_yields_no_blocks() {
        let img = RgbImage::from_pixel(400, 300, image::Rgb([250, 250, 250]));
        let pre = preprocess(&img, &Thresholds::default());
        assert!(detect_blocks(&pre, &Thresholds::default()).is_empty());
    }

    #[test]
    fn single_card_is_detected_once() {
        let mut img = RgbImage::from_pixel(800, 600, image::Rgb([245, 245, 245]));
        fill(&mut img, Rect::new(100, 150, 300, 200), [60, 90, 200]);
        let t = Thresholds::default();
        let pre = preprocess(&img, &t);
        let blocks = detect_blocks(&pre, &t);
        assert_eq!(blocks.len(), 1, "got {blocks:?}");
        assert_eq!(blocks[0].kind, BlockKind::Card);
        let b = blocks[0].bbox;
        // Morphology may grow the box slightly; center must hold.
        assert!(b.iou(&Rect::new(100, 150, 300, 200)) > 0.8, "bbox {b:?}");
    }

    #[test]
    fn full_width_region_classifies_as_section() {
        let mut img = RgbImage::from_pixel(800, 600, image::Rgb([250, 250, 250]));
        fill(&mut img, Rect::new(0, 0, 800, 280), [30, 30, 40]);
        let t = Thresholds::default();
        let pre = preprocess(&img, &t);
        let blocks = detect_blocks(&pre, &t);
        assert!(!blocks.is_empty());
        assert_eq!(blocks[0].kind, BlockKind::Section);
    }

    #[test]
    fn no_pair_exceeds_dedup_iou() {
        let mut img = RgbImage::from_pixel(800, 600, image::Rgb([245, 245, 245]));
        fill(&mut img, Rect::new(50, 50, 200, 150), [40, 40, 60]);
        fill(&mut img, Rect::new(300, 50, 200, 150), [40, 40, 60]);
        fill(&mut img, Rect::new(50, 300, 200, 150), [40, 40, 60]);
        let t = Thresholds::default();
        let pre = preprocess(&img, &t);
        let blocks = detect_blocks(&pre, &t);
        for i in 0..blocks.len() {
            for j in (i + 1)..blocks.len() {
                assert!(blocks[i].bbox.iou(&blocks[j].bbox) < t.block_dedup_iou);
            }
        }
    }

    #[test]
    fn blocks_come_back_in_reading_order() {
        let mut img = RgbImage::from_pixel(800, 600, image::Rgb([245, 245, 245]));
        fill(&mut img, Rect::new(400, 350, 200, 150), [40, 40, 60]);
        fill(&mut img, Rect::new(60, 60, 200, 150), [40, 40, 60]);
        let t = Thresholds::default();
        let pre = preprocess(&img, &t);
        let blocks = detect_blocks(&pre, &t);
        for pair in blocks.windows(2) {
            assert!(
                pair[0].bbox.reading_order_key() <= pair[1].bbox.reading_order_key(),
                "out of order: {pair:?}"
            );
        }
    }

    #[test]
    fn bordered_hollow_card_counts_its_face() {
        let mut img = RgbImage::from_pixel(800, 600, image::Rgb([245, 245, 245]));
        let r = Rect::new(100, 150, 300, 200);
        for y in r.y..r.bottom() {
            for x in r.x..r.right() {
                let border =
                    x < r.x + 2 || x >= r.right() - 2 || y < r.y + 2 || y >= r.bottom() - 2;
                if border {
                    img.put_pixel(x, y, image::Rgb([70, 70, 80]));
                }
            }
        }
        let t = Thresholds::default();
        let pre = preprocess(&img, &t);
        let blocks = detect_blocks(&pre, &t);
        assert_eq!(blocks.len(), 1, "{blocks:?}");
        assert_eq!(blocks[0].kind, BlockKind::Card);
    }

    #[test]
    fn thin_separator_is_rejected() {
        let mut img = RgbImage::from_pixel(800, 600, image::Rgb([245, 245, 245]));
        fill(&mut img, Rect::new(0, 300, 800, 3), [50, 50, 50]);
        let t = Thresholds::default();
        let pre = preprocess(&img, &t);
        assert!(detect_blocks(&pre, &t).is_empty());
    }
}
