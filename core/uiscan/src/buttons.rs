use image::{GrayImage, RgbImage};
use log::debug;

use crate::config::Thresholds;
use crate::geometry::{sort_reading_order, suppress_overlaps, Rect};
use crate::mask::{
    adaptive_binarize, connected_components, global_binarize, otsu_threshold, Mask, ADAPTIVE_C,
    ADAPTIVE_WINDOW,
};
use crate::ocr::TextLine;
use crate::preprocess::Preprocessed;

/// A clickable-looking rectangular region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonCandidate {
    /// Bounding box in image coordinates.
    pub bbox: Rect,
    /// Approximate rounded-corner radius in pixels; 0 means sharp corners.
    pub corner_radius: u32,
}

/// Noise floor for proposal components, in pixels.
const PROPOSAL_NOISE_FLOOR: u32 = 64;

/// Threshold offsets swept around Otsu during region proposal.
const PROPOSAL_OFFSETS: [i32; 3] = [-16, 0, 16];

/// Slack allowed when testing whether a text box sits inside a proposal.
const TEXT_CONTAIN_SLACK: u32 = 2;

#[derive(Debug, Clone, Copy)]
struct Scored {
    bbox: Rect,
    corner_radius: u32,
    has_center_text: bool,
}

/// Detect button/CTA candidates.
///
/// Buttons vary enormously in fill, border, and text style, so no single
/// binarization is reliable; this layers independent passes that each feed
/// the same acceptance test and the same suppression step, falling back
/// progressively when earlier passes come up empty. Deterministic given
/// identical `texts` ordering.
pub fn detect_buttons(
    image: &RgbImage,
    pre: &Preprocessed,
    texts: &[TextLine],
    thresholds: &Thresholds,
) -> Vec<ButtonCandidate> {
    if image.width() == 0 || image.height() == 0 {
        return Vec::new();
    }

    let mut accepted = proposal_pass(image, pre, texts, thresholds);

    if accepted.is_empty() {
        debug!("button detector: proposal pass empty, engaging contour fallback");
        accepted = contour_fallback(image, pre, texts, thresholds);
    }

    if accepted.len() < thresholds.button_min_candidates {
        debug!(
            "button detector: {} candidate(s), engaging CTA color-mask fallback",
            accepted.len()
        );
        accepted.extend(cta_mask_pass(image, pre, texts, thresholds));
    }

    // Final cross-pass merge under the tightest overlap ceiling.
    accepted.sort_by_key(|c| (!c.has_center_text, c.bbox.reading_order_key()));
    let merged = suppress_overlaps(accepted, |c| c.bbox, thresholds.button_merge_iou);

    let mut out: Vec<ButtonCandidate> = merged
        .into_iter()
        .map(|c| ButtonCandidate {
            bbox: c.bbox,
            corner_radius: c.corner_radius,
        })
        .collect();
    sort_reading_order(&mut out, |c| c.bbox);
    out
}

/// Pass 1: blob proposals from threshold sweeps over the enhanced grayscale
/// image and its photometric inverse.
fn proposal_pass(
    image: &RgbImage,
    pre: &Preprocessed,
    texts: &[TextLine],
    thresholds: &Thresholds,
) -> Vec<Scored> {
    let proposals = propose_regions(&pre.enhanced, thresholds, thresholds.button_max_aspect);
    let scored = score_proposals(&proposals, image, pre, texts, thresholds);
    rank_and_suppress(scored, thresholds.button_proposal_iou)
}

/// Pass 2 (only when pass 1 found nothing): contours of a closed
/// global/adaptive binarization ensemble, with a relaxed aspect ceiling.
fn contour_fallback(
    image: &RgbImage,
    pre: &Preprocessed,
    texts: &[TextLine],
    thresholds: &Thresholds,
) -> Vec<Scored> {
    let close_radius = 2;
    let mask = global_binarize(&pre.enhanced).close(close_radius).union(
        &adaptive_binarize(&pre.enhanced, ADAPTIVE_WINDOW, ADAPTIVE_C).close(close_radius),
    );

    let mut rects = Vec::new();
    for region in connected_components(&mask, PROPOSAL_NOISE_FLOOR) {
        if passes_shape_filters(&region.bbox, thresholds, thresholds.button_relaxed_max_aspect) {
            rects.push(region.bbox);
        }
    }
    let scored = score_proposals(&rects, image, pre, texts, thresholds);
    rank_and_suppress(scored, thresholds.button_fallback_iou)
}

/// Pass 3 (only when too few candidates survive): bright saturated pixels in
/// the central band of the image, where call-to-action elements typically
/// sit in modals.
fn cta_mask_pass(
    image: &RgbImage,
    pre: &Preprocessed,
    texts: &[TextLine],
    thresholds: &Thresholds,
) -> Vec<Scored> {
    let (w, h) = image.dimensions();
    let x0 = (w as f64 * thresholds.cta_band_x_frac) as u32;
    let x1 = (w as f64 * (1.0 - thresholds.cta_band_x_frac)) as u32;
    let y0 = (h as f64 * thresholds.cta_band_y_frac) as u32;
    let y1 = (h as f64 * (1.0 - thresholds.cta_band_y_frac)) as u32;

    let mask = Mask::from_fn(w, h, |x, y| {
        if x < x0 || x >= x1 || y < y0 || y >= y1 {
            return false;
        }
        let p = image.get_pixel(x, y).0;
        let (s, v) = saturation_value(p[0], p[1], p[2]);
        s >= thresholds.cta_mask_saturation_floor && v >= thresholds.cta_mask_value_floor
    })
    .close(3);

    let mut found = Vec::new();
    for region in connected_components(&mask, PROPOSAL_NOISE_FLOOR) {
        let bbox = region.bbox;
        if !passes_shape_filters(&bbox, thresholds, thresholds.button_max_aspect) {
            continue;
        }
        if !pops_against_background(&bbox, &pre.gray, thresholds) {
            continue;
        }
        found.push(Scored {
            bbox,
            corner_radius: estimate_corner_radius(&bbox, &pre.edges),
            has_center_text: centered_text(&bbox, texts, thresholds).is_some(),
        });
    }
    rank_and_suppress(found, thresholds.button_fallback_iou)
}

/// Blob proposals: sweep thresholds around Otsu on both polarities so
/// light-on-dark and dark-on-light buttons both surface as bright blobs.
fn propose_regions(enhanced: &GrayImage, thresholds: &Thresholds, max_aspect: f64) -> Vec<Rect> {
    let (w, h) = enhanced.dimensions();
    let mut inverted = enhanced.clone();
    for p in inverted.pixels_mut() {
        p.0[0] = 255 - p.0[0];
    }

    let mut rects = Vec::new();
    for source in [enhanced, &inverted] {
        let base = otsu_threshold(source) as i32;
        for offset in PROPOSAL_OFFSETS {
            let thr = (base + offset).clamp(1, 254) as u8;
            let mask =
                Mask::from_fn(w, h, |x, y| source.get_pixel(x, y).0[0] >= thr).close(2);
            for region in connected_components(&mask, PROPOSAL_NOISE_FLOOR) {
                if passes_shape_filters(&region.bbox, thresholds, max_aspect) {
                    rects.push(region.bbox);
                }
            }
        }
    }
    rects.sort_by_key(|r| (r.y, r.x, r.w, r.h));
    rects.dedup();
    rects
}

/// Height band plus aspect band; very thin, very wide shapes are progress
/// bars, not buttons.
fn passes_shape_filters(bbox: &Rect, thresholds: &Thresholds, max_aspect: f64) -> bool {
    if bbox.h < thresholds.button_min_height_px || bbox.h > thresholds.button_max_height_px {
        return false;
    }
    let aspect = bbox.w as f64 / bbox.h.max(1) as f64;
    aspect >= thresholds.button_min_aspect && aspect <= max_aspect
}

/// Apply the four acceptance signals and the input-field rejection to raw
/// proposals.
fn score_proposals(
    proposals: &[Rect],
    image: &RgbImage,
    pre: &Preprocessed,
    texts: &[TextLine],
    thresholds: &Thresholds,
) -> Vec<Scored> {
    let mut accepted = Vec::new();
    for &bbox in proposals {
        let centered = centered_text(&bbox, texts, thresholds);
        let radius = estimate_corner_radius(&bbox, &pre.edges);
        let rounded =
            radius > 0 && radius as f64 / bbox.h.max(1) as f64 >= thresholds.button_corner_radius_ratio;
        let fill = uniform_cta_fill(&bbox, image, thresholds);
        let pop = pops_against_background(&bbox, &pre.gray, thresholds);

        if centered.is_none() && !rounded && !fill && !pop {
            if has_left_aligned_text(&bbox, texts, thresholds) {
                // Likely a text-input field with a left-aligned label. This
                // can suppress legitimate left-labeled buttons; accepted
                // trade-off.
                debug!("button detector: rejecting left-aligned-text box at {bbox:?}");
            }
            continue;
        }

        accepted.push(Scored {
            bbox,
            corner_radius: radius,
            has_center_text: centered.is_some(),
        });
    }
    accepted
}

/// Rank centered-text candidates first, then greedily suppress overlaps.
fn rank_and_suppress(mut scored: Vec<Scored>, max_iou: f64) -> Vec<Scored> {
    scored.sort_by_key(|c| (!c.has_center_text, c.bbox.reading_order_key()));
    suppress_overlaps(scored, |c| c.bbox, max_iou)
}

/// Centered-text signal: the proposal tightly contains exactly one text line
/// whose center falls within an inner band of the proposal.
fn centered_text(bbox: &Rect, texts: &[TextLine], thresholds: &Thresholds) -> Option<usize> {
    let mut contained = texts
        .iter()
        .enumerate()
        .filter(|(_, t)| bbox.contains_rect(&t.bbox, TEXT_CONTAIN_SLACK));
    let (index, line) = contained.next()?;
    if contained.next().is_some() {
        return None;
    }

    let (bcx, bcy) = bbox.center();
    let (tcx, tcy) = line.bbox.center();
    let dx = (tcx as f64 - bcx as f64).abs();
    let dy = (tcy as f64 - bcy as f64).abs();
    if dx <= bbox.w as f64 * thresholds.button_text_band_x_frac
        && dy <= bbox.h as f64 * thresholds.button_text_band_y_frac
    {
        Some(index)
    } else {
        None
    }
}

/// Whether any contained text line hugs the left edge of the proposal.
fn has_left_aligned_text(bbox: &Rect, texts: &[TextLine], thresholds: &Thresholds) -> bool {
    texts.iter().any(|t| {
        bbox.contains_rect(&t.bbox, TEXT_CONTAIN_SLACK)
            && (t.bbox.center().0 as f64)
                < bbox.x as f64 + bbox.w as f64 * thresholds.button_left_text_frac
    })
}

/// Uniform-CTA-fill signal: interior is a high-saturation, low-variance fill.
fn uniform_cta_fill(bbox: &Rect, image: &RgbImage, thresholds: &Thresholds) -> bool {
    let margin = (bbox.h / 6).max(2);
    let Some(interior) = bbox.shrink(margin).and_then(|r| r.clip(image.width(), image.height()))
    else {
        return false;
    };

    let mut sats = Vec::with_capacity(interior.area() as usize);
    let mut vals = Vec::with_capacity(interior.area() as usize);
    for y in interior.y..interior.bottom() {
        for x in interior.x..interior.right() {
            let p = image.get_pixel(x, y).0;
            let (s, v) = saturation_value(p[0], p[1], p[2]);
            sats.push(s);
            vals.push(v);
        }
    }
    if sats.is_empty() {
        return false;
    }

    let (s_mean, s_std) = mean_stddev(&sats);
    let (_, v_std) = mean_stddev(&vals);
    s_mean >= thresholds.cta_saturation_floor
        && s_std <= thresholds.cta_saturation_stddev_ceiling
        && v_std <= thresholds.cta_value_stddev_ceiling
}

/// Pop-against-background signal: interior brightness exceeds the mean of a
/// surrounding ring with the interior masked out.
fn pops_against_background(bbox: &Rect, gray: &GrayImage, thresholds: &Thresholds) -> bool {
    let (w, h) = gray.dimensions();
    let margin = thresholds.button_ring_margin_px;
    let grown = Rect::new(
        bbox.x.saturating_sub(margin),
        bbox.y.saturating_sub(margin),
        bbox.w + margin * 2,
        bbox.h + margin * 2,
    );
    let Some(ring_rect) = grown.clip(w, h) else {
        return false;
    };

    let mut interior_sum = 0u64;
    let mut interior_count = 0u64;
    let mut ring_sum = 0u64;
    let mut ring_count = 0u64;
    for y in ring_rect.y..ring_rect.bottom() {
        for x in ring_rect.x..ring_rect.right() {
            let v = gray.get_pixel(x, y).0[0] as u64;
            if bbox.contains_point(x, y) {
                interior_sum += v;
                interior_count += 1;
            } else {
                ring_sum += v;
                ring_count += 1;
            }
        }
    }
    if interior_count == 0 || ring_count == 0 {
        return false;
    }
    let delta = interior_sum as f64 / interior_count as f64 - ring_sum as f64 / ring_count as f64;
    delta >= thresholds.button_pop_delta
}

/// Corner radius from the edge map: walk the main diagonal inward from the
/// top-left corner; the radius is the distance to the first edge pixel, 0
/// when the region is empty or no edge is met.
pub(crate) fn estimate_corner_radius(bbox: &Rect, edges: &GrayImage) -> u32 {
    let Some(roi) = bbox.clip(edges.width(), edges.height()) else {
        return 0;
    };
    let diag = roi.w.min(roi.h);
    for d in 1..diag / 2 {
        let x = roi.x + d.min(roi.w - 1);
        let y = roi.y + d.min(roi.h - 1);
        if edges.get_pixel(x, y).0[0] > 0 {
            return d;
        }
    }
    0
}

/// HSV saturation and value in `[0, 1]`.
fn saturation_value(r: u8, g: u8, b: u8) -> (f64, f64) {
    let maxc = r.max(g).max(b) as f64 / 255.0;
    let minc = r.min(g).min(b) as f64 / 255.0;
    let s = if maxc > 0.0 { (maxc - minc) / maxc } else { 0.0 };
    (s, maxc)
}

fn mean_stddev(samples: &[f64]) -> (f64, f64) {
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let var = samples.iter().map(|s| (s - mean) * (s - mean)).sum::<f64>() / n;
    (mean, var.sqrt())
}
