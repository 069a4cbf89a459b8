use serde::Serialize;

use crate::config::Thresholds;
use crate::preprocess::Preprocessed;

/// A column/gutter layout hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridCandidate {
    /// Number of columns, at least 2.
    pub cols: u32,
    /// Gutter width between columns in pixels.
    #[serde(rename = "gutterPx")]
    pub gutter_px: u32,
    /// Mean edge density inside the hypothesized gutter bands, in `[0, 1]`.
    pub confidence: f64,
}

/// Propose a column-grid hypothesis from edge-density periodicity.
///
/// Returns the best hypothesis clearing the score floor (or `None`) plus the
/// ranked top candidates. Scoring samples the normalized column-wise edge
/// density inside each implied gutter band; layout edges concentrate at the
/// column boundaries that delimit true gutters.
pub fn detect_grid(
    pre: &Preprocessed,
    thresholds: &Thresholds,
) -> (Option<GridCandidate>, Vec<GridCandidate>) {
    let (w, h) = pre.edges.dimensions();
    if w == 0 || h == 0 {
        return (None, Vec::new());
    }

    let profile = column_density(pre);

    let mut candidates: Vec<GridCandidate> = Vec::new();
    for cols in thresholds.grid_min_cols..=thresholds.grid_max_cols {
        let mut gutter = thresholds.grid_gutter_min_px;
        while gutter <= thresholds.grid_gutter_max_px {
            if let Some(score) = score_hypothesis(&profile, w, cols, gutter, thresholds) {
                if score >= thresholds.grid_score_floor {
                    candidates.push(GridCandidate {
                        cols,
                        gutter_px: gutter,
                        confidence: score,
                    });
                }
            }
            gutter += thresholds.grid_gutter_step_px.max(1);
        }
    }

    // Highest score first; ties resolve toward fewer columns, then narrower
    // gutters, keeping the ranking deterministic.
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cols.cmp(&b.cols))
            .then(a.gutter_px.cmp(&b.gutter_px))
    });
    candidates.truncate(thresholds.grid_top_candidates);

    (candidates.first().copied(), candidates)
}

/// Normalized edge density per column: fraction of edge pixels in each
/// pixel column.
fn column_density(pre: &Preprocessed) -> Vec<f64> {
    let (w, h) = pre.edges.dimensions();
    let mut profile = vec![0.0f64; w as usize];
    for (x, slot) in profile.iter_mut().enumerate() {
        let mut count = 0u32;
        for y in 0..h {
            if pre.edges.get_pixel(x as u32, y).0[0] > 0 {
                count += 1;
            }
        }
        *slot = count as f64 / h as f64;
    }
    profile
}

/// Mean edge density inside the gutter bands implied by `(cols, gutter)`.
/// Returns `None` when the implied column width falls below the usability
/// floor.
fn score_hypothesis(
    profile: &[f64],
    width: u32,
    cols: u32,
    gutter: u32,
    thresholds: &Thresholds,
) -> Option<f64> {
    let total_gutter = (cols - 1) * gutter;
    if total_gutter >= width {
        return None;
    }
    let col_w = (width - total_gutter) / cols;
    if col_w < thresholds.grid_min_column_px {
        return None;
    }

    let mut sum = 0.0f64;
    let mut samples = 0u32;
    for i in 1..cols {
        let band_start = i * col_w + (i - 1) * gutter;
        for x in band_start..(band_start + gutter).min(width) {
            sum += profile[x as usize];
            samples += 1;
        }
    }
    if samples == 0 {
        return None;
    }
    Some(sum / samples as f64)
}
