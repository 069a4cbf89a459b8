use image::RgbImage;
use serde::Serialize;

use crate::config::Thresholds;
use crate::ocr::TextLine;

/// WCAG verdict for a text region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WcagVerdict {
    /// Ratio at or above 4.5.
    Pass,
    /// Ratio at or above 3.0.
    Warn,
    /// Ratio below 3.0.
    Fail,
}

/// Estimated contrast for one recognized text line.
#[derive(Debug, Clone, PartialEq)]
pub struct ContrastResult {
    /// Index into the text-line slice this result refers to.
    pub text_index: usize,
    /// WCAG contrast ratio, at least 1.0.
    pub ratio: f64,
    /// Verdict against the WCAG thresholds.
    pub verdict: WcagVerdict,
}

/// WCAG relative luminance of an sRGB color, using the standard piecewise
/// linearization.
pub fn relative_luminance(r: u8, g: u8, b: u8) -> f64 {
    fn linearize(c: u8) -> f64 {
        let c = c as f64 / 255.0;
        if c <= 0.03928 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    }
    0.2126 * linearize(r) + 0.7152 * linearize(g) + 0.0722 * linearize(b)
}

/// WCAG contrast ratio between two colors; symmetric in its arguments.
pub fn contrast_ratio(a: [u8; 3], b: [u8; 3]) -> f64 {
    ratio_from_luminances(
        relative_luminance(a[0], a[1], a[2]),
        relative_luminance(b[0], b[1], b[2]),
    )
}

fn ratio_from_luminances(l1: f64, l2: f64) -> f64 {
    let lighter = l1.max(l2);
    let darker = l1.min(l2);
    (lighter + 0.05) / (darker + 0.05)
}

/// Estimate fore/background contrast for each qualifying text line.
///
/// Foreground is approximated by the darkest decile of pixels inside the
/// (shrunken) text box and background by the brightest decile, which holds up
/// against anti-aliased glyph edges without true segmentation. Boxes too
/// small to sample reliably are skipped, never failed.
pub fn compute_contrast(
    image: &RgbImage,
    texts: &[TextLine],
    thresholds: &Thresholds,
) -> Vec<ContrastResult> {
    let (w, h) = image.dimensions();
    let mut results = Vec::new();

    for (index, line) in texts.iter().enumerate() {
        let bbox = line.bbox;
        if bbox.w <= 4 || bbox.h <= 4 {
            continue;
        }
        let Some(sample_rect) = bbox
            .shrink(thresholds.contrast_shrink_margin_px)
            .and_then(|r| r.clip(w, h))
        else {
            continue;
        };
        if sample_rect.area() < thresholds.min_contrast_sample_px as u64 {
            continue;
        }

        // Per-pixel relative luminances, sorted so the deciles fall out.
        let mut lums: Vec<f64> = Vec::with_capacity(sample_rect.area() as usize);
        for y in sample_rect.y..sample_rect.bottom() {
            for x in sample_rect.x..sample_rect.right() {
                let p = image.get_pixel(x, y).0;
                lums.push(relative_luminance(p[0], p[1], p[2]));
            }
        }
        if lums.len() < 10 {
            continue;
        }
        lums.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let n = (lums.len() / 10).max(1);
        let fg: f64 = lums[..n].iter().sum::<f64>() / n as f64;
        let bg: f64 = lums[lums.len() - n..].iter().sum::<f64>() / n as f64;

        let ratio = ratio_from_luminances(fg, bg);
        let verdict = if ratio >= 4.5 {
            WcagVerdict::Pass
        } else if ratio >= 3.0 {
            WcagVerdict::Warn
        } else {
            WcagVerdict::Fail
        };
        results.push(ContrastResult {
            text_index: index,
            ratio,
            verdict,
        });
    }
    results
}
