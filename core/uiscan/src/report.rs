//! Structured response assembly for the API layer: deterministic IDs,
//! button-to-text matching, and the serialized field names downstream
//! tooling consumes.

use serde::Serialize;

use crate::blocks::{Block, BlockKind};
use crate::buttons::ButtonCandidate;
use crate::contrast::{ContrastResult, WcagVerdict};
use crate::geometry::Rect;
use crate::grid::GridCandidate;
use crate::ocr::TextLine;
use crate::palette::{PaletteResult, ThemeMode};
use crate::spacing::SpacingMetrics;

/// Dimensions of the analyzed image.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ImageInfo {
    /// Width in pixels.
    pub w: u32,
    /// Height in pixels.
    pub h: u32,
}

/// A recognized text line with its deterministic ID.
#[derive(Debug, Clone, Serialize)]
pub struct TextItem {
    /// Deterministic ID of the form `texts.t<index>`.
    pub id: String,
    /// Recognized text content.
    pub text: String,
    /// Bounding box as `[x, y, w, h]`.
    pub bbox: Rect,
    /// Recognition confidence in `[0, 1]`.
    pub conf: f64,
    /// Approximate font size in pixels, derived from line height.
    #[serde(rename = "approxSizePx")]
    pub approx_size_px: u32,
}

/// A detected layout container.
#[derive(Debug, Clone, Serialize)]
pub struct BlockItem {
    /// Deterministic ID of the form `blocks.b<index>`.
    pub id: String,
    /// Bounding box as `[x, y, w, h]`.
    pub bbox: Rect,
    /// Container classification.
    pub kind: BlockKind,
}

/// A detected button/CTA.
#[derive(Debug, Clone, Serialize)]
pub struct ButtonItem {
    /// Deterministic ID of the form `buttons.btn<index>`.
    pub id: String,
    /// Bounding box as `[x, y, w, h]`.
    pub bbox: Rect,
    /// Approximate rounded-corner radius in pixels.
    #[serde(rename = "cornerRadius")]
    pub corner_radius: u32,
    /// Whether a text line contains the button's center point.
    #[serde(rename = "hasCenterText")]
    pub has_center_text: bool,
    /// ID of the matched text line, when one exists.
    #[serde(rename = "textId")]
    pub text_id: Option<String>,
}

/// The surfaced grid hypothesis.
#[derive(Debug, Clone, Serialize)]
pub struct GridInfo {
    /// Number of columns.
    pub cols: u32,
    /// Gutter width in pixels.
    #[serde(rename = "gutterPx")]
    pub gutter_px: u32,
    /// Hypothesis confidence in `[0, 1]`.
    pub confidence: f64,
}

/// Dominant palette and theme classification.
#[derive(Debug, Clone, Serialize)]
pub struct PaletteInfo {
    /// Hex-encoded dominant colors, most populous first.
    pub dominant: Vec<String>,
    /// Dark or light theme.
    pub mode: ThemeMode,
}

/// Contrast estimate for one text line.
#[derive(Debug, Clone, Serialize)]
pub struct ContrastItem {
    /// Deterministic ID of the form `contrast.c<index>`.
    pub id: String,
    /// ID of the text line this measures.
    #[serde(rename = "textId")]
    pub text_id: String,
    /// WCAG contrast ratio, rounded to 3 decimals.
    pub ratio: f64,
    /// Verdict against the WCAG thresholds.
    pub wcag: WcagVerdict,
}

/// Spacing metrics over the recognized text boxes.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsInfo {
    /// Median vertical gap between consecutive lines.
    #[serde(rename = "medianVSpace")]
    pub median_v_space: u32,
    /// Left-edge variance, rounded to 2 decimals.
    #[serde(rename = "leftEdgeVariancePx")]
    pub left_edge_variance_px: f64,
}

/// The complete analysis result assembled for the API layer.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// Analyzer version string.
    pub version: String,
    /// Analyzed image dimensions.
    pub image: ImageInfo,
    /// Recognized text lines in reading order.
    pub texts: Vec<TextItem>,
    /// Contrast estimates for qualifying lines.
    pub contrast: Vec<ContrastItem>,
    /// Detected layout containers in reading order.
    pub blocks: Vec<BlockItem>,
    /// Best grid hypothesis, if any cleared the floor.
    pub grid: Option<GridInfo>,
    /// Detected buttons in reading order.
    pub buttons: Vec<ButtonItem>,
    /// Dominant palette, when palette extraction ran.
    pub palette: Option<PaletteInfo>,
    /// Spacing metrics, when text was available.
    pub metrics: Option<MetricsInfo>,
}

/// Derived font size: roughly 70% of line height.
const APPROX_SIZE_FACTOR: f64 = 0.7;

pub(crate) fn build_texts(lines: &[TextLine]) -> Vec<TextItem> {
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| TextItem {
            id: format!("texts.t{i}"),
            text: line.text.clone(),
            bbox: line.bbox,
            conf: line.confidence,
            approx_size_px: (line.bbox.h as f64 * APPROX_SIZE_FACTOR).round() as u32,
        })
        .collect()
}

pub(crate) fn build_blocks(blocks: &[Block]) -> Vec<BlockItem> {
    blocks
        .iter()
        .enumerate()
        .map(|(i, b)| BlockItem {
            id: format!("blocks.b{i}"),
            bbox: b.bbox,
            kind: b.kind,
        })
        .collect()
}

/// Assemble button items, matching each button to the first text line (in
/// reading order) that contains its center point.
pub(crate) fn build_buttons(buttons: &[ButtonCandidate], texts: &[TextItem]) -> Vec<ButtonItem> {
    buttons
        .iter()
        .enumerate()
        .map(|(i, b)| {
            let (cx, cy) = b.bbox.center();
            let matched = texts.iter().find(|t| t.bbox.contains_point(cx, cy));
            ButtonItem {
                id: format!("buttons.btn{i}"),
                bbox: b.bbox,
                corner_radius: b.corner_radius,
                has_center_text: matched.is_some(),
                text_id: matched.map(|t| t.id.clone()),
            }
        })
        .collect()
}

pub(crate) fn build_contrast(results: &[ContrastResult], texts: &[TextItem]) -> Vec<ContrastItem> {
    results
        .iter()
        .enumerate()
        .filter_map(|(i, r)| {
            let text = texts.get(r.text_index)?;
            Some(ContrastItem {
                id: format!("contrast.c{i}"),
                text_id: text.id.clone(),
                ratio: round_to(r.ratio, 3),
                wcag: r.verdict,
            })
        })
        .collect()
}

pub(crate) fn build_grid(best: Option<GridCandidate>) -> Option<GridInfo> {
    best.map(|g| GridInfo {
        cols: g.cols,
        gutter_px: g.gutter_px,
        confidence: round_to(g.confidence, 3),
    })
}

pub(crate) fn build_palette(palette: Option<PaletteResult>) -> Option<PaletteInfo> {
    palette.map(|p| PaletteInfo {
        dominant: p.dominant,
        mode: p.mode,
    })
}

pub(crate) fn build_metrics(metrics: Option<SpacingMetrics>) -> Option<MetricsInfo> {
    metrics.map(|m| MetricsInfo {
        median_v_space: m.median_vertical_gap_px,
        left_edge_variance_px: round_to(m.left_edge_variance_px, 2),
    })
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_item(id: usize, bbox: Rect) -> TextItem {
        TextItem {
            id: format!("texts.t{id}"),
            text: "x".to_string(),
            bbox,
            conf: 0.9,
            approx_size_px: 11,
        }
    }

    #[test]
    fn text_ids_follow_input_order() {
        let lines = vec![
            TextLine {
                text: "a".into(),
                bbox: Rect::new(0, 0, 40, 16),
                confidence: 0.8,
            },
            TextLine {
                text: "b".into(),
                bbox: Rect::new(0, 30, 40, 16),
                confidence: 0.9,
            },
        ];
        let items = build_texts(&lines);
        assert_eq!(items[0].id, "texts.t0");
        assert_eq!(items[1].id, "texts.t1");
        assert_eq!(items[0].approx_size_px, 11); // round(16 * 0.7)
    }

    #[test]
    fn button_matches_text_by_center_containment() {
        let buttons = vec![ButtonCandidate {
            bbox: Rect::new(100, 100, 120, 40),
            corner_radius: 6,
        }];
        let texts = vec![
            text_item(0, Rect::new(0, 0, 50, 16)),
            text_item(1, Rect::new(130, 110, 60, 20)), // contains (160, 120)
        ];
        let items = build_buttons(&buttons, &texts);
        assert_eq!(items.len(), 1);
        assert!(items[0].has_center_text);
        assert_eq!(items[0].text_id.as_deref(), Some("texts.t1"));
    }

    #[test]
    fn unmatched_button_has_no_text_id() {
        let buttons = vec![ButtonCandidate {
            bbox: Rect::new(10, 10, 60, 30),
            corner_radius: 0,
        }];
        let items = build_buttons(&buttons, &[]);
        assert!(!items[0].has_center_text);
        assert!(items[0].text_id.is_none());
    }

    #[test]
    fn contrast_items_reference_text_ids() {
        let texts = vec![text_item(0, Rect::new(0, 0, 100, 20))];
        let results = vec![ContrastResult {
            text_index: 0,
            ratio: 7.3339,
            verdict: WcagVerdict::Pass,
        }];
        let items = build_contrast(&results, &texts);
        assert_eq!(items[0].id, "contrast.c0");
        assert_eq!(items[0].text_id, "texts.t0");
        assert_eq!(items[0].ratio, 7.334);
    }

    #[test]
    fn serialized_field_names_match_the_wire_contract() {
        let report = AnalysisReport {
            version: "uiscan-test".into(),
            image: ImageInfo { w: 10, h: 20 },
            texts: vec![],
            contrast: vec![],
            blocks: vec![BlockItem {
                id: "blocks.b0".into(),
                bbox: Rect::new(1, 2, 3, 4),
                kind: BlockKind::Card,
            }],
            grid: Some(GridInfo {
                cols: 3,
                gutter_px: 24,
                confidence: 0.42,
            }),
            buttons: vec![ButtonItem {
                id: "buttons.btn0".into(),
                bbox: Rect::new(5, 6, 7, 8),
                corner_radius: 4,
                has_center_text: true,
                text_id: None,
            }],
            palette: None,
            metrics: Some(MetricsInfo {
                median_v_space: 12,
                left_edge_variance_px: 1.25,
            }),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["blocks"][0]["kind"], "card");
        assert_eq!(json["blocks"][0]["bbox"], serde_json::json!([1, 2, 3, 4]));
        assert_eq!(json["grid"]["gutterPx"], 24);
        assert_eq!(json["buttons"][0]["cornerRadius"], 4);
        assert_eq!(json["buttons"][0]["hasCenterText"], true);
        assert_eq!(json["metrics"]["medianVSpace"], 12);
        assert_eq!(json["metrics"]["leftEdgeVariancePx"], 1.25);
        assert!(json["palette"].is_null());
    }
}
