//! Heuristic UI-screenshot analysis for design-QA tooling: detect text-line
//! geometry consumers (contrast, spacing), layout blocks, buttons/CTAs, a
//! color palette, and grid hints from a decoded screenshot.
//!
//! # Example
//!
//! ```no_run
//! use uiscan::ScreenAnalyzer;
//!
//! let bytes = std::fs::read("screenshot.png").unwrap();
//! let report = ScreenAnalyzer::new(bytes)
//!     .unwrap()
//!     .palette_k(5)
//!     .analyze()
//!     .unwrap();
//! println!("{} blocks, {} buttons", report.blocks.len(), report.buttons.len());
//! ```
//!
//! Every detector is a pure function over the immutable image buffer (plus,
//! where relevant, the recognized text lines): no internal mutable state, no
//! I/O, no locks. Detectors are safe to invoke concurrently across requests;
//! within one analysis, block/grid/palette detection has no data dependency
//! on OCR, while button, contrast, and spacing analysis consume the OCR line
//! list. Cancellation is the calling layer's concern — every operation is a
//! bounded single-pass image scan.
#![warn(missing_docs)]

/// Block/card detection.
pub mod blocks;
/// Button/CTA detection.
pub mod buttons;
/// Detector threshold configuration.
pub mod config;
/// Contrast evaluation for recognized text.
pub mod contrast;
mod error;
/// Geometric primitives shared by every detector.
pub mod geometry;
/// Grid hypothesis detection.
pub mod grid;
mod mask;
/// Text-recognition backend trait and data types.
pub mod ocr;
/// Palette extraction and theme classification.
pub mod palette;
/// Shared image preprocessing.
pub mod preprocess;
/// Structured report assembly.
pub mod report;
/// Spacing metrics over text boxes.
pub mod spacing;

/// Error type returned by uiscan operations.
pub use error::UiScanError;

pub use blocks::{detect_blocks, Block, BlockKind};
pub use buttons::{detect_buttons, ButtonCandidate};
pub use config::Thresholds;
pub use contrast::{compute_contrast, contrast_ratio, ContrastResult, WcagVerdict};
pub use geometry::Rect;
pub use grid::{detect_grid, GridCandidate};
pub use ocr::{OcrBackend, OcrError, TextLine};
pub use palette::{extract_palette, PaletteResult, ThemeMode};
pub use preprocess::{preprocess, Preprocessed};
pub use report::AnalysisReport;
pub use spacing::{compute_spacing_metrics, SpacingMetrics};

use image::RgbImage;
use log::debug;

/// Which subsystems an analysis runs. All on by default.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisModes {
    /// Run the OCR backend (when one is attached).
    pub ocr: bool,
    /// Run block, grid, and button detection.
    pub geometry: bool,
    /// Run contrast evaluation and spacing metrics.
    pub contrast: bool,
    /// Run palette extraction.
    pub palette: bool,
}

impl Default for AnalysisModes {
    fn default() -> Self {
        Self {
            ocr: true,
            geometry: true,
            contrast: true,
            palette: true,
        }
    }
}

/// Largest accepted palette size.
const MAX_PALETTE_K: usize = 16;

/// Builder for analyzing a UI screenshot.
///
/// Decodes the input image on construction, then runs the configured
/// detectors over shared preprocessing and assembles a structured report.
pub struct ScreenAnalyzer {
    image: RgbImage,
    thresholds: Thresholds,
    modes: AnalysisModes,
    palette_k: usize,
    /// User-provided OCR backend. When `None`, text-dependent analyses are
    /// skipped and `texts` comes back empty.
    ocr: Option<Box<dyn OcrBackend>>,
}

impl ScreenAnalyzer {
    /// Create an analyzer from raw image bytes (PNG, JPEG, or WebP).
    pub fn new(input: Vec<u8>) -> Result<Self, UiScanError> {
        let decoded = image::load_from_memory(&input)
            .map_err(|e| UiScanError::DecodeError(e.to_string()))?;
        Self::from_image(decoded.to_rgb8())
    }

    /// Create an analyzer from an already-decoded RGB image.
    pub fn from_image(image: RgbImage) -> Result<Self, UiScanError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(UiScanError::ZeroDimensions);
        }
        Ok(Self {
            image,
            thresholds: Thresholds::default(),
            modes: AnalysisModes::default(),
            palette_k: 5,
            ocr: None,
        })
    }

    /// Override the detector thresholds (default: [`Thresholds::default`]).
    pub fn thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Select which subsystems run (default: all).
    pub fn modes(mut self, modes: AnalysisModes) -> Self {
        self.modes = modes;
        self
    }

    /// Set the palette size (default: 5).
    pub fn palette_k(mut self, k: usize) -> Self {
        self.palette_k = k;
        self
    }

    /// Attach a text-recognition backend.
    ///
    /// Construct the backend once at process start and share it across
    /// analyzers; it owns its own client state. Without a backend, `texts`
    /// is empty and contrast/spacing are skipped — geometry and palette
    /// still run.
    pub fn ocr_backend(mut self, backend: Box<dyn OcrBackend>) -> Self {
        self.ocr = Some(backend);
        self
    }

    /// Run the configured analysis and assemble the report.
    ///
    /// An OCR backend failure is returned as [`UiScanError::Ocr`]; the
    /// caller can distinguish it from "no text found", which yields an empty
    /// `texts` list and a report with the text-independent sections filled.
    pub fn analyze(self) -> Result<AnalysisReport, UiScanError> {
        if self.palette_k == 0 || self.palette_k > MAX_PALETTE_K {
            return Err(UiScanError::InvalidPaletteSize(self.palette_k));
        }

        let (w, h) = self.image.dimensions();
        let pre = preprocess(&self.image, &self.thresholds);
        debug!(
            "analyzing {w}x{h} screenshot (dark theme: {})",
            pre.dark_theme
        );

        let lines = match (&self.ocr, self.modes.ocr) {
            (Some(backend), true) => {
                let mut lines = backend.recognize(&self.image)?;
                // Clamp to image bounds and re-sort; determinism must not
                // hinge on backend ordering.
                lines.retain_mut(|line| match line.bbox.clip(w, h) {
                    Some(clipped) => {
                        line.bbox = clipped;
                        !line.text.is_empty()
                    }
                    None => false,
                });
                lines.sort_by_key(|l| l.bbox.reading_order_key());
                lines
            }
            _ => Vec::new(),
        };

        let texts = report::build_texts(&lines);

        let (blocks, grid, buttons) = if self.modes.geometry {
            let blocks = detect_blocks(&pre, &self.thresholds);
            let (best_grid, _candidates) = detect_grid(&pre, &self.thresholds);
            let buttons = detect_buttons(&self.image, &pre, &lines, &self.thresholds);
            (blocks, best_grid, buttons)
        } else {
            (Vec::new(), None, Vec::new())
        };

        let palette = if self.modes.palette {
            Some(extract_palette(
                &self.image,
                self.palette_k,
                &self.thresholds,
            ))
        } else {
            None
        };

        let (contrast, metrics) = if self.modes.contrast && !lines.is_empty() {
            let contrast = compute_contrast(&self.image, &lines, &self.thresholds);
            let boxes: Vec<Rect> = lines.iter().map(|l| l.bbox).collect();
            let metrics = compute_spacing_metrics(&boxes);
            (contrast, Some(metrics))
        } else {
            (Vec::new(), None)
        };

        Ok(AnalysisReport {
            version: format!("uiscan-{}", env!("CARGO_PKG_VERSION")),
            image: report::ImageInfo { w, h },
            contrast: report::build_contrast(&contrast, &texts),
            blocks: report::build_blocks(&blocks),
            grid: report::build_grid(grid),
            buttons: report::build_buttons(&buttons, &texts),
            palette: report::build_palette(palette),
            metrics: report::build_metrics(metrics),
            texts,
        })
    }
}
