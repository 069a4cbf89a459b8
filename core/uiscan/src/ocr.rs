use image::RgbImage;
use thiserror::Error;

use crate::geometry::Rect;

/// A recognized line of text within a screenshot.
///
/// `text` may be multi-word (space-joined by the backend). Backends report
/// lines in reading order; the analyzer re-sorts defensively before assigning
/// IDs, so ordering here is a courtesy, not a requirement.
#[derive(Debug, Clone)]
pub struct TextLine {
    /// Recognized text content.
    pub text: String,
    /// Bounding box in image coordinates.
    pub bbox: Rect,
    /// Recognition confidence in `[0, 1]`.
    pub confidence: f64,
}

/// Error reported by an OCR backend.
///
/// A backend must fail with one of these rather than returning an empty line
/// list — the caller distinguishes "no text found" from "OCR unavailable".
#[derive(Debug, Error)]
pub enum OcrError {
    /// The backend could not be reached or is not configured.
    #[error("ocr backend unavailable: {0}")]
    Unavailable(String),

    /// The backend was reached but the recognition request failed.
    #[error("ocr request failed: {0}")]
    Failed(String),
}

/// Pluggable text-recognition backend.
///
/// Implement this trait to plug in any OCR engine and pass it to
/// [`crate::ScreenAnalyzer::ocr_backend`]. Backends hold their own clients
/// and credentials; construct one at process start and share it by reference
/// across requests rather than re-authenticating per call.
pub trait OcrBackend: Send + Sync {
    /// Recognize text lines in the image, sorted in reading order.
    ///
    /// Coordinates must be clamped to the image bounds by the implementation;
    /// lines with empty text should be omitted.
    fn recognize(&self, image: &RgbImage) -> Result<Vec<TextLine>, OcrError>;
}
