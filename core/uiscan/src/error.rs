use thiserror::Error;

use crate::ocr::OcrError;

#[derive(Debug, Error)]
pub enum UiScanError {
    #[error("failed to decode image: {0}")]
    DecodeError(String),

    #[error("image dimensions are zero")]
    ZeroDimensions,

    #[error("palette size must be between 1 and 16, got {0}")]
    InvalidPaletteSize(usize),

    #[error(transparent)]
    Ocr(#[from] OcrError),
}
