use std::path::PathBuf;

use thiserror::Error;

/// Failure of the recognition stage of a scan.
///
/// Extraction itself never fails, so any of these means no fields were
/// produced for the scan at all.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("could not read image {}: {source}", path.display())]
    UnreadableImage {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("tesseract not found, install Tesseract-OCR or set tesseract_path in config.json")]
    EngineNotFound,

    #[error("tesseract failed: {0}")]
    EngineFailed(String),

    #[error("I/O error during recognition: {0}")]
    Io(#[from] std::io::Error),

    #[error("a scan is already in progress")]
    SlotBusy,
}
