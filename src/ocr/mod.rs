pub mod date;
pub mod engine;
pub mod error;
pub mod extract;
pub mod preprocess;
pub mod setup;

pub use engine::{Recognizer, TesseractEngine};
pub use error::ScanError;
pub use extract::{ExtractedFields, extract};
pub use setup::ensure_language_data;

use image::DynamicImage;
use std::path::Path;
use tracing::{debug, info};

use crate::config::TrackerConfig;
use preprocess::to_grayscale;

/// Builds the recognizer described by `config`.
pub fn engine_from_config(config: &TrackerConfig) -> TesseractEngine {
    TesseractEngine::new(
        config.tesseract_path.clone(),
        config.tessdata_dir.clone(),
        config.page_segmentation_mode,
    )
}

/// High-level function: screenshot file → extracted career fields.
///
/// Loads the image, optionally converts it to grayscale, runs recognition
/// and extracts fields from the text. Recognition errors abort the scan;
/// fields the text does not contain are simply absent.
pub fn scan_image(
    path: &Path,
    config: &TrackerConfig,
    recognizer: &dyn Recognizer,
) -> Result<ExtractedFields, ScanError> {
    info!("Scanning {}", path.display());

    let img = image::open(path).map_err(|source| ScanError::UnreadableImage {
        path: path.to_path_buf(),
        source,
    })?;

    let img = if config.preprocess {
        debug!("Converting {}x{} image to grayscale", img.width(), img.height());
        DynamicImage::ImageLuma8(to_grayscale(&img.to_rgba8()))
    } else {
        img
    };

    let recognition = recognizer.recognize(&img, &config.language)?;
    for line in &recognition.log {
        debug!("engine: {}", line);
    }
    debug!("OCR raw text:\n{}", recognition.text);

    let fields = extract(&recognition.text);
    info!(
        "Recovered {} of 5 fields from {}",
        fields.recovered_count(),
        path.display()
    );

    Ok(fields)
}
