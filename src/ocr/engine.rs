use image::DynamicImage;
use std::path::PathBuf;
use std::process::Command;
use tempfile::NamedTempFile;
use tracing::debug;

use super::error::ScanError;
use super::setup::{TesseractPaths, resolve_paths};

/// Raw output of one recognition run.
#[derive(Debug, Clone, Default)]
pub struct Recognition {
    /// Recognized text, lines in the engine's reading order.
    pub text: String,
    /// Progress and diagnostic messages emitted by the engine.
    pub log: Vec<String>,
}

/// Image-to-text capability used by the scan pipeline.
pub trait Recognizer: Send + Sync {
    fn recognize(&self, image: &DynamicImage, language: &str) -> Result<Recognition, ScanError>;
}

/// Runs the tesseract command line tool.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    configured_exe: Option<PathBuf>,
    configured_tessdata: Option<PathBuf>,
    page_segmentation_mode: u8,
}

impl TesseractEngine {
    pub fn new(
        configured_exe: Option<PathBuf>,
        configured_tessdata: Option<PathBuf>,
        page_segmentation_mode: u8,
    ) -> Self {
        Self {
            configured_exe,
            configured_tessdata,
            page_segmentation_mode,
        }
    }

    fn paths(&self, language: &str) -> Result<TesseractPaths, ScanError> {
        resolve_paths(
            self.configured_exe.as_deref(),
            self.configured_tessdata.as_deref(),
            language,
        )
    }
}

impl Recognizer for TesseractEngine {
    fn recognize(&self, image: &DynamicImage, language: &str) -> Result<Recognition, ScanError> {
        let paths = self.paths(language)?;

        // Save image to temporary file
        let temp_input = NamedTempFile::with_suffix(".png")?;
        image
            .save(temp_input.path())
            .map_err(|e| ScanError::EngineFailed(format!("could not stage image: {}", e)))?;

        let mut command = Command::new(&paths.executable);
        command
            .arg(temp_input.path())
            .arg("stdout")
            .arg("-l")
            .arg(language)
            .arg("--psm")
            .arg(self.page_segmentation_mode.to_string());
        if let Some(tessdata) = &paths.tessdata {
            command.arg("--tessdata-dir").arg(tessdata);
        }

        debug!("Running {:?}", command);
        let output = command.output()?;

        let log = stderr_lines(&output.stderr);

        if !output.status.success() {
            return Err(ScanError::EngineFailed(format!(
                "{}: {}",
                output.status,
                log.join("; ")
            )));
        }

        Ok(Recognition {
            text: String::from_utf8_lossy(&output.stdout).to_string(),
            log,
        })
    }
}

/// Splits engine stderr into non-empty trimmed lines.
fn stderr_lines(stderr: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(stderr)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stderr_lines() {
        let stderr = b"Estimating resolution as 144\n\n  Detected 12 diacritics \n";
        assert_eq!(
            stderr_lines(stderr),
            vec!["Estimating resolution as 144", "Detected 12 diacritics"]
        );
    }

    #[test]
    fn test_stderr_lines_empty() {
        assert!(stderr_lines(b"").is_empty());
    }

    #[test]
    fn test_missing_configured_binary_is_engine_error() {
        // A configured path that does not exist falls through the search. Whatever
        // the host has installed, the result is either a path or EngineNotFound.
        let engine = TesseractEngine::new(Some(PathBuf::from("/nonexistent/tesseract")), None, 3);
        match engine.paths("eng") {
            Ok(paths) => assert_ne!(paths.executable, PathBuf::from("/nonexistent/tesseract")),
            Err(e) => assert!(matches!(e, ScanError::EngineNotFound)),
        }
    }
}
