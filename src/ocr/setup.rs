use anyhow::{Context, Result, anyhow};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use super::error::ScanError;

const TESSDATA_REPO: &str = "https://github.com/tesseract-ocr/tessdata/raw/main";

#[cfg(windows)]
const TESSERACT_EXE: &str = "tesseract.exe";
#[cfg(not(windows))]
const TESSERACT_EXE: &str = "tesseract";

const COMMON_EXECUTABLE_PATHS: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR\tesseract.exe",
    r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
    "/usr/bin/tesseract",
    "/usr/local/bin/tesseract",
    "/opt/homebrew/bin/tesseract",
];

const COMMON_TESSDATA_PATHS: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR\tessdata",
    r"C:\Program Files (x86)\Tesseract-OCR\tessdata",
    "/usr/share/tesseract-ocr/5/tessdata",
    "/usr/share/tesseract-ocr/4.00/tessdata",
    "/usr/share/tessdata",
    "/usr/local/share/tessdata",
    "/opt/homebrew/share/tessdata",
];

/// Resolved locations for running tesseract.
#[derive(Debug, Clone)]
pub struct TesseractPaths {
    pub executable: PathBuf,
    /// `None` lets tesseract fall back to its compiled-in data directory.
    pub tessdata: Option<PathBuf>,
}

/// Returns the directory for app-local Tesseract files
pub fn get_tesseract_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fan-tracker")
        .join("tesseract")
}

fn traineddata_name(language: &str) -> String {
    format!("{}.traineddata", language)
}

/// Finds the Tesseract executable.
///
/// Checks the configured path first, then our local dir, then PATH, then
/// common install locations.
pub fn find_tesseract_executable(configured: Option<&Path>) -> Result<PathBuf, ScanError> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        debug!("Configured tesseract path {} does not exist", path.display());
    }

    let local_exe = get_tesseract_dir().join(TESSERACT_EXE);
    if local_exe.exists() {
        return Ok(local_exe);
    }

    if let Ok(output) = Command::new("tesseract").arg("--version").output() {
        if output.status.success() {
            return Ok(PathBuf::from("tesseract"));
        }
    }

    COMMON_EXECUTABLE_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .ok_or(ScanError::EngineNotFound)
}

/// Finds a tessdata directory holding data for `language`.
pub fn find_tessdata_dir(configured: Option<&Path>, language: &str) -> Option<PathBuf> {
    let data_file = traineddata_name(language);

    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(path) = configured {
        candidates.push(path.to_path_buf());
    }
    candidates.push(get_tesseract_dir().join("tessdata"));
    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        let prefix = PathBuf::from(prefix);
        candidates.push(prefix.join("tessdata"));
        candidates.push(prefix);
    }
    candidates.extend(COMMON_TESSDATA_PATHS.iter().map(PathBuf::from));

    candidates.into_iter().find(|dir| dir.join(&data_file).exists())
}

/// Resolves both the executable and the data directory.
pub fn resolve_paths(
    configured_exe: Option<&Path>,
    configured_tessdata: Option<&Path>,
    language: &str,
) -> Result<TesseractPaths, ScanError> {
    let executable = find_tesseract_executable(configured_exe)?;
    let tessdata = find_tessdata_dir(configured_tessdata, language);
    Ok(TesseractPaths { executable, tessdata })
}

/// Ensures trained data for `language` is available, downloading it into
/// the local tessdata dir if no copy is found.
pub fn ensure_language_data(configured_tessdata: Option<&Path>, language: &str) -> Result<PathBuf> {
    if let Some(dir) = find_tessdata_dir(configured_tessdata, language) {
        info!("Found {} in {}", traineddata_name(language), dir.display());
        return Ok(dir);
    }

    let tessdata_dir = get_tesseract_dir().join("tessdata");
    fs::create_dir_all(&tessdata_dir)
        .with_context(|| format!("Failed to create {}", tessdata_dir.display()))?;

    download_tessdata(&tessdata_dir, language)?;
    Ok(tessdata_dir)
}

/// Downloads trained data for one language from the tessdata repository
fn download_tessdata(tessdata_dir: &Path, language: &str) -> Result<()> {
    let file_name = traineddata_name(language);
    let url = format!("{}/{}", TESSDATA_REPO, file_name);
    let dest = tessdata_dir.join(&file_name);

    info!("Downloading {}...", file_name);

    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(300))
        .build()?;

    let response = client
        .get(&url)
        .header("User-Agent", "fan-tracker")
        .send()?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Failed to download {}: HTTP {}",
            file_name,
            response.status()
        ));
    }

    let bytes = response.bytes()?;
    let mut file = fs::File::create(&dest)
        .with_context(|| format!("Failed to create {}", dest.display()))?;
    file.write_all(&bytes)?;

    info!("Downloaded {} ({} bytes)", file_name, bytes.len());

    Ok(())
}
