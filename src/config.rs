//! Configuration for scanning.
//!
//! Loads settings from config.json at startup. Provides the OCR language,
//! tesseract location and the optional grayscale pre-filter.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing::{info, warn};

use crate::paths;

/// Global configuration instance, initialized once at startup.
static CONFIG: OnceLock<TrackerConfig> = OnceLock::new();

/// Complete tracker configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Tesseract language identifier
    pub language: String,
    /// Tesseract page segmentation mode (3 = fully automatic)
    pub page_segmentation_mode: u8,
    /// Convert screenshots to grayscale before recognition
    pub preprocess: bool,
    /// Explicit tesseract executable, searched for when unset
    pub tesseract_path: Option<PathBuf>,
    /// Explicit tessdata directory, searched for when unset
    pub tessdata_dir: Option<PathBuf>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            page_segmentation_mode: 3,
            preprocess: false,
            tesseract_path: None,
            tessdata_dir: None,
        }
    }
}

/// Returns the path config.json is read from: `<exe_dir>/config.json`
pub fn config_path() -> PathBuf {
    paths::get_exe_dir().join("config.json")
}

/// Loads configuration from `path` or returns defaults.
pub fn load_config_from(path: &Path) -> TrackerConfig {
    info!("Looking for config at: {}", path.display());

    if !path.exists() {
        info!("config.json not found. Using default config.");
        return TrackerConfig::default();
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(config) => {
                info!("Config loaded from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Failed to parse config.json: {}. Using defaults.", e);
                TrackerConfig::default()
            }
        },
        Err(e) => {
            warn!("Failed to read config.json: {}. Using defaults.", e);
            TrackerConfig::default()
        }
    }
}

/// Initializes the global configuration. Call once at startup.
pub fn init_config() {
    let _ = CONFIG.set(load_config_from(&config_path()));
}

/// Returns the global configuration, loading it on first use.
pub fn get_config() -> &'static TrackerConfig {
    CONFIG.get_or_init(|| load_config_from(&config_path()))
}
