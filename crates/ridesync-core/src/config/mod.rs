//! Configuration for the file connector

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::model::AthleteSnapshot;

/// Options controlling a file connector sync
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConnectorConfig {
    /// Directory holding the activity files
    pub source_directory: PathBuf,
    /// Descend into sub directories
    pub scan_sub_directories: bool,
    /// Unpack archives found in the source directory before scanning.
    /// Ignored when `sync_after` is set.
    pub extract_archive_files: bool,
    /// Remove archives once all their entries were moved out
    pub delete_archives_after_extract: bool,
    /// Guess the sport from the activity profile when the file type is unknown
    pub detect_sport_type_when_unknown: bool,
    /// Skip files last modified before this instant
    pub sync_after: Option<DateTime<Utc>>,
}

impl Default for FileConnectorConfig {
    fn default() -> Self {
        Self {
            source_directory: PathBuf::new(),
            scan_sub_directories: true,
            extract_archive_files: false,
            delete_archives_after_extract: false,
            detect_sport_type_when_unknown: true,
            sync_after: None,
        }
    }
}

impl FileConnectorConfig {
    /// Config for `source_directory` with default options
    pub fn new(source_directory: impl Into<PathBuf>) -> Self {
        Self {
            source_directory: source_directory.into(),
            ..Default::default()
        }
    }
}

/// Configuration for ridesync
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub file_connector: FileConnectorConfig,
    pub athlete: AthleteSnapshot,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ridesync").join("config.json"))
    }

    /// Load config from disk, falling back to defaults if not found
    pub fn load() -> Self {
        Self::config_path()
            .and_then(|path| Self::load_from(&path).ok())
            .unwrap_or_default()
    }

    /// Load config from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save config to disk
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()
            .ok_or_else(|| Error::Config("No config directory available".into()))?;
        self.save_to(&path)
    }

    /// Save config to an explicit file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
