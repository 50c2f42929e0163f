//! Error types for ridesync-core

use std::path::PathBuf;
use thiserror::Error;

use crate::sync::ErrorCode;

/// Main error type for ridesync operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read/write ZIP archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Failed to write CSV report: {0}")]
    Csv(#[from] csv::Error),

    #[error("Source directory does not exist: {0}")]
    SourceDirectoryMissing(PathBuf),

    #[error("Unsupported activity file: {0}")]
    UnsupportedFile(PathBuf),

    #[error("Failed to parse activity file {path}: {message}")]
    ActivityParse { path: PathBuf, message: String },

    #[error("Invalid archive {path}: {reason}")]
    InvalidArchive { path: PathBuf, reason: String },

    #[error("Activity computation failed: {0}")]
    Compute(String),

    #[error("{description}")]
    MultipleActivitiesFound { description: String },

    #[error("Activity store lookup failed: {0}")]
    Store(String),

    #[error("A sync is already in progress")]
    SyncAlreadyStarted,

    #[error("No sync in progress")]
    NoSyncInProgress,

    #[error("Unsupported report format: {0} (expected .json or .csv)")]
    UnsupportedReportFormat(PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for an [`Error::ActivityParse`]
    pub fn parse(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::ActivityParse {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Error code reported for a file that fails without ending the run.
    ///
    /// Returns `None` for errors that terminate a sync.
    pub fn sync_error_code(&self) -> Option<ErrorCode> {
        match self {
            Self::ActivityParse { .. } | Self::UnsupportedFile(_) => Some(ErrorCode::ParseError),
            Self::Compute(_) => Some(ErrorCode::ActivityComputeError),
            Self::MultipleActivitiesFound { .. } => Some(ErrorCode::MultipleActivitiesFound),
            _ => None,
        }
    }
}

/// Result type alias for ridesync operations
pub type Result<T> = std::result::Result<T, Error>;
