//! Events pushed to the caller during a sync run

use serde::Serialize;
use std::path::PathBuf;

use crate::model::{ConnectorType, SyncedActivity};

/// Stable error codes carried by error events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    SyncAlreadyStarted,
    UnhandledErrorSync,
    MultipleActivitiesFound,
    FsSourceDirectoryDontExists,
    ActivityComputeError,
    ParseError,
}

impl ErrorCode {
    /// Wire representation of the code
    pub fn code(&self) -> &'static str {
        match self {
            Self::SyncAlreadyStarted => "SYNC_ALREADY_STARTED",
            Self::UnhandledErrorSync => "UNHANDLED_ERROR_SYNC",
            Self::MultipleActivitiesFound => "MULTIPLE_ACTIVITIES_FOUND",
            Self::FsSourceDirectoryDontExists => "FS_SOURCE_DIRECTORY_DONT_EXISTS",
            Self::ActivityComputeError => "ACTIVITY_COMPUTE_ERROR",
            Self::ParseError => "PARSE_ERROR",
        }
    }

    /// Whether an error with this code ends the run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::UnhandledErrorSync | Self::FsSourceDirectoryDontExists)
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Error reported on the event stream
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorSyncEvent {
    pub code: ErrorCode,
    pub connector: ConnectorType,
    pub description: String,
    /// File being processed when the error occurred
    pub source: Option<PathBuf>,
}

impl ErrorSyncEvent {
    pub fn new(code: ErrorCode, connector: ConnectorType, description: impl Into<String>) -> Self {
        Self {
            code,
            connector,
            description: description.into(),
            source: None,
        }
    }

    /// Attach the file the error relates to
    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    pub fn already_started(connector: ConnectorType) -> Self {
        Self::new(
            ErrorCode::SyncAlreadyStarted,
            connector,
            format!("Sync of {} connector already started", connector),
        )
    }

    pub fn unhandled(connector: ConnectorType, description: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnhandledErrorSync, connector, description)
    }

    pub fn source_directory_missing(connector: ConnectorType, path: &std::path::Path) -> Self {
        Self::new(
            ErrorCode::FsSourceDirectoryDontExists,
            connector,
            format!("Source directory {} does not exist", path.display()),
        )
        .with_source(path)
    }
}

/// One event of a sync run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    Started {
        connector: ConnectorType,
    },
    ActivityProduced {
        connector: ConnectorType,
        /// `false` when the activity updates a stored one
        is_new: bool,
        activity: Box<SyncedActivity>,
        /// Zipped streams, absent for updates
        #[serde(skip)]
        compressed_stream: Option<Vec<u8>>,
    },
    Error(ErrorSyncEvent),
    Stopped {
        connector: ConnectorType,
    },
    Completed {
        connector: ConnectorType,
    },
}

impl SyncEvent {
    pub fn connector(&self) -> ConnectorType {
        match self {
            Self::Started { connector }
            | Self::ActivityProduced { connector, .. }
            | Self::Stopped { connector }
            | Self::Completed { connector } => *connector,
            Self::Error(error) => error.connector,
        }
    }

    /// Whether this event ends the stream
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Stopped { .. } | Self::Completed { .. } => true,
            Self::Error(error) => error.code.is_fatal(),
            _ => false,
        }
    }
}
