//! Discover activity files in a directory tree

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::error::{Error, Result};

/// Supported activity file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityFileType {
    Gpx,
    Tcx,
    Fit,
}

impl ActivityFileType {
    /// All supported formats
    pub const ALL: [ActivityFileType; 3] = [Self::Gpx, Self::Tcx, Self::Fit];

    /// Detect the format from a file extension (case insensitive)
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        Self::ALL.into_iter().find(|kind| kind.extension() == ext)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Gpx => "gpx",
            Self::Tcx => "tcx",
            Self::Fit => "fit",
        }
    }
}

impl std::fmt::Display for ActivityFileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// An activity file found on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityFile {
    pub path: PathBuf,
    pub file_type: ActivityFileType,
    pub last_modified: DateTime<Utc>,
}

impl ActivityFile {
    /// Describe a single file, reading its modification time
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file_type =
            ActivityFileType::from_path(&path).ok_or_else(|| Error::UnsupportedFile(path.clone()))?;
        let last_modified = std::fs::metadata(&path)?.modified()?.into();

        Ok(Self {
            path,
            file_type,
            last_modified,
        })
    }
}

/// Lists activity files under a root directory
#[derive(Debug, Clone)]
pub struct DirectoryScanner {
    root: PathBuf,
    recursive: bool,
    modified_after: Option<DateTime<Utc>>,
}

impl DirectoryScanner {
    /// Scanner for `root`, non recursive, without date cutoff
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            recursive: false,
            modified_after: None,
        }
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Exclude files last modified strictly before `cutoff`
    pub fn modified_after(mut self, cutoff: Option<DateTime<Utc>>) -> Self {
        self.modified_after = cutoff;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scan the root directory, sorted by file name
    pub fn scan(&self) -> Result<Vec<ActivityFile>> {
        if !self.root.is_dir() {
            return Err(Error::SourceDirectoryMissing(self.root.clone()));
        }

        let mut files = Vec::new();

        for entry in walk_files(&self.root, self.recursive) {
            let Some(file_type) = ActivityFileType::from_path(entry.path()) else {
                continue;
            };

            let last_modified: DateTime<Utc> = match entry.metadata().map(|m| m.modified()) {
                Ok(Ok(modified)) => modified.into(),
                Ok(Err(e)) => {
                    tracing::warn!("Cannot read modification time of {}: {}", entry.path().display(), e);
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Cannot stat {}: {}", entry.path().display(), e);
                    continue;
                }
            };

            if let Some(cutoff) = self.modified_after {
                if last_modified < cutoff {
                    tracing::debug!("Skipping {} modified before {}", entry.path().display(), cutoff);
                    continue;
                }
            }

            files.push(ActivityFile {
                path: entry.into_path(),
                file_type,
                last_modified,
            });
        }

        tracing::info!("Found {} activity files in {}", files.len(), self.root.display());
        Ok(files)
    }
}

/// Regular files under `root`, skipping hidden entries and unreadable ones
pub(crate) fn walk_files(root: &Path, recursive: bool) -> impl Iterator<Item = DirEntry> {
    let max_depth = if recursive { usize::MAX } else { 1 };

    WalkDir::new(root)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('.'))
            .unwrap_or(false)
}
