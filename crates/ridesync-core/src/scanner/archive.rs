//! Unpack zip archives of activity files next to the archive

use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;
use zip::ZipArchive;

use super::files::walk_files;
use crate::error::{Error, Result};
use crate::utils::short_hash;

/// Archive extensions recognized by the extractor
pub const ARCHIVE_EXTENSIONS: &[&str] = &["zip"];

/// Whether `path` looks like a supported archive
pub fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            ARCHIVE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Outcome of unpacking one archive
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedArchive {
    /// The archive that was unpacked
    pub archive: PathBuf,
    /// Flattened files now living next to the archive
    pub files: Vec<PathBuf>,
    /// Whether the archive was removed afterwards
    pub deleted: bool,
}

/// Extracts archives into uniquely named flat files.
///
/// Every entry is moved to the archive's directory as
/// `<hash(archive name)>-<file name>`, or
/// `<hash(archive name)>-<hash("/" + sub folder)>-<file name>` for nested
/// entries, so repeated exports with identical entry names never collide.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveExtractor {
    delete_archives: bool,
}

impl ArchiveExtractor {
    pub fn new(delete_archives: bool) -> Self {
        Self { delete_archives }
    }

    /// Extract a single archive.
    ///
    /// The temporary extraction directory is removed whatever the outcome.
    /// The archive is deleted, when requested, only after every entry moved.
    pub fn extract(&self, archive: &Path) -> Result<ExtractedArchive> {
        let invalid = |reason: &str| Error::InvalidArchive {
            path: archive.to_path_buf(),
            reason: reason.to_string(),
        };

        let parent = archive
            .parent()
            .ok_or_else(|| invalid("archive has no parent directory"))?;
        let archive_name = archive
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| invalid("archive name is not valid UTF-8"))?;

        let prefix = short_hash(archive_name);
        let temp_dir = tempfile::Builder::new()
            .prefix(&format!(".{}-", prefix))
            .tempdir_in(parent)?;
        let temp_path = temp_dir.path().to_path_buf();

        let result = unpack(archive, &temp_path)
            .and_then(|_| move_entries(&temp_path, parent, &prefix));

        if let Err(e) = temp_dir.close() {
            tracing::warn!("Failed to remove {}: {}", temp_path.display(), e);
        }

        let files = match result {
            Ok(files) => files,
            Err(e) => {
                tracing::error!("Failed to extract {}: {}", archive.display(), e);
                return Err(e);
            }
        };

        if self.delete_archives {
            fs::remove_file(archive)?;
        }

        tracing::info!(
            "Extracted {} files from {}",
            files.len(),
            archive.display()
        );

        Ok(ExtractedArchive {
            archive: archive.to_path_buf(),
            files,
            deleted: self.delete_archives,
        })
    }

    /// Extract every archive under `root`, notifying once per archive.
    ///
    /// Returns all extracted file paths.
    pub fn extract_in_directory<F>(
        &self,
        root: &Path,
        recursive: bool,
        mut on_extracted: F,
    ) -> Result<Vec<PathBuf>>
    where
        F: FnMut(&ExtractedArchive),
    {
        if !root.is_dir() {
            return Err(Error::SourceDirectoryMissing(root.to_path_buf()));
        }

        let archives: Vec<PathBuf> = walk_files(root, recursive)
            .map(|entry| entry.into_path())
            .filter(|path| is_archive(path))
            .collect();

        let mut files = Vec::new();
        for archive in archives {
            let extracted = self.extract(&archive)?;
            on_extracted(&extracted);
            files.extend(extracted.files);
        }

        Ok(files)
    }
}

/// Write all archive entries below `dest`
fn unpack(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry
            .enclosed_name()
            .ok_or_else(|| Error::InvalidArchive {
                path: archive_path.to_path_buf(),
                reason: format!("unsafe entry path: {}", entry.name()),
            })?
            .to_path_buf();

        let dest_path = dest.join(&name);

        if entry.is_dir() {
            fs::create_dir_all(&dest_path)?;
            continue;
        }

        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut output = File::create(&dest_path)?;
        std::io::copy(&mut entry, &mut output)?;
    }

    Ok(())
}

/// Move extracted files from `temp_dir` to `dest` under their flat names
fn move_entries(temp_dir: &Path, dest: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    let mut extracted = Vec::new();
    for entry in WalkDir::new(temp_dir).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() {
            extracted.push(entry.into_path());
        }
    }

    let mut moved = Vec::with_capacity(extracted.len());
    for source in extracted {
        let relative = source.strip_prefix(temp_dir).map_err(|e| Error::Other(e.to_string()))?;
        let target = dest.join(flat_file_name(prefix, relative));

        fs::rename(&source, &target)?;
        moved.push(target);
    }

    Ok(moved)
}

/// Flat name of an entry at `relative` inside an archive
fn flat_file_name(prefix: &str, relative: &Path) -> String {
    let file_name = relative
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let folders: Vec<String> = relative
        .parent()
        .map(|parent| {
            parent
                .components()
                .filter_map(|c| match c {
                    Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    if folders.is_empty() {
        format!("{}-{}", prefix, file_name)
    } else {
        let folder_hash = short_hash(&format!("/{}", folders.join("/")));
        format!("{}-{}-{}", prefix, folder_hash, file_name)
    }
}
