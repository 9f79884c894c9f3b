//! Archive of original files
//!
//! Every ingested file is copied into the archive directory before extraction.
//! Copies are named `{stem}_{mtime_nanos}{.suffix}` and never overwritten: a
//! name that already exists gets a `-{n}` counter appended to its stem part.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::error::{Error, Result};

/// Upper bound on collision retries for one archive name
const MAX_NAME_ATTEMPTS: u32 = 10_000;

/// Append-only directory of archived originals
#[derive(Debug, Clone)]
pub struct ArchiveStore {
    root: PathBuf,
}

impl ArchiveStore {
    /// Open the archive, creating the directory if needed
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            Error::persistence(format!(
                "Failed to create archive directory {}: {}",
                root.display(),
                e
            ))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Copy `source` into the archive under a name derived from `original_name`.
    ///
    /// Returns the path of the new copy. The source is left untouched.
    pub fn archive(&self, source: &Path, original_name: &str) -> Result<PathBuf> {
        let metadata = fs::metadata(source)?;
        let mtime_nanos = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_nanos())
            .unwrap_or(0);

        let original = Path::new(original_name);
        let stem = original
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("file");
        let suffix = original
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| format!(".{}", s))
            .unwrap_or_default();

        let (dest, mut file) = self.create_unique(stem, mtime_nanos, &suffix)?;

        let copied = File::open(source).and_then(|mut input| io::copy(&mut input, &mut file));
        if let Err(e) = copied.and_then(|_| file.sync_all()) {
            drop(file);
            let _ = fs::remove_file(&dest);
            return Err(Error::persistence(format!(
                "Failed to archive {}: {}",
                source.display(),
                e
            )));
        }
        drop(file);

        if let Ok(meta) = fs::metadata(&dest) {
            let mut permissions = meta.permissions();
            permissions.set_readonly(true);
            let _ = fs::set_permissions(&dest, permissions);
        }

        tracing::debug!("Archived {} -> {}", source.display(), dest.display());
        Ok(dest)
    }

    fn create_unique(&self, stem: &str, mtime_nanos: u128, suffix: &str) -> Result<(PathBuf, File)> {
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let dest = self.root.join(archive_file_name(stem, mtime_nanos, suffix, attempt));
            match OpenOptions::new().write(true).create_new(true).open(&dest) {
                Ok(file) => return Ok((dest, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(Error::persistence(format!(
                        "Failed to create archive file {}: {}",
                        dest.display(),
                        e
                    )))
                }
            }
        }

        Err(Error::persistence(format!(
            "No free archive name for {}_{}{}",
            stem, mtime_nanos, suffix
        )))
    }
}

/// Archive file name for a given collision attempt (0 means no counter)
fn archive_file_name(stem: &str, mtime_nanos: u128, suffix: &str, attempt: u32) -> String {
    if attempt == 0 {
        format!("{}_{}{}", stem, mtime_nanos, suffix)
    } else {
        format!("{}_{}-{}{}", stem, mtime_nanos, attempt, suffix)
    }
}
