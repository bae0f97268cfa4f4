//! Directory layout of one slot and pending working files.

use crate::{fsops, naming};
use mediastore_error::{StoreError, StoreResult};
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};

/// Fixed sub-directory for transient working copies.
pub const PENDING_DIR: &str = "pending";
/// Fixed sub-directory for superseded files awaiting purge.
pub const DELETED_DIR: &str = "deleted";

/// Directories of one slot under `<root>/<application>/<logicalPath>/`.
///
/// The slot directory itself holds the regular (current and recently
/// superseded) files.
#[derive(Debug, Clone, PartialEq, Eq, derive_getters::Getters)]
pub struct SlotLayout {
    /// Current and superseded versions
    regular: PathBuf,
    /// Working copies created by publish and bind
    pending: PathBuf,
    /// Superseded versions moved out by the obsolescence sweep
    deleted: PathBuf,
}

impl SlotLayout {
    /// Layout for a logical path under an application root.
    pub fn new(root: &Path, application: &str, logical_path: &str) -> Self {
        let regular = logical_path
            .split('/')
            .fold(root.join(application), |dir, segment| dir.join(segment));
        Self {
            pending: regular.join(PENDING_DIR),
            deleted: regular.join(DELETED_DIR),
            regular,
        }
    }

    /// Create all three directories.
    pub fn ensure(&self) -> StoreResult<()> {
        fsops::ensure_dir(&self.regular)?;
        fsops::ensure_dir(&self.pending)?;
        fsops::ensure_dir(&self.deleted)
    }

    /// Reserve a fresh, empty pending file. Never reuses an existing name.
    pub fn new_pending_file(&self, extension: &str) -> StoreResult<PendingFile> {
        loop {
            let path = self.pending.join(naming::pending_name(extension));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(PendingFile::new(path)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(StoreError::io(format!(
                        "create pending file {}: {}",
                        path.display(),
                        e
                    )));
                }
            }
        }
    }
}

/// A pending working file that is deleted when dropped unless kept.
#[derive(Debug)]
pub struct PendingFile {
    path: PathBuf,
    keep: bool,
}

impl PendingFile {
    fn new(path: PathBuf) -> Self {
        Self { path, keep: false }
    }

    /// Path of the working file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Hand the file over to the caller; it is no longer deleted on drop.
    pub fn keep(mut self) -> PathBuf {
        self.keep = true;
        std::mem::take(&mut self.path)
    }
}

impl Drop for PendingFile {
    fn drop(&mut self) {
        if !self.keep {
            fsops::remove_logged(&self.path);
        }
    }
}
