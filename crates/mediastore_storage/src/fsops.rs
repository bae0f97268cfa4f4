//! Retried file system primitives.
//!
//! Large files on network volumes are not always visible immediately after
//! they are written, so existence checks, copies, moves and deletes are tried
//! a fixed number of times before a failure is surfaced. The retries do not
//! sleep and are not meant to resolve write races between processes.

use mediastore_error::{StoreError, StoreErrorKind, StoreResult};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Attempts made by every retried primitive.
pub const RETRY_ATTEMPTS: usize = 5;

fn retry<T>(
    operation: &str,
    path: &Path,
    mut attempt: impl FnMut() -> io::Result<T>,
) -> StoreResult<T> {
    let mut last_error = None;
    for round in 1..=RETRY_ATTEMPTS {
        match attempt() {
            Ok(value) => return Ok(value),
            Err(e) => {
                tracing::debug!(operation, path = %path.display(), round, error = %e, "Retrying file operation");
                last_error = Some(e);
            }
        }
    }
    let error = last_error.unwrap_or_else(|| io::Error::other("no attempt made"));
    if error.kind() == io::ErrorKind::NotFound {
        return Err(StoreError::new(StoreErrorKind::NotFound(format!(
            "{} {}: {}",
            operation,
            path.display(),
            error
        ))));
    }
    Err(StoreError::io(format!(
        "{} {} failed after {} attempts: {}",
        operation,
        path.display(),
        RETRY_ATTEMPTS,
        error
    )))
}

/// Whether `path` exists, asking up to [`RETRY_ATTEMPTS`] times before
/// answering no.
pub fn exists(path: &Path) -> bool {
    (0..RETRY_ATTEMPTS).any(|_| path.exists())
}

/// Copy `from` to `to`, then confirm the copy is visible.
pub fn copy(from: &Path, to: &Path) -> StoreResult<u64> {
    let bytes = retry("copy", from, || fs::copy(from, to))?;
    if !exists(to) {
        return Err(StoreError::io(format!(
            "copy of {} to {} is not visible",
            from.display(),
            to.display()
        )));
    }
    Ok(bytes)
}

/// Move `from` to `to`, falling back to copy + delete across volumes.
pub fn move_file(from: &Path, to: &Path) -> StoreResult<()> {
    retry("move", from, || match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(e),
        Err(_) => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    })
}

/// Delete a file. A file that is already gone counts as deleted.
pub fn remove(path: &Path) -> StoreResult<()> {
    retry("delete", path, || match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    })
}

/// Delete a file as best-effort cleanup, logging instead of failing.
pub fn remove_logged(path: &Path) {
    if let Err(e) = remove(path) {
        tracing::warn!(path = %path.display(), error = %e, "Failed to delete working file");
    }
}

/// Set the last-modified time of `path` to now.
pub fn touch(path: &Path) -> StoreResult<()> {
    retry("touch", path, || {
        fs::OpenOptions::new()
            .write(true)
            .open(path)?
            .set_modified(SystemTime::now())
    })
}

/// Last-modified time of `path`.
pub fn modified(path: &Path) -> StoreResult<SystemTime> {
    retry("stat", path, || fs::metadata(path)?.modified())
}

/// Outcome of [`link_if_absent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// `to` now names the same content as `from`
    Linked,
    /// `to` already existed and was left untouched
    AlreadyExists,
    /// The file system refused the link; use copy instead
    Unsupported,
}

/// Atomically create `to` as a hard link to `from` unless `to` exists.
pub fn link_if_absent(from: &Path, to: &Path) -> LinkOutcome {
    match fs::hard_link(from, to) {
        Ok(()) => LinkOutcome::Linked,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => LinkOutcome::AlreadyExists,
        Err(e) => {
            tracing::debug!(from = %from.display(), to = %to.display(), error = %e, "Hard link refused");
            LinkOutcome::Unsupported
        }
    }
}

/// Regular files directly inside `dir`. A missing directory is empty.
pub fn list_files(dir: &Path) -> StoreResult<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(StoreError::io(format!(
                "list {}: {}",
                dir.display(),
                e
            )));
        }
    };
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::io(format!("list {}: {}", dir.display(), e)))?;
        match entry.file_type() {
            Ok(kind) if kind.is_file() => files.push(entry.path()),
            Ok(_) => {}
            // Vanished between listing and stat
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(StoreError::io(format!(
                    "stat {}: {}",
                    entry.path().display(),
                    e
                )));
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Create `dir` and its parents.
pub fn ensure_dir(dir: &Path) -> StoreResult<()> {
    retry("create directory", dir, || fs::create_dir_all(dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn remove_tolerates_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(remove(&dir.path().join("gone.bin")).is_ok());
    }

    #[test]
    fn copy_of_missing_source_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = copy(&dir.path().join("missing"), &dir.path().join("copy")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn link_if_absent_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("first");
        let second = dir.path().join("second");
        let target = dir.path().join("target");
        fs::write(&first, b"one").unwrap();
        fs::write(&second, b"two").unwrap();

        let outcome = link_if_absent(&first, &target);
        if outcome == LinkOutcome::Unsupported {
            return;
        }
        assert_eq!(outcome, LinkOutcome::Linked);
        assert_eq!(link_if_absent(&second, &target), LinkOutcome::AlreadyExists);
        assert_eq!(fs::read(&target).unwrap(), b"one");
    }

    #[test]
    fn touch_advances_modified_time() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("file");
        fs::write(&path, b"x").unwrap();
        let old = SystemTime::now() - Duration::from_secs(3 * 86_400);
        fs::OpenOptions::new()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(old)
            .unwrap();

        touch(&path).unwrap();
        assert!(modified(&path).unwrap() > old + Duration::from_secs(86_400));
    }

    #[test]
    fn list_files_skips_directories() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("pending")).unwrap();
        fs::write(dir.path().join("b"), b"").unwrap();
        fs::write(dir.path().join("a"), b"").unwrap();
        let files = list_files(dir.path()).unwrap();
        assert_eq!(files, vec![dir.path().join("a"), dir.path().join("b")]);
        assert!(list_files(&dir.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn move_file_relocates_content() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("from");
        let to = dir.path().join("to");
        fs::write(&from, b"payload").unwrap();
        move_file(&from, &to).unwrap();
        assert!(!from.exists());
        assert_eq!(fs::read(&to).unwrap(), b"payload");
    }
}
