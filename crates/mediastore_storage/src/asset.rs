//! Short-lived handle implementing the bind → read → release workflow.

use crate::{MediaSlotSpec, MediaStore, fsops};
use mediastore_error::{StoreError, StoreResult};
use std::path::{Path, PathBuf};

/// Handle over one (slot, identifier) pair.
///
/// Unbound handles have no paths. A bound handle owns a plaintext working
/// copy in the slot's pending directory, deleted again by [`release`],
/// by binding anew, or when the handle is dropped.
///
/// Transitions take `&mut self`; a handle is not meant to be shared between
/// threads.
///
/// [`release`]: MediaAsset::release
#[derive(Debug)]
pub struct MediaAsset<'a> {
    store: &'a MediaStore,
    slot: &'a MediaSlotSpec,
    identifier: String,
    original_path: Option<PathBuf>,
    working_path: Option<PathBuf>,
}

impl<'a> MediaAsset<'a> {
    /// Unbound handle.
    pub fn new(store: &'a MediaStore, slot: &'a MediaSlotSpec, identifier: &str) -> Self {
        Self {
            store,
            slot,
            identifier: identifier.to_string(),
            original_path: None,
            working_path: None,
        }
    }

    /// Slot this handle addresses.
    pub fn slot(&self) -> &MediaSlotSpec {
        self.slot
    }

    /// Data identifier as supplied by the caller.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Whether a working copy is held.
    pub fn is_bound(&self) -> bool {
        self.working_path.is_some()
    }

    /// Regular file the working copy was made from.
    pub fn original_path(&self) -> Option<&Path> {
        self.original_path.as_deref()
    }

    /// Plaintext working copy.
    pub fn working_path(&self) -> Option<&Path> {
        self.working_path.as_deref()
    }

    /// Resolve the current version and create a plaintext working copy.
    ///
    /// A bound handle is released first. Fails with `NotFound` when nothing
    /// is stored, `MissingKey` when the content's key is not registered and
    /// `IntegrityMismatch` when decryption does not reproduce the recorded
    /// hash. The handle is unbound after any failure.
    #[tracing::instrument(skip(self), fields(slot = %self.slot.alias(), identifier = %self.identifier))]
    pub fn bind(&mut self) -> StoreResult<()> {
        if self.is_bound() {
            self.release()?;
        }
        let copy = self.store.open_working_copy(self.slot, &self.identifier)?;
        tracing::debug!(
            original = %copy.original.display(),
            working = %copy.working.display(),
            "Bound media asset"
        );
        self.original_path = Some(copy.original);
        self.working_path = Some(copy.working);
        Ok(())
    }

    /// Working copy contents, `None` when unbound.
    pub fn read_as_bytes(&self) -> StoreResult<Option<Vec<u8>>> {
        let Some(path) = &self.working_path else {
            return Ok(None);
        };
        std::fs::read(path)
            .map(Some)
            .map_err(|e| StoreError::io(format!("read {}: {}", path.display(), e)))
    }

    /// Working copy contents as UTF-8 text, `None` when unbound.
    pub fn read_as_string(&self) -> StoreResult<Option<String>> {
        let Some(path) = &self.working_path else {
            return Ok(None);
        };
        std::fs::read_to_string(path)
            .map(Some)
            .map_err(|e| StoreError::io(format!("read {}: {}", path.display(), e)))
    }

    /// Delete the working copy and clear both paths. Idempotent.
    pub fn release(&mut self) -> StoreResult<()> {
        self.original_path = None;
        if let Some(path) = self.working_path.take() {
            fsops::remove(&path)?;
            tracing::debug!(working = %path.display(), "Released media asset");
        }
        Ok(())
    }
}

impl Drop for MediaAsset<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::warn!(identifier = %self.identifier, error = %e, "Failed to release media asset");
        }
    }
}
