//! Bridge served from a store in this process.

use crate::{RemoteMediaBridge, RemoteMediaInfo, SlotRef};
use mediastore_storage::{
    MediaSlotSpec, MediaStore, PublishStatus, SlotRegistry, StoreError, StoreResult,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Serves [`RemoteMediaBridge`] calls from a local [`MediaStore`].
///
/// Store operations block on file I/O, so each call runs on Tokio's blocking
/// pool.
#[derive(Debug, Clone)]
pub struct LocalMediaBridge {
    store: Arc<MediaStore>,
    slots: Arc<SlotRegistry>,
}

impl LocalMediaBridge {
    /// Create a bridge over a store and the slots it may be asked about.
    pub fn new(store: Arc<MediaStore>, slots: Arc<SlotRegistry>) -> Self {
        Self { store, slots }
    }

    /// Underlying store.
    pub fn store(&self) -> &MediaStore {
        &self.store
    }

    async fn run<T, F>(&self, slot: &SlotRef, operation: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&MediaStore, &MediaSlotSpec) -> StoreResult<T> + Send + 'static,
    {
        let spec = self.slots.require(&slot.group, &slot.name)?;
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || operation(store.as_ref(), spec.as_ref()))
            .await
            .map_err(|e| StoreError::io(format!("media task for {} failed: {}", slot, e)))?
    }
}

#[async_trait::async_trait]
impl RemoteMediaBridge for LocalMediaBridge {
    #[tracing::instrument(skip(self, slot, source), fields(slot = %slot, source = %source.display()))]
    async fn upload(
        &self,
        slot: &SlotRef,
        source: &Path,
        identifier: &str,
    ) -> StoreResult<PublishStatus> {
        let source = source.to_path_buf();
        let identifier = identifier.to_string();
        let status = self
            .run(slot, move |store, spec| {
                store
                    .publish(spec, &source, &identifier)
                    .map(|published| published.status)
            })
            .await?;
        tracing::info!(%status, "Remote upload handled");
        Ok(status)
    }

    #[tracing::instrument(skip(self, slot), fields(slot = %slot))]
    async fn check_exists(
        &self,
        slot: &SlotRef,
        extension: &str,
        identifier: &str,
        hash: &str,
    ) -> StoreResult<bool> {
        let extension = extension.to_string();
        let identifier = identifier.to_string();
        let hash = hash.to_string();
        self.run(slot, move |store, spec| {
            store.check_exists(spec, &extension, &identifier, &hash)
        })
        .await
    }

    #[tracing::instrument(skip(self, slot), fields(slot = %slot))]
    async fn info(&self, slot: &SlotRef, identifier: &str) -> StoreResult<Option<RemoteMediaInfo>> {
        let identifier = identifier.to_string();
        self.run(slot, move |store, spec| {
            Ok(store
                .info(spec, &identifier)?
                .map(|info| RemoteMediaInfo {
                    extension: info.extension,
                    exists: info.exists,
                }))
        })
        .await
    }

    #[tracing::instrument(skip(self, slot), fields(slot = %slot))]
    async fn read(&self, slot: &SlotRef, identifier: &str) -> StoreResult<Option<PathBuf>> {
        let identifier = identifier.to_string();
        let path = self
            .run(slot, move |store, spec| store.read_to_pending(spec, &identifier))
            .await?;
        tracing::debug!(path = ?path, "Remote read handled");
        Ok(path)
    }
}
