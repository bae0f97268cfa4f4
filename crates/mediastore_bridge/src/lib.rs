//! Remote access to a media store.
//!
//! When client and server run as separate processes, the transport layer
//! forwards four operations to the side that owns the files: upload, exact
//! match check, info and read. This crate defines that contract as an async
//! trait and provides [`LocalMediaBridge`], which serves it from a local
//! [`MediaStore`](mediastore_storage::MediaStore). Serializing requests and
//! moving bytes across the wire is left to the transport.
//!
//! # Example
//!
//! ```rust
//! use mediastore_bridge::{LocalMediaBridge, RemoteMediaBridge, SlotRef};
//! use mediastore_storage::{
//!     KeyRegistry, MediaSlotSpec, MediaStore, Role, SlotAttributes, SlotRegistry, StoreSettings,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> mediastore_storage::StoreResult<()> {
//! # let dir = tempfile::TempDir::new().unwrap();
//! let mut slots = SlotRegistry::new();
//! slots.insert(MediaSlotSpec::from_attributes(
//!     "rooms",
//!     "Photo",
//!     &SlotAttributes {
//!         media_type: Some("Image".into()),
//!         file_types: Some("jpg".into()),
//!         storage_location: Some("Server".into()),
//!         logical_path: Some("rooms/photos".into()),
//!         ..Default::default()
//!     },
//! )?)?;
//! let store = MediaStore::new(
//!     StoreSettings::new(dir.path(), "hotel", Role::Server),
//!     Arc::new(KeyRegistry::new()),
//! );
//! let bridge = LocalMediaBridge::new(Arc::new(store), Arc::new(slots));
//!
//! let slot = SlotRef::new("rooms", "Photo");
//! assert!(bridge.info(&slot, "42").await?.is_none());
//! # Ok(())
//! # }
//! # tokio::runtime::Runtime::new().unwrap().block_on(example()).unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod local;

pub use local::LocalMediaBridge;

use mediastore_storage::{PublishStatus, StoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Names a slot by descriptor group and name, as a remote caller does.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[display("{}/{}", group, name)]
pub struct SlotRef {
    /// Descriptor group
    pub group: String,
    /// Slot name within the group
    pub name: String,
}

impl SlotRef {
    /// Reference a slot.
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
        }
    }
}

/// What a remote caller learns about the current version of an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteMediaInfo {
    /// Lower-case extension of the current file
    pub extension: String,
    /// Whether the file is still visible on disk
    pub exists: bool,
}

/// Media operations exposed across the transport boundary.
#[async_trait::async_trait]
pub trait RemoteMediaBridge: Send + Sync {
    /// Publish a file the transport has landed locally.
    ///
    /// The source file is left in place; the caller disposes of it.
    async fn upload(
        &self,
        slot: &SlotRef,
        source: &Path,
        identifier: &str,
    ) -> StoreResult<PublishStatus>;

    /// Whether the current version has exactly this extension and hash.
    async fn check_exists(
        &self,
        slot: &SlotRef,
        extension: &str,
        identifier: &str,
        hash: &str,
    ) -> StoreResult<bool>;

    /// Extension and visibility of the current version, `None` if nothing is stored.
    async fn info(&self, slot: &SlotRef, identifier: &str) -> StoreResult<Option<RemoteMediaInfo>>;

    /// Plaintext copy of the current version in the slot's pending directory.
    ///
    /// The caller owns the returned file and must delete it. `None` if
    /// nothing is stored.
    async fn read(&self, slot: &SlotRef, identifier: &str) -> StoreResult<Option<PathBuf>>;
}
