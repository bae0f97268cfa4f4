//! Identity-addressed media storage.
//!
//! Media files (photos, videos, recordings, signed documents) are attached
//! to application records through statically declared slots. Each slot keeps
//! its files in one directory, named so that the file name alone carries the
//! slot alias, the record identifier, the encoding key and the content hash.
//!
//! # Features
//!
//! - **Versioned by name**: publishing new content for an identity adds a
//!   file; the newest file wins on resolve
//! - **Deduplication**: republishing identical content only refreshes the
//!   existing file's modification time
//! - **Encryption at rest**: per slot and per role, with the key number
//!   recorded in the name and the plaintext hash verified on read
//! - **Garbage collection**: age-based sweeps of working copies, superseded
//!   versions and retired files
//!
//! # Example
//!
//! ```rust
//! use mediastore_storage::{
//!     KeyRegistry, MediaSlotSpec, MediaStore, Role, SlotAttributes, StoreSettings,
//! };
//! use std::sync::Arc;
//!
//! # fn example() -> mediastore_storage::StoreResult<()> {
//! # let dir = tempfile::TempDir::new().unwrap();
//! let attributes = SlotAttributes {
//!     media_type: Some("Image".into()),
//!     file_types: Some("jpg,png".into()),
//!     storage_location: Some("Server".into()),
//!     logical_path: Some("rooms/photos".into()),
//!     ..Default::default()
//! };
//! let slot = MediaSlotSpec::from_attributes("rooms", "Photo", &attributes)?;
//!
//! let settings = StoreSettings::new(dir.path(), "hotel", Role::Server);
//! let store = MediaStore::new(settings, Arc::new(KeyRegistry::new()));
//!
//! store.publish_bytes(&slot, b"jpeg bytes", "jpg", "42")?;
//!
//! let asset = store.bind(&slot, "42")?;
//! assert_eq!(asset.read_as_bytes()?, Some(b"jpeg bytes".to_vec()));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod asset;
pub mod cipher;
pub mod fsops;
mod gc;
mod keys;
mod layout;
mod media_kind;
pub mod naming;
mod slot;
mod store;

pub use asset::MediaAsset;
pub use gc::{CleanReport, Retention, clamp_days};
pub use keys::{EncodingKey, KeyMaterial, KeyRegistry, MAX_KEY_NUMBER, Role};
pub use layout::{DELETED_DIR, PENDING_DIR, PendingFile, SlotLayout};
pub use media_kind::MediaKind;
pub use slot::{
    MediaSlotSpec, SlotAttributes, SlotRegistry, StorageLocation, validate_logical_path,
};
pub use store::{
    DEFAULT_MAXIMUM_MEDIA_SIZE_KIB, MediaInfo, MediaStore, PublishStatus, Published,
    StoreSettings, WorkingCopy,
};

pub use mediastore_error::{StoreError, StoreErrorKind, StoreResult};
