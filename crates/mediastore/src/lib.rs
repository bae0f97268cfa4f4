//! Mediastore - identity-addressed media assets
//!
//! Attaches media files (photos, videos, recordings, signed documents) to
//! application records through statically declared slots, with optional
//! encryption at rest and age-based garbage collection.
//!
//! # Architecture
//!
//! - `mediastore_error` - Error types
//! - `mediastore_storage` - Naming scheme, slots, keys, the store, sweeps and asset handles
//! - `mediastore_config` - Layered TOML configuration
//! - `mediastore_bridge` - Async remote upload/check/info/read contract
//!
//! This crate (`mediastore`) re-exports everything for convenience and ships
//! the `mediastore` maintenance binary.
//!
//! # Quick Start
//!
//! ```no_run
//! use mediastore::MediaStoreConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MediaStoreConfig::load()?;
//! let store = config.open_store()?;
//! let slots = config.slot_registry()?;
//!
//! let photo = slots.require("rooms", "Photo")?;
//! store.publish(&photo, std::path::Path::new("lobby.jpg"), "42")?;
//!
//! let asset = store.bind(&photo, "42")?;
//! let bytes = asset.read_as_bytes()?;
//! # Ok(())
//! # }
//! ```

pub use mediastore_bridge::*;
pub use mediastore_config::*;
pub use mediastore_error::*;
pub use mediastore_storage::*;
