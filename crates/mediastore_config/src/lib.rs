//! Layered configuration for the media store.
//!
//! Settings, encoding keys and slot descriptors are read from TOML with the
//! `config` crate and turned into the values the storage engine is built
//! from: [`StoreSettings`](mediastore_storage::StoreSettings), a
//! [`KeyRegistry`](mediastore_storage::KeyRegistry), a
//! [`SlotRegistry`](mediastore_storage::SlotRegistry) and sweep
//! [`Retention`](mediastore_storage::Retention).

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod source;

pub use config::{KeysConfig, MediaStoreConfig};
