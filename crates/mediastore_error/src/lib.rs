//! Error types for the media store.
//!
//! This crate provides the error types shared by every mediastore crate.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All constructors use `#[track_caller]` for automatic location capture
//!
//! Store operations return [`StoreResult`] directly so callers can branch on
//! [`StoreErrorKind`]. Configuration loading and the binary use the
//! top-level [`MediaStoreError`].
//!
//! # Examples
//!
//! ```
//! use mediastore_error::{StoreError, StoreErrorKind, StoreResult};
//!
//! fn lookup() -> StoreResult<()> {
//!     Err(StoreError::new(StoreErrorKind::NotFound("photo/00000000000042".into())))
//! }
//!
//! let err = lookup().unwrap_err();
//! assert!(err.is_not_found());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod store;

pub use config::{ConfigError, ConfigErrorKind};
pub use error::{MediaStoreError, MediaStoreErrorKind, MediaStoreResult};
pub use store::{StoreError, StoreErrorKind, StoreResult};
