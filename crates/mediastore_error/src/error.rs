//! Top-level error wrapper types.

use crate::{ConfigError, StoreError};

/// Every error the media store can surface.
///
/// # Examples
///
/// ```
/// use mediastore_error::{ConfigError, MediaStoreError};
///
/// let err: MediaStoreError = ConfigError::invalid("root", "must not be empty").into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum MediaStoreErrorKind {
    /// Storage engine error
    #[from(StoreError)]
    Store(StoreError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
}

/// Media store error with kind discrimination.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("MediaStore Error: {}", _0)]
pub struct MediaStoreError(Box<MediaStoreErrorKind>);

impl MediaStoreError {
    /// Create a new error from a kind.
    pub fn new(kind: MediaStoreErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &MediaStoreErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to MediaStoreErrorKind
impl<T> From<T> for MediaStoreError
where
    T: Into<MediaStoreErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for configuration-level and binary operations.
pub type MediaStoreResult<T> = std::result::Result<T, MediaStoreError>;
