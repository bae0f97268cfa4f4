//! Store error types.

/// Kinds of store errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum StoreErrorKind {
    /// Input rejected before any disk mutation (extension, size, slot attributes)
    #[display("Validation failed: {}", _0)]
    Validation(String),
    /// Decrypted content does not hash to the value embedded in its file name
    #[display("Integrity mismatch: expected hash {}, got {}", expected, actual)]
    IntegrityMismatch {
        /// Hash recorded in the stored file name
        expected: String,
        /// Hash of the decrypted bytes
        actual: String,
    },
    /// A file in a store directory does not follow the naming grammar
    #[display("Malformed media file name: {}", _0)]
    MalformedName(String),
    /// File system operation failed after exhausting retries
    #[display("I/O failure: {}", _0)]
    Io(String),
    /// Encoding key number has no registered key material
    #[display("Encoding key {} is not registered", _0)]
    MissingKey(u8),
    /// No current file exists for the identity
    #[display("Media not found: {}", _0)]
    NotFound(String),
}

/// Store error with location tracking.
///
/// # Examples
///
/// ```
/// use mediastore_error::{StoreError, StoreErrorKind};
///
/// let err = StoreError::new(StoreErrorKind::MissingKey(3));
/// assert!(format!("{}", err).contains("not registered"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Store Error: {} at line {} in {}", kind, line, file)]
pub struct StoreError {
    /// The kind of error that occurred
    pub kind: StoreErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl StoreError {
    /// Create a new store error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StoreErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Shorthand for a validation error.
    #[track_caller]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Validation(message.into()))
    }

    /// Shorthand for an I/O error.
    #[track_caller]
    pub fn io(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Io(message.into()))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &StoreErrorKind {
        &self.kind
    }

    /// Whether this is the expected "nothing stored" outcome of a read.
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, StoreErrorKind::NotFound(_))
    }

    /// Whether the input was rejected before touching the disk.
    pub fn is_validation(&self) -> bool {
        matches!(self.kind, StoreErrorKind::Validation(_))
    }

    /// Whether stored content failed verification or naming checks.
    pub fn is_integrity(&self) -> bool {
        matches!(
            self.kind,
            StoreErrorKind::IntegrityMismatch { .. } | StoreErrorKind::MalformedName(_)
        )
    }
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
