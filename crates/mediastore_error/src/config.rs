//! Configuration error types.

/// Ways a configuration can be unusable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ConfigErrorKind {
    /// A layer could not be read or did not deserialize
    #[display("Failed to load configuration: {}", _0)]
    Load(String),
    /// A setting parsed but holds a value no store can run with
    #[display("Invalid setting {}: {}", setting, reason)]
    InvalidSetting {
        /// Setting name as written in the TOML
        setting: String,
        /// Why the value was rejected
        reason: String,
    },
    /// The `[keys]` table names a key number or passphrase that cannot be used
    #[display("Invalid key table: {}", _0)]
    KeyTable(String),
}

/// Configuration error with source location.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Configuration Error: {} at line {} in {}", kind, line, file)]
pub struct ConfigError {
    /// The kind of error that occurred
    pub kind: ConfigErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl ConfigError {
    /// Create a new ConfigError of the given kind at the current location.
    #[track_caller]
    pub fn new(kind: ConfigErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// A configuration layer failed to load.
    #[track_caller]
    pub fn load(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::Load(message.into()))
    }

    /// A setting holds an unusable value.
    ///
    /// # Examples
    ///
    /// ```
    /// use mediastore_error::{ConfigError, ConfigErrorKind};
    ///
    /// let err = ConfigError::invalid("MaximumMediaSize", "must be positive");
    /// assert!(matches!(err.kind(), ConfigErrorKind::InvalidSetting { .. }));
    /// assert!(format!("{}", err).contains("MaximumMediaSize"));
    /// ```
    #[track_caller]
    pub fn invalid(setting: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::InvalidSetting {
            setting: setting.into(),
            reason: reason.into(),
        })
    }

    /// The key table is unusable.
    #[track_caller]
    pub fn key_table(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::KeyTable(message.into()))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ConfigErrorKind {
        &self.kind
    }
}
