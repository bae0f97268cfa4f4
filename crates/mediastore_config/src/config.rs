//! Configuration structures for the media store.
//!
//! This module provides TOML-based configuration. The configuration system
//! supports:
//! - Bundled defaults (include_str! from mediastore.toml)
//! - User overrides (~/.config/mediastore/mediastore.toml, then ./mediastore.toml)
//! - Environment overrides (`MEDIASTORE_ROOT`, `MEDIASTORE_KEYS__ACTIVE_SERVER`, ...)
//!
//! Later sources take precedence over earlier ones.

use crate::source::CanonicalKeys;
use config::{Config, ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};
use mediastore_error::{ConfigError, MediaStoreError, MediaStoreResult};
use mediastore_storage::{
    DEFAULT_MAXIMUM_MEDIA_SIZE_KIB, KeyMaterial, KeyRegistry, MAX_KEY_NUMBER, MediaSlotSpec,
    MediaStore, Retention, Role, SlotAttributes, SlotRegistry, StoreSettings,
    validate_logical_path,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Bundled default configuration.
const DEFAULT_CONFIG: &str = include_str!("../../../mediastore.toml");

/// Encoding key configuration.
///
/// # Example
///
/// ```toml
/// [keys]
/// active_server = 2
/// active_client = 0
///
/// [keys.passphrases]
/// 1 = "retired but still readable"
/// 2 = "current server key"
/// ```
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Eq,
    Deserialize,
    Serialize,
    derive_getters::Getters,
    derive_setters::Setters,
)]
#[setters(prefix = "with_")]
pub struct KeysConfig {
    /// Key number the server encrypts new content with, 0 = none
    #[serde(default)]
    active_server: u8,
    /// Key number the client encrypts new content with, 0 = none
    #[serde(default)]
    active_client: u8,
    /// Passphrase per key number
    #[serde(default)]
    passphrases: BTreeMap<String, String>,
}

/// Top-level media store configuration.
///
/// # Example
///
/// ```no_run
/// use mediastore_config::MediaStoreConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = MediaStoreConfig::load()?;
/// let slots = config.slot_registry()?;
/// let store = config.open_store()?;
/// let report = store.clean_all_slots(&slots, &config.retention());
/// println!("moved {} files", report.moved);
/// # Ok(())
/// # }
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Deserialize,
    Serialize,
    derive_getters::Getters,
    derive_setters::Setters,
)]
#[setters(prefix = "with_")]
pub struct MediaStoreConfig {
    /// Directory shared by all applications
    root: PathBuf,
    /// Application directory below the root
    application: String,
    /// Side this process plays
    #[serde(default)]
    role: Role,
    /// Days pending working copies are kept
    #[serde(
        rename = "CleanPendingDaysToKeep",
        default = "default_pending_days"
    )]
    clean_pending_days_to_keep: i64,
    /// Days retired files are kept before purge
    #[serde(
        rename = "CleanDeletedDaysToKeep",
        default = "default_deleted_days"
    )]
    clean_deleted_days_to_keep: i64,
    /// Days superseded versions stay in the regular directory
    #[serde(
        rename = "CleanObsoleteDaysToKeep",
        default = "default_obsolete_days"
    )]
    clean_obsolete_days_to_keep: i64,
    /// Global size cap in KiB
    #[serde(
        rename = "MaximumMediaSize",
        default = "default_maximum_media_size"
    )]
    maximum_media_size: u64,
    /// Encoding keys
    #[serde(default)]
    keys: KeysConfig,
    /// Slot descriptors by group, then name
    #[serde(default)]
    slots: BTreeMap<String, BTreeMap<String, SlotAttributes>>,
}

fn default_pending_days() -> i64 {
    *Retention::default().pending_days()
}

fn default_deleted_days() -> i64 {
    *Retention::default().deleted_days()
}

fn default_obsolete_days() -> i64 {
    *Retention::default().obsolete_days()
}

fn default_maximum_media_size() -> u64 {
    DEFAULT_MAXIMUM_MEDIA_SIZE_KIB
}

impl Default for MediaStoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("media"),
            application: "default".to_string(),
            role: Role::default(),
            clean_pending_days_to_keep: default_pending_days(),
            clean_deleted_days_to_keep: default_deleted_days(),
            clean_obsolete_days_to_keep: default_obsolete_days(),
            maximum_media_size: default_maximum_media_size(),
            keys: KeysConfig::default(),
            slots: BTreeMap::new(),
        }
    }
}

impl MediaStoreConfig {
    fn build(builder: ConfigBuilder<DefaultState>) -> MediaStoreResult<Self> {
        let config: Self = builder
            .build()
            .map_err(|e| {
                MediaStoreError::from(ConfigError::load(format!("cannot read a layer: {}", e)))
            })?
            .try_deserialize()
            .map_err(|e| {
                MediaStoreError::from(ConfigError::load(format!("cannot deserialize: {}", e)))
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    ///
    /// Settings the file omits take their built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> MediaStoreResult<Self> {
        debug!("Loading configuration from file");
        Self::build(Config::builder().add_source(CanonicalKeys(File::from(path.as_ref()))))
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(toml: &str) -> MediaStoreResult<Self> {
        Self::build(
            Config::builder().add_source(CanonicalKeys(File::from_str(toml, FileFormat::Toml))),
        )
    }

    /// Load configuration with precedence: environment > current dir > home dir > bundled defaults.
    ///
    /// User config files are optional and silently skipped if not found.
    /// Keys may be spelled in any case; `MEDIASTORE_CLEANPENDINGDAYSTOKEEP`
    /// overrides `CleanPendingDaysToKeep`.
    #[instrument]
    pub fn load() -> MediaStoreResult<Self> {
        Self::layered(
            Environment::with_prefix("MEDIASTORE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
    }

    fn layered(environment: Environment) -> MediaStoreResult<Self> {
        debug!("Loading configuration with precedence: environment > current dir > home dir > bundled defaults");

        let mut builder = Config::builder()
            .add_source(CanonicalKeys(File::from_str(DEFAULT_CONFIG, FileFormat::Toml)));

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/mediastore/mediastore.toml");
            builder = builder.add_source(CanonicalKeys(File::from(home_config).required(false)));
        }

        builder = builder
            .add_source(CanonicalKeys(File::with_name("mediastore").required(false)))
            .add_source(CanonicalKeys(environment));

        Self::build(builder)
    }

    /// Reject settings that would make every store operation fail.
    pub fn validate(&self) -> MediaStoreResult<()> {
        if self.root.as_os_str().is_empty() {
            return Err(ConfigError::invalid("root", "must not be empty").into());
        }
        if self.application.contains('/') {
            return Err(ConfigError::invalid(
                "application",
                format!("'{}' must be a single directory name", self.application),
            )
            .into());
        }
        validate_logical_path(&self.application).map_err(|e| {
            MediaStoreError::from(ConfigError::invalid("application", e.kind().to_string()))
        })?;
        if self.maximum_media_size == 0 {
            return Err(ConfigError::invalid("MaximumMediaSize", "must be positive").into());
        }
        Ok(())
    }

    /// Store settings for this process.
    pub fn store_settings(&self) -> StoreSettings {
        StoreSettings::new(&self.root, &self.application, self.role)
            .with_maximum_media_size_kib(self.maximum_media_size)
    }

    /// Retention windows for the sweeps.
    pub fn retention(&self) -> Retention {
        Retention::new(
            self.clean_pending_days_to_keep,
            self.clean_deleted_days_to_keep,
            self.clean_obsolete_days_to_keep,
        )
    }

    /// Key registry holding every configured passphrase.
    ///
    /// # Errors
    ///
    /// Fails on a key number outside `1..=99`, an empty passphrase, or an
    /// active key number without a passphrase.
    #[instrument(skip(self))]
    pub fn key_registry(&self) -> MediaStoreResult<KeyRegistry> {
        let mut registry = KeyRegistry::new();
        for (number, passphrase) in &self.keys.passphrases {
            let parsed: u8 = number.trim().parse().map_err(|_| {
                ConfigError::key_table(format!(
                    "key number '{}' is not between 1 and {}",
                    number, MAX_KEY_NUMBER
                ))
            })?;
            if passphrase.is_empty() {
                return Err(
                    ConfigError::key_table(format!("key {} has an empty passphrase", parsed)).into(),
                );
            }
            registry.register(parsed, KeyMaterial::from_passphrase(passphrase))?;
        }
        registry.set_active(Role::Server, self.keys.active_server)?;
        registry.set_active(Role::Client, self.keys.active_client)?;
        debug!(
            keys = self.keys.passphrases.len(),
            active_server = self.keys.active_server,
            active_client = self.keys.active_client,
            "Built key registry"
        );
        Ok(registry)
    }

    /// Validate every `[slots.<group>.<name>]` table into a registry.
    #[instrument(skip(self))]
    pub fn slot_registry(&self) -> MediaStoreResult<SlotRegistry> {
        let mut registry = SlotRegistry::new();
        for (group, slots) in &self.slots {
            for (name, attributes) in slots {
                let spec = MediaSlotSpec::from_attributes(group, name, attributes)?;
                if let Some(slot_max) = spec.max_size_kib() {
                    if slot_max > self.maximum_media_size {
                        warn!(
                            group = %group,
                            name = %name,
                            slot_max,
                            global_max = self.maximum_media_size,
                            "Slot size cap exceeds the global cap, the global cap applies"
                        );
                    }
                }
                registry.insert(spec)?;
            }
        }
        debug!(slots = registry.len(), "Built slot registry");
        Ok(registry)
    }

    /// Open a store with the configured settings and keys.
    pub fn open_store(&self) -> MediaStoreResult<MediaStore> {
        Ok(MediaStore::new(
            self.store_settings(),
            Arc::new(self.key_registry()?),
        ))
    }
}
