//! Media slot specifications and the registry they are looked up in.
//!
//! A slot is a statically declared media type ("room photo", "signed
//! contract") with its own validation rules and storage location. Slots are
//! read once from resource descriptors at startup and never change.

use crate::naming::sanitize;
use crate::{DELETED_DIR, MediaKind, PENDING_DIR, Role};
use mediastore_error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Which side of the application keeps a slot's files.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::EnumIter,
    strum::EnumString,
    derive_more::Display,
)]
#[strum(ascii_case_insensitive)]
pub enum StorageLocation {
    /// Files live on the server only
    #[display("server")]
    Server,
    /// Files live on the client only
    #[display("client")]
    Client,
    /// Files are kept on both sides
    #[display("synchronize")]
    Synchronize,
}

impl StorageLocation {
    /// Whether a store running as `role` keeps files for this location.
    pub fn is_stored_by(&self, role: Role) -> bool {
        match self {
            StorageLocation::Server => role == Role::Server,
            StorageLocation::Client => role == Role::Client,
            StorageLocation::Synchronize => true,
        }
    }
}

/// Raw per-slot attributes as declared in a resource descriptor.
///
/// Every field is optional here; [`MediaSlotSpec::from_attributes`] decides
/// which are mandatory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SlotAttributes {
    /// Short name used as the first file name field
    #[serde(rename = "Alias", alias = "alias", default)]
    pub alias: Option<String>,
    /// `Image`, `Video`, `Audio` or `Document`
    #[serde(rename = "MediaType", alias = "mediatype", default)]
    pub media_type: Option<String>,
    /// Comma-separated extension list
    #[serde(rename = "FileTypes", alias = "filetypes", default)]
    pub file_types: Option<String>,
    /// `Server`, `Client` or `Synchronize`
    #[serde(rename = "StorageLocation", alias = "storagelocation", default)]
    pub storage_location: Option<String>,
    /// Slash-separated directory below the application root
    #[serde(rename = "LogicalPath", alias = "logicalpath", default)]
    pub logical_path: Option<String>,
    /// Encrypt content stored by the server
    #[serde(rename = "ServerEncoding", alias = "serverencoding", default)]
    pub server_encoding: bool,
    /// Encrypt content stored by the client
    #[serde(rename = "ClientEncoding", alias = "clientencoding", default)]
    pub client_encoding: bool,
    /// Per-slot size cap in KiB
    #[serde(rename = "MaximumMediaSize", alias = "maximummediasize", default)]
    pub maximum_media_size: Option<u64>,
}

/// Immutable, validated configuration of one slot type.
#[derive(Debug, Clone, PartialEq, Eq, derive_getters::Getters)]
pub struct MediaSlotSpec {
    /// Descriptor group the slot belongs to
    group: String,
    /// Slot name within its group
    name: String,
    /// Short name embedded in file names
    alias: String,
    /// Kind of media accepted
    media_kind: MediaKind,
    /// Lower-case extensions accepted by this slot
    allowed_extensions: BTreeSet<String>,
    /// Side(s) that keep the files
    storage_location: StorageLocation,
    /// Directory below the application root
    logical_path: String,
    #[getter(skip)]
    encrypt_on_server: bool,
    #[getter(skip)]
    encrypt_on_client: bool,
    #[getter(skip)]
    max_size_kib: Option<u64>,
}

fn required<'a>(value: &'a Option<String>, attribute: &str, slot: &str) -> StoreResult<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(StoreError::validation(format!(
            "slot {} is missing mandatory attribute {}",
            slot, attribute
        ))),
    }
}

/// Check that `path` is made of filename-safe, slash-separated segments.
///
/// No segment may name a slot's own `pending` or `deleted` directory, so one
/// slot can never live inside the sweep area of another.
pub fn validate_logical_path(path: &str) -> StoreResult<()> {
    if path.contains('\\') {
        return Err(StoreError::validation(format!(
            "logical path {} must not contain a backslash",
            path
        )));
    }
    if path.starts_with('/') || path.ends_with('/') {
        return Err(StoreError::validation(format!(
            "logical path {} must not start or end with a slash",
            path
        )));
    }
    for segment in path.split('/') {
        if segment.is_empty() || sanitize(segment) != segment {
            return Err(StoreError::validation(format!(
                "logical path segment '{}' in {} is not filename-safe",
                segment, path
            )));
        }
        if segment.eq_ignore_ascii_case(PENDING_DIR) || segment.eq_ignore_ascii_case(DELETED_DIR) {
            return Err(StoreError::validation(format!(
                "logical path {} uses reserved segment '{}'",
                path, segment
            )));
        }
    }
    Ok(())
}

fn derive_alias(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

impl MediaSlotSpec {
    /// Validate descriptor attributes and build the slot.
    ///
    /// Fails if the media type, file types, storage location or logical path
    /// is missing or malformed, or if no declared extension is allowed for
    /// the media kind system-wide.
    #[tracing::instrument(skip(attributes))]
    pub fn from_attributes(
        group: &str,
        name: &str,
        attributes: &SlotAttributes,
    ) -> StoreResult<Self> {
        let slot = format!("{}/{}", group, name);

        let media_kind: MediaKind = required(&attributes.media_type, "MediaType", &slot)?
            .parse()
            .map_err(|e: String| StoreError::validation(format!("slot {}: {}", slot, e)))?;

        let allowed_extensions: BTreeSet<String> =
            required(&attributes.file_types, "FileTypes", &slot)?
                .split(',')
                .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|ext| !ext.is_empty())
                .collect();
        if allowed_extensions.is_empty() {
            return Err(StoreError::validation(format!(
                "slot {} declares no file types",
                slot
            )));
        }
        if !allowed_extensions
            .iter()
            .any(|ext| media_kind.allows_extension(ext))
        {
            return Err(StoreError::validation(format!(
                "slot {}: none of {:?} is allowed for {} media",
                slot, allowed_extensions, media_kind
            )));
        }

        let storage_location: StorageLocation =
            required(&attributes.storage_location, "StorageLocation", &slot)?
                .parse()
                .map_err(|_| {
                    StoreError::validation(format!(
                        "slot {}: unknown storage location {:?}",
                        slot, attributes.storage_location
                    ))
                })?;

        let logical_path = required(&attributes.logical_path, "LogicalPath", &slot)?.to_string();
        validate_logical_path(&logical_path)?;

        let alias = match attributes.alias.as_deref().map(str::trim) {
            Some(alias) if !alias.is_empty() => alias.to_ascii_lowercase(),
            _ => derive_alias(name),
        };
        if alias.is_empty() || sanitize(&alias) != alias || alias.contains('_') {
            return Err(StoreError::validation(format!(
                "slot {}: alias '{}' must be non-empty and alphanumeric",
                slot, alias
            )));
        }

        if attributes.maximum_media_size == Some(0) {
            return Err(StoreError::validation(format!(
                "slot {}: MaximumMediaSize must be positive",
                slot
            )));
        }

        Ok(Self {
            group: group.to_string(),
            name: name.to_string(),
            alias,
            media_kind,
            allowed_extensions,
            storage_location,
            logical_path,
            encrypt_on_server: attributes.server_encoding,
            encrypt_on_client: attributes.client_encoding,
            max_size_kib: attributes.maximum_media_size,
        })
    }

    /// Whether the slot holds images.
    pub fn is_image(&self) -> bool {
        self.media_kind == MediaKind::Image
    }

    /// Whether the slot holds video.
    pub fn is_video(&self) -> bool {
        self.media_kind == MediaKind::Video
    }

    /// Whether the slot holds audio.
    pub fn is_audio(&self) -> bool {
        self.media_kind == MediaKind::Audio
    }

    /// Whether the slot holds documents.
    pub fn is_document(&self) -> bool {
        self.media_kind == MediaKind::Document
    }

    /// Two-level allow-list: the slot's own set and the system-wide set for
    /// its media kind must both contain the extension.
    pub fn is_file_type_supported(&self, extension: &str) -> bool {
        let extension = extension.trim().trim_start_matches('.').to_ascii_lowercase();
        self.allowed_extensions.contains(&extension) && self.media_kind.allows_extension(&extension)
    }

    /// Whether the slot declares exactly this storage location.
    pub fn is_storage_location(&self, location: StorageLocation) -> bool {
        self.storage_location == location
    }

    /// Whether the server encrypts this slot's content.
    pub fn is_encrypt_on_server(&self) -> bool {
        self.encrypt_on_server
    }

    /// Whether the client encrypts this slot's content.
    pub fn is_encrypt_on_client(&self) -> bool {
        self.encrypt_on_client
    }

    /// Whether a store running as `role` encrypts this slot's content.
    pub fn is_encrypted_for(&self, role: Role) -> bool {
        match role {
            Role::Server => self.encrypt_on_server,
            Role::Client => self.encrypt_on_client,
        }
    }

    /// Per-slot size cap in KiB, if the descriptor overrides the global one.
    pub fn max_size_kib(&self) -> Option<u64> {
        self.max_size_kib
    }

    /// Effective size cap: the smaller of the slot and global limits.
    pub fn effective_max_size_kib(&self, global_kib: u64) -> u64 {
        self.max_size_kib
            .map_or(global_kib, |slot_kib| slot_kib.min(global_kib))
    }
}

/// Every declared slot, keyed by (group, name).
///
/// Lookup is case-insensitive because descriptor keys may arrive lower-cased
/// from the configuration layer.
#[derive(Debug, Clone, Default)]
pub struct SlotRegistry {
    slots: BTreeMap<(String, String), Arc<MediaSlotSpec>>,
}

impl SlotRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn key(group: &str, name: &str) -> (String, String) {
        (group.to_ascii_lowercase(), name.to_ascii_lowercase())
    }

    /// Add a slot. Duplicate (group, name) pairs, or two slots sharing both
    /// alias and logical path, are rejected because their files would collide.
    pub fn insert(&mut self, spec: MediaSlotSpec) -> StoreResult<Arc<MediaSlotSpec>> {
        let key = Self::key(spec.group(), spec.name());
        if self.slots.contains_key(&key) {
            return Err(StoreError::validation(format!(
                "slot {}/{} declared twice",
                spec.group(),
                spec.name()
            )));
        }
        if let Some(clash) = self
            .slots
            .values()
            .find(|other| other.alias() == spec.alias() && other.logical_path() == spec.logical_path())
        {
            return Err(StoreError::validation(format!(
                "slots {}/{} and {}/{} share alias {} in {}",
                clash.group(),
                clash.name(),
                spec.group(),
                spec.name(),
                spec.alias(),
                spec.logical_path()
            )));
        }
        let spec = Arc::new(spec);
        self.slots.insert(key, Arc::clone(&spec));
        Ok(spec)
    }

    /// Look up a slot by group and name.
    pub fn get(&self, group: &str, name: &str) -> Option<Arc<MediaSlotSpec>> {
        self.slots.get(&Self::key(group, name)).cloned()
    }

    /// Look up a slot, failing with a validation error if it is unknown.
    pub fn require(&self, group: &str, name: &str) -> StoreResult<Arc<MediaSlotSpec>> {
        self.get(group, name).ok_or_else(|| {
            StoreError::validation(format!("unknown media slot {}/{}", group, name))
        })
    }

    /// All slots in (group, name) order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<MediaSlotSpec>> {
        self.slots.values()
    }

    /// Number of declared slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no slot is declared.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
