//! The storage engine: publish, resolve and decrypt-for-read.

use crate::cipher;
use crate::fsops::{self, LinkOutcome};
use crate::layout::{PendingFile, SlotLayout};
use crate::naming::{self, DecodedName};
use crate::{EncodingKey, KeyRegistry, MediaAsset, MediaSlotSpec, Role};
use mediastore_error::{StoreError, StoreErrorKind, StoreResult};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// Default global size cap in KiB.
pub const DEFAULT_MAXIMUM_MEDIA_SIZE_KIB: u64 = 20 * 1024;

/// Process-level settings of a store.
#[derive(Debug, Clone, PartialEq, Eq, derive_getters::Getters, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct StoreSettings {
    /// Root directory shared by all applications
    root: PathBuf,
    /// Application directory below the root
    application: String,
    /// Side this process plays
    role: Role,
    /// Global size cap in KiB
    maximum_media_size_kib: u64,
}

impl StoreSettings {
    /// Settings with the default size cap.
    pub fn new(root: impl Into<PathBuf>, application: impl Into<String>, role: Role) -> Self {
        Self {
            root: root.into(),
            application: application.into(),
            role,
            maximum_media_size_kib: DEFAULT_MAXIMUM_MEDIA_SIZE_KIB,
        }
    }
}

/// What [`MediaStore::publish`] did with the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum PublishStatus {
    /// A new regular file was created
    #[display("stored")]
    Stored,
    /// Identical content was already present; its modification time was refreshed
    #[display("already present")]
    AlreadyPresent,
}

/// Result of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    /// Regular file holding the content
    pub path: PathBuf,
    /// Whether the file was created or refreshed
    pub status: PublishStatus,
}

/// Facts about the current version of an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaInfo {
    /// Regular file holding the current version
    pub path: PathBuf,
    /// Lower-case extension
    pub extension: String,
    /// Whether the file is still visible on disk
    pub exists: bool,
    /// Content hash from the file name
    pub hash: String,
    /// Encoding key from the file name
    pub encoding_key: EncodingKey,
    /// Last-modified time
    pub modified: SystemTime,
    /// Stored size in bytes (ciphertext size when encrypted)
    pub size_bytes: u64,
}

/// A plaintext working copy of the current version of an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingCopy {
    /// Regular file the copy was made from
    pub original: PathBuf,
    /// Plaintext copy in the pending directory
    pub working: PathBuf,
}

/// Media storage engine.
///
/// Every operation runs synchronously on the caller's thread. There is no
/// locking between processes sharing the same directories; see
/// [`MediaStore::publish`] for what that means for concurrent writers.
#[derive(Debug, Clone)]
pub struct MediaStore {
    settings: StoreSettings,
    keys: Arc<KeyRegistry>,
}

impl MediaStore {
    /// Create a store using the given key registry.
    #[tracing::instrument(skip(settings, keys), fields(root = %settings.root().display(), role = %settings.role()))]
    pub fn new(settings: StoreSettings, keys: Arc<KeyRegistry>) -> Self {
        tracing::info!("Created media store");
        Self { settings, keys }
    }

    /// Store settings.
    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// Key registry used for encryption and decryption.
    pub fn keys(&self) -> &KeyRegistry {
        &self.keys
    }

    /// Directory layout of a slot.
    pub fn layout(&self, slot: &MediaSlotSpec) -> SlotLayout {
        SlotLayout::new(
            self.settings.root(),
            self.settings.application(),
            slot.logical_path(),
        )
    }

    fn validate(&self, slot: &MediaSlotSpec, extension: &str, size_bytes: u64) -> StoreResult<()> {
        if !slot.is_file_type_supported(extension) {
            return Err(StoreError::validation(format!(
                "file type '{}' is not supported by slot {}/{}",
                extension,
                slot.group(),
                slot.name()
            )));
        }
        let limit_kib = slot.effective_max_size_kib(*self.settings.maximum_media_size_kib());
        if size_bytes > limit_kib.saturating_mul(1024) {
            return Err(StoreError::validation(format!(
                "{} bytes exceed the {} KiB limit of slot {}/{}",
                size_bytes,
                limit_kib,
                slot.group(),
                slot.name()
            )));
        }
        Ok(())
    }

    fn validate_identifier(identifier: &str) -> StoreResult<()> {
        if identifier.trim().is_empty() {
            return Err(StoreError::validation("data identifier must not be empty"));
        }
        Ok(())
    }

    fn source_extension(source: &Path) -> StoreResult<String> {
        source
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| {
                StoreError::validation(format!("{} has no file extension", source.display()))
            })
    }

    /// Ingest a file as the newest version of `identifier`.
    ///
    /// Validation (readability, file type, size) happens before anything is
    /// written. The content is staged in `pending`, hashed, encrypted if the
    /// slot requires it for this role, and placed in the regular directory
    /// under its content-addressed name. If that exact name already exists
    /// the content is already stored and only its modification time is
    /// refreshed.
    ///
    /// Placement first tries an atomic hard link, which cannot overwrite.
    /// Where links are refused it falls back to check-then-copy, so two
    /// processes publishing different content for one identity at the same
    /// moment can both succeed and leave two candidate current files; the
    /// newer one wins on resolve and the obsolescence sweep retires the other.
    #[tracing::instrument(skip(self, slot, source), fields(slot = %slot.alias(), source = %source.display()))]
    pub fn publish(
        &self,
        slot: &MediaSlotSpec,
        source: &Path,
        identifier: &str,
    ) -> StoreResult<Published> {
        Self::validate_identifier(identifier)?;
        let metadata = fs::metadata(source).map_err(|e| {
            StoreError::validation(format!("cannot read {}: {}", source.display(), e))
        })?;
        if !metadata.is_file() {
            return Err(StoreError::validation(format!(
                "{} is not a regular file",
                source.display()
            )));
        }
        let extension = Self::source_extension(source)?;
        self.validate(slot, &extension, metadata.len())?;
        fs::File::open(source).map_err(|e| {
            StoreError::validation(format!("cannot read {}: {}", source.display(), e))
        })?;

        let layout = self.layout(slot);
        layout.ensure()?;
        let staged = layout.new_pending_file(&extension)?;
        fsops::copy(source, staged.path())?;
        self.ingest(slot, &layout, staged, &extension, identifier)
    }

    /// Ingest in-memory content, as received from a remote upload.
    #[tracing::instrument(skip(self, slot, data), fields(slot = %slot.alias(), size = data.len()))]
    pub fn publish_bytes(
        &self,
        slot: &MediaSlotSpec,
        data: &[u8],
        extension: &str,
        identifier: &str,
    ) -> StoreResult<Published> {
        Self::validate_identifier(identifier)?;
        let extension = extension.trim().trim_start_matches('.').to_ascii_lowercase();
        self.validate(slot, &extension, data.len() as u64)?;

        let layout = self.layout(slot);
        layout.ensure()?;
        let staged = layout.new_pending_file(&extension)?;
        fs::write(staged.path(), data).map_err(|e| {
            StoreError::io(format!("write {}: {}", staged.path().display(), e))
        })?;
        self.ingest(slot, &layout, staged, &extension, identifier)
    }

    fn ingest(
        &self,
        slot: &MediaSlotSpec,
        layout: &SlotLayout,
        staged: PendingFile,
        extension: &str,
        identifier: &str,
    ) -> StoreResult<Published> {
        let role = *self.settings.role();
        // The name always carries the plaintext hash, even when the stored
        // bytes are ciphertext.
        let hash = cipher::hash_file(staged.path())?;

        let (working, encoding_key) = if slot.is_encrypted_for(role) {
            let key = self.keys.active(role);
            if !key.is_encrypted() {
                return Err(StoreError::new(StoreErrorKind::MissingKey(0)));
            }
            let material = self.keys.material(key.number)?;
            let sealed = layout.new_pending_file(extension)?;
            cipher::encrypt_file(staged.path(), sealed.path(), material)?;
            drop(staged);
            (sealed, key)
        } else {
            (staged, EncodingKey::plain(role))
        };

        let name = naming::encode(slot, identifier, encoding_key, &hash, extension);
        let destination = layout.regular().join(name);
        let status = Self::place_if_absent(working.path(), &destination)?;
        drop(working);

        match status {
            PublishStatus::Stored => tracing::info!(
                path = %destination.display(),
                hash = %hash,
                key = %encoding_key,
                "Stored media file"
            ),
            PublishStatus::AlreadyPresent => tracing::debug!(
                path = %destination.display(),
                "Media already stored, refreshed modification time"
            ),
        }
        Ok(Published {
            path: destination,
            status,
        })
    }

    fn place_if_absent(working: &Path, destination: &Path) -> StoreResult<PublishStatus> {
        match fsops::link_if_absent(working, destination) {
            LinkOutcome::Linked => Ok(PublishStatus::Stored),
            LinkOutcome::AlreadyExists => {
                fsops::touch(destination)?;
                Ok(PublishStatus::AlreadyPresent)
            }
            LinkOutcome::Unsupported => {
                if fsops::exists(destination) {
                    fsops::touch(destination)?;
                    Ok(PublishStatus::AlreadyPresent)
                } else {
                    fsops::copy(working, destination)?;
                    Ok(PublishStatus::Stored)
                }
            }
        }
    }

    /// Every well-formed regular file of one identity with its modification time.
    pub(crate) fn versions(
        &self,
        slot: &MediaSlotSpec,
        identifier: &str,
    ) -> StoreResult<Vec<(PathBuf, SystemTime)>> {
        let layout = self.layout(slot);
        let mask = glob::Pattern::new(&naming::name_mask(slot, identifier)).map_err(|e| {
            StoreError::new(StoreErrorKind::MalformedName(format!(
                "name mask for {}: {}",
                identifier, e
            )))
        })?;
        let mut versions = Vec::new();
        for path in fsops::list_files(layout.regular())? {
            let matches = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| mask.matches(name));
            if !matches || naming::decode(&path).is_none() {
                continue;
            }
            match fsops::modified(&path) {
                Ok(modified) => versions.push((path, modified)),
                // Swept away while listing
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(versions)
    }

    /// Newest regular file of an identity, if any.
    #[tracing::instrument(skip(self, slot), fields(slot = %slot.alias()))]
    pub fn resolve_current(
        &self,
        slot: &MediaSlotSpec,
        identifier: &str,
    ) -> StoreResult<Option<PathBuf>> {
        let current = self
            .versions(slot, identifier)?
            .into_iter()
            .max_by(|(a_path, a_time), (b_path, b_time)| {
                a_time.cmp(b_time).then_with(|| a_path.cmp(b_path))
            })
            .map(|(path, _)| path);
        tracing::debug!(current = ?current, "Resolved current media file");
        Ok(current)
    }

    /// Whether any version of the identity is stored.
    pub fn exists(&self, slot: &MediaSlotSpec, identifier: &str) -> StoreResult<bool> {
        Ok(self.resolve_current(slot, identifier)?.is_some())
    }

    /// Whether the current version has exactly this extension and hash.
    pub fn check_exists(
        &self,
        slot: &MediaSlotSpec,
        extension: &str,
        identifier: &str,
        hash: &str,
    ) -> StoreResult<bool> {
        let Some(current) = self.resolve_current(slot, identifier)? else {
            return Ok(false);
        };
        let Some(decoded) = naming::decode(&current) else {
            return Ok(false);
        };
        let extension = extension.trim().trim_start_matches('.').to_ascii_lowercase();
        Ok(decoded.extension == extension && decoded.hash == hash.to_ascii_lowercase())
    }

    /// Describe the current version of an identity.
    pub fn info(&self, slot: &MediaSlotSpec, identifier: &str) -> StoreResult<Option<MediaInfo>> {
        let Some(current) = self.resolve_current(slot, identifier)? else {
            return Ok(None);
        };
        let decoded = Self::decode_current(&current)?;
        let (exists, modified, size_bytes) = Self::stat_current(&current)?;
        Ok(Some(MediaInfo {
            exists,
            extension: decoded.extension,
            hash: decoded.hash,
            encoding_key: decoded.encoding_key,
            modified,
            size_bytes,
            path: current,
        }))
    }

    /// Visibility, modification time and size of a resolved file. Only a file
    /// that vanished after resolution is reported as absent.
    fn stat_current(path: &Path) -> StoreResult<(bool, SystemTime, u64)> {
        match fs::metadata(path) {
            Ok(metadata) => {
                let modified = metadata
                    .modified()
                    .map_err(|e| StoreError::io(format!("mtime of {}: {}", path.display(), e)))?;
                Ok((true, modified, metadata.len()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "Current version vanished before it was described");
                Ok((false, SystemTime::UNIX_EPOCH, 0))
            }
            Err(e) => Err(StoreError::io(format!("stat {}: {}", path.display(), e))),
        }
    }

    fn decode_current(path: &Path) -> StoreResult<DecodedName> {
        naming::decode(path).ok_or_else(|| {
            StoreError::new(StoreErrorKind::MalformedName(path.display().to_string()))
        })
    }

    /// Produce a plaintext working copy of the current version in `pending`.
    ///
    /// Encrypted content is copied, decrypted with the key named in the file
    /// name, and the plaintext hash is checked against the one recorded at
    /// publish time. On a mismatch both the encrypted copy and the decrypted
    /// output stay in `pending` for inspection and the call fails with
    /// [`StoreErrorKind::IntegrityMismatch`].
    #[tracing::instrument(skip(self, slot), fields(slot = %slot.alias()))]
    pub fn open_working_copy(
        &self,
        slot: &MediaSlotSpec,
        identifier: &str,
    ) -> StoreResult<WorkingCopy> {
        let original = self.resolve_current(slot, identifier)?.ok_or_else(|| {
            StoreError::new(StoreErrorKind::NotFound(format!(
                "{}/{}",
                slot.alias(),
                naming::pad_identifier(identifier)
            )))
        })?;
        let decoded = Self::decode_current(&original)?;
        let material = if decoded.encoding_key.is_encrypted() {
            Some(self.keys.material(decoded.encoding_key.number)?)
        } else {
            None
        };

        let layout = self.layout(slot);
        layout.ensure()?;
        let copy = layout.new_pending_file(&decoded.extension)?;
        fsops::copy(&original, copy.path())?;

        let Some(material) = material else {
            return Ok(WorkingCopy {
                original,
                working: copy.keep(),
            });
        };

        let plain = layout.new_pending_file(&decoded.extension)?;
        cipher::decrypt_file(copy.path(), plain.path(), material)?;
        let actual = cipher::hash_file(plain.path())?;
        if actual != decoded.hash {
            let encrypted = copy.keep();
            let decrypted = plain.keep();
            tracing::warn!(
                original = %original.display(),
                encrypted = %encrypted.display(),
                decrypted = %decrypted.display(),
                expected = %decoded.hash,
                actual = %actual,
                "Decrypted content does not match its recorded hash, keeping working files"
            );
            return Err(StoreError::new(StoreErrorKind::IntegrityMismatch {
                expected: decoded.hash,
                actual,
            }));
        }
        drop(copy);
        Ok(WorkingCopy {
            original,
            working: plain.keep(),
        })
    }

    /// Plaintext copy for a remote reader, who owns and must delete it.
    ///
    /// An identity with nothing stored yields `None`.
    pub fn read_to_pending(
        &self,
        slot: &MediaSlotSpec,
        identifier: &str,
    ) -> StoreResult<Option<PathBuf>> {
        match self.open_working_copy(slot, identifier) {
            Ok(copy) => Ok(Some(copy.working)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Bind a new asset handle to the current version of an identity.
    pub fn bind<'a>(
        &'a self,
        slot: &'a MediaSlotSpec,
        identifier: &str,
    ) -> StoreResult<MediaAsset<'a>> {
        let mut asset = MediaAsset::new(self, slot, identifier);
        asset.bind()?;
        Ok(asset)
    }
}
