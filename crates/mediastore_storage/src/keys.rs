//! Encoding keys and the key registry used for at-rest encryption.

use mediastore_error::{StoreError, StoreErrorKind, StoreResult};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Highest key number that fits the two-digit name field.
pub const MAX_KEY_NUMBER: u8 = 99;

/// Which side of the application is running this store.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    strum::EnumIter,
    strum::EnumString,
    derive_more::Display,
    serde::Deserialize,
    serde::Serialize,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Server process
    #[default]
    #[display("server")]
    Server,
    /// Client process
    #[display("client")]
    Client,
}

impl Role {
    /// Prefix character used for this role in file names.
    pub fn prefix(&self) -> char {
        match self {
            Role::Server => 's',
            Role::Client => 'c',
        }
    }
}

/// Encoding key reference as embedded in a file name (`s01`, `c00`, ...).
///
/// Key number 0 means the content is stored unencrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncodingKey {
    /// Role that wrote the file
    pub role: Role,
    /// Key number, 0 for plain content
    pub number: u8,
}

impl EncodingKey {
    /// Plain (unencrypted) marker for the given role.
    pub fn plain(role: Role) -> Self {
        Self { role, number: 0 }
    }

    /// Whether reading this file requires decryption.
    pub fn is_encrypted(&self) -> bool {
        self.number != 0
    }

    /// Parse a name field such as `s01`.
    ///
    /// Parsing fails closed: a suffix that is not a two-digit number decodes
    /// as key 0. Key 0 never triggers decryption, so an unreadable field can
    /// only ever lead to the file being served as stored.
    pub fn parse_lenient(field: &str) -> Self {
        let mut chars = field.chars();
        let role = match chars.next() {
            Some('c') | Some('C') => Role::Client,
            _ => Role::Server,
        };
        let digits = chars.as_str();
        let number = if digits.len() == 2 && digits.chars().all(|c| c.is_ascii_digit()) {
            digits.parse::<u8>().unwrap_or(0)
        } else {
            0
        };
        Self { role, number }
    }
}

impl std::fmt::Display for EncodingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{:02}", self.role.prefix(), self.number)
    }
}

/// 256-bit symmetric key material.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial([u8; 32]);

impl KeyMaterial {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive key bytes from a configured passphrase.
    pub fn from_passphrase(passphrase: &str) -> Self {
        let digest = Sha256::digest(passphrase.as_bytes());
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyMaterial(<redacted>)")
    }
}

/// Registry mapping encoding-key numbers to key material.
///
/// Owned by a [`crate::MediaStore`]; independent stores may use independent
/// registries. The active key per role decides how new content is encrypted,
/// while every registered number stays usable for reading older content.
#[derive(Debug, Clone, Default)]
pub struct KeyRegistry {
    keys: BTreeMap<u8, KeyMaterial>,
    active_server: u8,
    active_client: u8,
}

impl KeyRegistry {
    /// Empty registry: no keys, both roles write unencrypted names.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register key material under `number`, replacing any previous entry.
    #[tracing::instrument(skip(self, material))]
    pub fn register(&mut self, number: u8, material: KeyMaterial) -> StoreResult<()> {
        if number == 0 || number > MAX_KEY_NUMBER {
            return Err(StoreError::validation(format!(
                "encoding key number must be between 1 and {}, got {}",
                MAX_KEY_NUMBER, number
            )));
        }
        if self.keys.insert(number, material).is_some() {
            tracing::info!(number, "Replaced encoding key");
        } else {
            tracing::debug!(number, "Registered encoding key");
        }
        Ok(())
    }

    /// Builder-style [`KeyRegistry::register`].
    pub fn with_key(mut self, number: u8, material: KeyMaterial) -> StoreResult<Self> {
        self.register(number, material)?;
        Ok(self)
    }

    /// Select the key number used when `role` encrypts new content.
    ///
    /// The number must already be registered.
    pub fn set_active(&mut self, role: Role, number: u8) -> StoreResult<()> {
        if number != 0 && !self.keys.contains_key(&number) {
            return Err(StoreError::new(StoreErrorKind::MissingKey(number)));
        }
        match role {
            Role::Server => self.active_server = number,
            Role::Client => self.active_client = number,
        }
        Ok(())
    }

    /// Builder-style [`KeyRegistry::set_active`].
    pub fn with_active(mut self, role: Role, number: u8) -> StoreResult<Self> {
        self.set_active(role, number)?;
        Ok(self)
    }

    /// Active encoding key for `role`.
    pub fn active(&self, role: Role) -> EncodingKey {
        let number = match role {
            Role::Server => self.active_server,
            Role::Client => self.active_client,
        };
        EncodingKey { role, number }
    }

    /// Look up key material by number.
    pub fn material(&self, number: u8) -> StoreResult<&KeyMaterial> {
        self.keys
            .get(&number)
            .ok_or_else(|| StoreError::new(StoreErrorKind::MissingKey(number)))
    }

    /// Registered key numbers in ascending order.
    pub fn numbers(&self) -> impl Iterator<Item = u8> + '_ {
        self.keys.keys().copied()
    }
}
