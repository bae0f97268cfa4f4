//! On-disk file name grammar.
//!
//! Regular files are named
//! `<alias>-<paddedIdentifier>-<encodingKey>-<hash>.<extension>`, all lower
//! case. The name is the only record of a stored version: decoding it yields
//! the identity, the encoding key and the content hash without any lookup.
//!
//! Pending working copies use `<timestamp>-<sequence>.<extension>` and files
//! moved into the deleted directory use
//! `<originalBaseName>-<timestamp>-<sequence>.<extension>`. Neither decodes as
//! a regular name, so they are never mistaken for stored versions.

use crate::{EncodingKey, MediaSlotSpec};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

/// Width the data identifier is zero-padded to.
pub const IDENTIFIER_WIDTH: usize = 14;

const FIELD_SEPARATOR: char = '-';
const FIELD_COUNT: usize = 4;
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S%3f";

/// Positions of the fields in a regular file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
pub enum NameField {
    /// Slot alias
    Alias = 0,
    /// Zero-padded data identifier
    Identifier = 1,
    /// `s`/`c` plus two-digit key number
    EncodingKey = 2,
    /// Content hash
    Hash = 3,
}

/// All fields of a well-formed regular file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedName {
    /// Slot alias
    pub alias: String,
    /// Zero-padded data identifier
    pub identifier: String,
    /// Encoding key the content was stored with
    pub encoding_key: EncodingKey,
    /// Content hash embedded at publish time
    pub hash: String,
    /// Lower-case extension without the dot
    pub extension: String,
}

/// Replace every character that is not ASCII alphanumeric with `_`.
///
/// The result contains no separator, dot or path characters.
pub fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Normalize a caller-supplied identifier to its fixed-width on-disk form.
pub fn pad_identifier(identifier: &str) -> String {
    let padded = format!("{:0>width$}", identifier, width = IDENTIFIER_WIDTH);
    sanitize(&padded).to_ascii_lowercase()
}

fn normalize_extension(extension: &str) -> String {
    sanitize(extension.trim().trim_start_matches('.')).to_ascii_lowercase()
}

/// Build the regular file name for one stored version.
pub fn encode(
    slot: &MediaSlotSpec,
    identifier: &str,
    encoding_key: EncodingKey,
    hash: &str,
    extension: &str,
) -> String {
    format!(
        "{}-{}-{}-{}.{}",
        slot.alias(),
        pad_identifier(identifier),
        encoding_key,
        sanitize(hash).to_ascii_lowercase(),
        normalize_extension(extension)
    )
}

/// Glob matching every stored version of one identity.
pub fn name_mask(slot: &MediaSlotSpec, identifier: &str) -> String {
    format!("{}-{}-*-*.*", slot.alias(), pad_identifier(identifier))
}

fn split_name(path: &Path) -> Option<(Vec<&str>, &str)> {
    let file_name = path.file_name()?.to_str()?;
    let (stem, extension) = file_name.rsplit_once('.')?;
    if extension.is_empty() {
        return None;
    }
    let fields: Vec<&str> = stem.split(FIELD_SEPARATOR).collect();
    if fields.len() != FIELD_COUNT || fields.iter().any(|field| field.is_empty()) {
        return None;
    }
    Some((fields, extension))
}

/// Read one field from a regular file name.
///
/// Returns `None` for names that do not follow the grammar; callers skip
/// such files rather than failing.
pub fn decode_field(path: &Path, field: NameField) -> Option<String> {
    let (fields, _) = split_name(path)?;
    Some(fields[field as usize].to_string())
}

/// Encoding key of a regular file, `None` if the name is malformed.
pub fn decode_encoding_key(path: &Path) -> Option<EncodingKey> {
    decode_field(path, NameField::EncodingKey).map(|field| EncodingKey::parse_lenient(&field))
}

/// Content hash of a regular file, `None` if the name is malformed.
pub fn decode_hash(path: &Path) -> Option<String> {
    decode_field(path, NameField::Hash)
}

/// Decode every field of a regular file name at once.
pub fn decode(path: &Path) -> Option<DecodedName> {
    let (fields, extension) = split_name(path)?;
    Some(DecodedName {
        alias: fields[NameField::Alias as usize].to_string(),
        identifier: fields[NameField::Identifier as usize].to_string(),
        encoding_key: EncodingKey::parse_lenient(fields[NameField::EncodingKey as usize]),
        hash: fields[NameField::Hash as usize].to_string(),
        extension: extension.to_ascii_lowercase(),
    })
}

fn next_sequence() -> u64 {
    static SEQUENCE: OnceLock<AtomicU64> = OnceLock::new();
    SEQUENCE
        .get_or_init(|| AtomicU64::new(rand::random::<u32>() as u64))
        .fetch_add(1, Ordering::Relaxed)
}

fn timestamp_sequence() -> String {
    format!(
        "{}-{:010}",
        chrono::Local::now().format(TIMESTAMP_FORMAT),
        next_sequence()
    )
}

/// Fresh name for a pending working copy.
pub fn pending_name(extension: &str) -> String {
    format!("{}.{}", timestamp_sequence(), normalize_extension(extension))
}

/// Name a regular file receives when it is moved into the deleted directory.
pub fn deleted_name(original: &Path) -> String {
    let file_name = original
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("unnamed");
    match file_name.rsplit_once('.') {
        Some((stem, extension)) => format!("{}-{}.{}", stem, timestamp_sequence(), extension),
        None => format!("{}-{}", file_name, timestamp_sequence()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Role, SlotAttributes};
    use std::path::PathBuf;

    fn slot() -> MediaSlotSpec {
        MediaSlotSpec::from_attributes(
            "rooms",
            "photo",
            &SlotAttributes {
                alias: Some("roomphoto".into()),
                media_type: Some("Image".into()),
                file_types: Some("jpg,png".into()),
                storage_location: Some("Server".into()),
                logical_path: Some("rooms/photos".into()),
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn pads_and_sanitizes_identifier() {
        assert_eq!(pad_identifier("42"), "00000000000042");
        assert_eq!(pad_identifier("ab-c/d"), "00000000ab_c_d");
        assert_eq!(pad_identifier("ABCDEFGHIJKLMNOP"), "abcdefghijklmnop");
    }

    #[test]
    fn encode_follows_grammar() {
        let key = EncodingKey {
            role: Role::Server,
            number: 1,
        };
        let name = encode(&slot(), "42", key, "ABCDEF", ".JPG");
        assert_eq!(name, "roomphoto-00000000000042-s01-abcdef.jpg");
    }

    #[test]
    fn decode_recovers_every_field() {
        let path = PathBuf::from("/data/app/rooms/roomphoto-00000000000042-c03-deadbeef.png");
        let decoded = decode(&path).unwrap();
        assert_eq!(decoded.alias, "roomphoto");
        assert_eq!(decoded.identifier, "00000000000042");
        assert_eq!(decoded.encoding_key.role, Role::Client);
        assert_eq!(decoded.encoding_key.number, 3);
        assert_eq!(decoded.hash, "deadbeef");
        assert_eq!(decoded.extension, "png");
        assert_eq!(
            decode_field(&path, NameField::Identifier).as_deref(),
            Some("00000000000042")
        );
    }

    #[test]
    fn malformed_names_decode_to_none() {
        for name in [
            "roomphoto-00000000000042-s01.jpg",
            "roomphoto-00000000000042-s01-abc-extra.jpg",
            "roomphoto-00000000000042-s01-abc",
            "roomphoto--s01-abc.jpg",
            "20240101120000000-0000000001.jpg",
            "",
        ] {
            let path = PathBuf::from(name);
            assert!(decode(&path).is_none(), "{} should not decode", name);
            assert!(decode_hash(&path).is_none());
            assert!(decode_encoding_key(&path).is_none());
        }
    }

    #[test]
    fn unparsable_key_field_reads_as_plain() {
        let path = PathBuf::from("roomphoto-00000000000042-sxx-abc.jpg");
        assert_eq!(decode_encoding_key(&path).unwrap().number, 0);
    }

    #[test]
    fn mask_matches_every_version_of_one_identity() {
        let mask = glob::Pattern::new(&name_mask(&slot(), "42")).unwrap();
        assert!(mask.matches("roomphoto-00000000000042-s00-aaa.jpg"));
        assert!(mask.matches("roomphoto-00000000000042-c07-bbb.png"));
        assert!(!mask.matches("roomphoto-00000000000043-s00-aaa.jpg"));
        assert!(!mask.matches("other-00000000000042-s00-aaa.jpg"));
    }

    #[test]
    fn pending_names_are_unique_and_not_regular() {
        let first = pending_name("jpg");
        let second = pending_name("jpg");
        assert_ne!(first, second);
        assert!(decode(&PathBuf::from(&first)).is_none());
        assert!(first.ends_with(".jpg"));
    }

    #[test]
    fn deleted_name_embeds_original() {
        let original = PathBuf::from("roomphoto-00000000000042-s00-aaa.jpg");
        let name = deleted_name(&original);
        assert!(name.starts_with("roomphoto-00000000000042-s00-aaa-"));
        assert!(name.ends_with(".jpg"));
        assert!(decode(&PathBuf::from(name)).is_none());
    }
}
