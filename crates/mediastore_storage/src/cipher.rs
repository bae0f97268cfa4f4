//! Content hashing and at-rest encryption of whole files.
//!
//! Encrypted files are a random 12-byte nonce followed by the ChaCha20
//! keystream applied to the plaintext. The cipher carries no authentication
//! tag: decrypting with the wrong key succeeds and yields garbage, which the
//! read path detects by comparing the plaintext hash with the hash recorded in
//! the file name.

use crate::KeyMaterial;
use chacha20::cipher::{KeyIvInit, StreamCipher};
use chacha20::{ChaCha20, Key, Nonce};
use mediastore_error::{StoreError, StoreResult};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

const NONCE_LEN: usize = 12;
const CHUNK_SIZE: usize = 64 * 1024;

fn io_error(operation: &str, path: &Path, e: io::Error) -> StoreError {
    StoreError::io(format!("{} {}: {}", operation, path.display(), e))
}

/// SHA-256 of a file's bytes as lower-case hex.
pub fn hash_file(path: &Path) -> StoreResult<String> {
    let mut reader = File::open(path)
        .map(BufReader::new)
        .map_err(|e| io_error("open", path, e))?;
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher).map_err(|e| io_error("hash", path, e))?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// SHA-256 of in-memory bytes as lower-case hex.
pub fn hash_bytes(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

fn stream(
    reader: &mut impl Read,
    writer: &mut impl Write,
    cipher: &mut ChaCha20,
    source: &Path,
    target: &Path,
) -> StoreResult<()> {
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let read = reader
            .read(&mut buffer)
            .map_err(|e| io_error("read", source, e))?;
        if read == 0 {
            break;
        }
        cipher.apply_keystream(&mut buffer[..read]);
        writer
            .write_all(&buffer[..read])
            .map_err(|e| io_error("write", target, e))?;
    }
    writer.flush().map_err(|e| io_error("flush", target, e))
}

/// Encrypt `source` into `target`, which is created or truncated.
#[tracing::instrument(skip(source, target, key), fields(source = %source.display(), target = %target.display()))]
pub fn encrypt_file(source: &Path, target: &Path, key: &KeyMaterial) -> StoreResult<()> {
    let nonce: [u8; NONCE_LEN] = rand::random();
    let mut cipher = ChaCha20::new(Key::from_slice(key.as_bytes()), Nonce::from_slice(&nonce));

    let mut reader = File::open(source)
        .map(BufReader::new)
        .map_err(|e| io_error("open", source, e))?;
    let mut writer = File::create(target)
        .map(BufWriter::new)
        .map_err(|e| io_error("create", target, e))?;
    writer
        .write_all(&nonce)
        .map_err(|e| io_error("write", target, e))?;
    stream(&mut reader, &mut writer, &mut cipher, source, target)
}

/// Decrypt `source` (as written by [`encrypt_file`]) into `target`.
#[tracing::instrument(skip(source, target, key), fields(source = %source.display(), target = %target.display()))]
pub fn decrypt_file(source: &Path, target: &Path, key: &KeyMaterial) -> StoreResult<()> {
    let mut reader = File::open(source)
        .map(BufReader::new)
        .map_err(|e| io_error("open", source, e))?;
    let mut nonce = [0u8; NONCE_LEN];
    reader.read_exact(&mut nonce).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            StoreError::validation(format!(
                "{} is too short to be encrypted content",
                source.display()
            ))
        } else {
            io_error("read", source, e)
        }
    })?;
    let mut cipher = ChaCha20::new(Key::from_slice(key.as_bytes()), Nonce::from_slice(&nonce));

    let mut writer = File::create(target)
        .map(BufWriter::new)
        .map_err(|e| io_error("create", target, e))?;
    stream(&mut reader, &mut writer, &mut cipher, source, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn known_sha256() {
        assert_eq!(
            hash_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn file_and_bytes_hash_agree() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data");
        std::fs::write(&path, b"hello media").unwrap();
        assert_eq!(hash_file(&path).unwrap(), hash_bytes(b"hello media"));
    }

    #[test]
    fn decrypt_restores_plaintext_across_chunks() {
        let dir = TempDir::new().unwrap();
        let plain = dir.path().join("plain");
        let sealed = dir.path().join("sealed");
        let opened = dir.path().join("opened");
        let data: Vec<u8> = (0..(CHUNK_SIZE * 2 + 17)).map(|i| (i % 251) as u8).collect();
        std::fs::write(&plain, &data).unwrap();
        let key = KeyMaterial::from_passphrase("correct horse");

        encrypt_file(&plain, &sealed, &key).unwrap();
        let stored = std::fs::read(&sealed).unwrap();
        assert_eq!(stored.len(), data.len() + NONCE_LEN);
        assert_ne!(&stored[NONCE_LEN..], &data[..]);

        decrypt_file(&sealed, &opened, &key).unwrap();
        assert_eq!(std::fs::read(&opened).unwrap(), data);
    }

    #[test]
    fn wrong_key_yields_different_bytes() {
        let dir = TempDir::new().unwrap();
        let plain = dir.path().join("plain");
        let sealed = dir.path().join("sealed");
        let opened = dir.path().join("opened");
        std::fs::write(&plain, b"secret contract").unwrap();

        encrypt_file(&plain, &sealed, &KeyMaterial::from_passphrase("one")).unwrap();
        decrypt_file(&sealed, &opened, &KeyMaterial::from_passphrase("two")).unwrap();
        assert_ne!(hash_file(&opened).unwrap(), hash_file(&plain).unwrap());
    }

    #[test]
    fn truncated_ciphertext_is_rejected() {
        let dir = TempDir::new().unwrap();
        let sealed = dir.path().join("sealed");
        std::fs::write(&sealed, b"short").unwrap();
        let err = decrypt_file(&sealed, &dir.path().join("out"), &KeyMaterial::from_passphrase("k"))
            .unwrap_err();
        assert!(err.is_validation());
    }
}
