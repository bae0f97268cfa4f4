//! Tests for publish, resolve and bind against a real directory tree.

use mediastore_storage::{
    KeyMaterial, KeyRegistry, MediaSlotSpec, MediaStore, PublishStatus, Role, SlotAttributes,
    StoreErrorKind, StoreSettings, fsops, naming,
};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

fn photo_slot(server_encoding: bool) -> MediaSlotSpec {
    let attributes = SlotAttributes {
        alias: Some("photo".into()),
        media_type: Some("Image".into()),
        file_types: Some("jpg, png".into()),
        storage_location: Some("Synchronize".into()),
        logical_path: Some("rooms/photos".into()),
        server_encoding,
        maximum_media_size: Some(1),
        ..Default::default()
    };
    MediaSlotSpec::from_attributes("rooms", "Photo", &attributes).unwrap()
}

fn store_with(root: &Path, keys: KeyRegistry) -> MediaStore {
    MediaStore::new(
        StoreSettings::new(root, "hotel", Role::Server),
        Arc::new(keys),
    )
}

fn plain_store(root: &Path) -> MediaStore {
    store_with(root, KeyRegistry::new())
}

fn keyed_store(root: &Path, passphrase: &str) -> MediaStore {
    let keys = KeyRegistry::new()
        .with_key(1, KeyMaterial::from_passphrase(passphrase))
        .unwrap()
        .with_active(Role::Server, 1)
        .unwrap();
    store_with(root, keys)
}

fn write_source(dir: &Path, name: &str, data: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, data).unwrap();
    path
}

fn age(path: &Path, days: u64) {
    let then = SystemTime::now() - Duration::from_secs(days * 86_400);
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(then)
        .unwrap();
}

#[test]
fn test_publish_is_idempotent() {
    let root = TempDir::new().unwrap();
    let sources = TempDir::new().unwrap();
    let store = plain_store(root.path());
    let slot = photo_slot(false);
    let source = write_source(sources.path(), "room.jpg", b"same bytes");

    let first = store.publish(&slot, &source, "42").unwrap();
    assert_eq!(first.status, PublishStatus::Stored);
    age(&first.path, 10);
    let aged = fsops::modified(&first.path).unwrap();

    let second = store.publish(&slot, &source, "42").unwrap();
    assert_eq!(second.status, PublishStatus::AlreadyPresent);
    assert_eq!(second.path, first.path);
    assert!(fsops::modified(&second.path).unwrap() > aged);

    let regular = fsops::list_files(store.layout(&slot).regular()).unwrap();
    assert_eq!(regular, vec![first.path]);
}

#[test]
fn test_published_name_is_self_describing() {
    let root = TempDir::new().unwrap();
    let store = plain_store(root.path());
    let slot = photo_slot(false);

    let published = store.publish_bytes(&slot, b"abc", ".JPG", "42").unwrap();
    let decoded = naming::decode(&published.path).unwrap();
    assert_eq!(decoded.alias, "photo");
    assert_eq!(decoded.identifier, "00000000000042");
    assert_eq!(decoded.encoding_key.to_string(), "s00");
    assert_eq!(
        decoded.hash,
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
    assert_eq!(decoded.extension, "jpg");
    assert!(published.path.starts_with(root.path().join("hotel/rooms/photos")));
}

#[test]
fn test_round_trip_without_encryption() {
    let root = TempDir::new().unwrap();
    let sources = TempDir::new().unwrap();
    let store = plain_store(root.path());
    let slot = photo_slot(false);
    let data = b"\xff\xd8\xff\xe0 plain jpeg";
    let source = write_source(sources.path(), "room.jpg", data);

    store.publish(&slot, &source, "7").unwrap();
    let asset = store.bind(&slot, "7").unwrap();
    assert!(asset.is_bound());
    assert_eq!(asset.read_as_bytes().unwrap().unwrap(), data);
}

#[test]
fn test_round_trip_with_encryption() {
    let root = TempDir::new().unwrap();
    let sources = TempDir::new().unwrap();
    let store = keyed_store(root.path(), "front desk");
    let slot = photo_slot(true);
    let data = b"guest passport scan";
    let source = write_source(sources.path(), "scan.png", data);

    let published = store.publish(&slot, &source, "9").unwrap();
    assert_eq!(
        naming::decode_encoding_key(&published.path).unwrap().to_string(),
        "s01"
    );
    let stored = std::fs::read(&published.path).unwrap();
    assert_ne!(stored, data);

    let asset = store.bind(&slot, "9").unwrap();
    assert_eq!(asset.read_as_bytes().unwrap().unwrap(), data);
}

#[test]
fn test_changed_key_is_detected_and_working_files_kept() {
    let root = TempDir::new().unwrap();
    let slot = photo_slot(true);
    keyed_store(root.path(), "old secret")
        .publish_bytes(&slot, b"signed contract", "png", "5")
        .unwrap();

    let store = keyed_store(root.path(), "new secret");
    let err = store.bind(&slot, "5").unwrap_err();
    assert!(err.is_integrity());

    let pending = fsops::list_files(store.layout(&slot).pending()).unwrap();
    assert_eq!(pending.len(), 2);
}

#[test]
fn test_unregistered_key_fails_before_copying() {
    let root = TempDir::new().unwrap();
    let slot = photo_slot(true);
    keyed_store(root.path(), "secret")
        .publish_bytes(&slot, b"contract", "png", "5")
        .unwrap();

    let store = plain_store(root.path());
    let err = store.bind(&slot, "5").unwrap_err();
    assert_eq!(err.kind(), &StoreErrorKind::MissingKey(1));
    assert!(fsops::list_files(store.layout(&slot).pending()).unwrap().is_empty());
}

#[test]
fn test_encrypted_slot_without_active_key_rejects_publish() {
    let root = TempDir::new().unwrap();
    let store = plain_store(root.path());
    let slot = photo_slot(true);

    let err = store.publish_bytes(&slot, b"contract", "png", "5").unwrap_err();
    assert_eq!(err.kind(), &StoreErrorKind::MissingKey(0));
    assert!(!store.exists(&slot, "5").unwrap());
    assert!(fsops::list_files(store.layout(&slot).pending()).unwrap().is_empty());
}

#[test]
fn test_oversized_and_unsupported_files_leave_no_trace() {
    let root = TempDir::new().unwrap();
    let sources = TempDir::new().unwrap();
    let store = plain_store(root.path());
    let slot = photo_slot(false);

    let oversized = write_source(sources.path(), "big.jpg", &vec![0u8; 1025]);
    let err = store.publish(&slot, &oversized, "1").unwrap_err();
    assert!(err.is_validation());

    let wrong_type = write_source(sources.path(), "notes.txt", b"hello");
    let err = store.publish(&slot, &wrong_type, "1").unwrap_err();
    assert!(err.is_validation());

    let missing = sources.path().join("missing.jpg");
    assert!(store.publish(&slot, &missing, "1").unwrap_err().is_validation());

    let layout = store.layout(&slot);
    assert!(fsops::list_files(layout.regular()).unwrap().is_empty());
    assert!(fsops::list_files(layout.pending()).unwrap().is_empty());
}

#[test]
fn test_size_limit_is_inclusive() {
    let root = TempDir::new().unwrap();
    let store = plain_store(root.path());
    let slot = photo_slot(false);

    store.publish_bytes(&slot, &vec![1u8; 1024], "jpg", "1").unwrap();
}

#[test]
fn test_empty_identifier_is_rejected() {
    let root = TempDir::new().unwrap();
    let store = plain_store(root.path());
    let slot = photo_slot(false);

    let err = store.publish_bytes(&slot, b"x", "jpg", "  ").unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn test_pending_is_clean_after_publish_and_release() {
    let root = TempDir::new().unwrap();
    let store = keyed_store(root.path(), "secret");
    let slot = photo_slot(true);
    store.publish_bytes(&slot, b"first", "jpg", "3").unwrap();
    let pending_dir = store.layout(&slot).pending().clone();
    assert!(fsops::list_files(&pending_dir).unwrap().is_empty());

    let mut asset = store.bind(&slot, "3").unwrap();
    let working = asset.working_path().unwrap().to_path_buf();
    assert!(working.starts_with(&pending_dir));
    assert_eq!(fsops::list_files(&pending_dir).unwrap().len(), 1);

    asset.release().unwrap();
    assert!(!asset.is_bound());
    assert!(asset.original_path().is_none());
    assert!(fsops::list_files(&pending_dir).unwrap().is_empty());

    // Released twice is fine
    asset.release().unwrap();
    assert_eq!(asset.read_as_bytes().unwrap(), None);
}

#[test]
fn test_dropping_a_bound_asset_releases_it() {
    let root = TempDir::new().unwrap();
    let store = plain_store(root.path());
    let slot = photo_slot(false);
    store.publish_bytes(&slot, b"lobby", "jpg", "8").unwrap();

    {
        let asset = store.bind(&slot, "8").unwrap();
        assert_eq!(asset.read_as_string().unwrap().as_deref(), Some("lobby"));
    }
    assert!(fsops::list_files(store.layout(&slot).pending()).unwrap().is_empty());
}

#[test]
fn test_rebinding_replaces_the_working_copy() {
    let root = TempDir::new().unwrap();
    let store = plain_store(root.path());
    let slot = photo_slot(false);
    store.publish_bytes(&slot, b"before", "jpg", "4").unwrap();

    let mut asset = store.bind(&slot, "4").unwrap();
    let first = asset.working_path().unwrap().to_path_buf();
    asset.bind().unwrap();
    let second = asset.working_path().unwrap().to_path_buf();

    assert_ne!(first, second);
    assert!(!first.exists());
    assert!(second.exists());
}

#[test]
fn test_bind_unknown_identity_is_not_found() {
    let root = TempDir::new().unwrap();
    let store = plain_store(root.path());
    let slot = photo_slot(false);

    let err = store.bind(&slot, "404").unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(store.read_to_pending(&slot, "404").unwrap(), None);
}

#[test]
fn test_newest_version_is_current() {
    let root = TempDir::new().unwrap();
    let store = plain_store(root.path());
    let slot = photo_slot(false);

    let old = store.publish_bytes(&slot, b"old view", "jpg", "12").unwrap();
    age(&old.path, 3);
    let new = store.publish_bytes(&slot, b"new view", "png", "12").unwrap();

    assert_eq!(store.resolve_current(&slot, "12").unwrap(), Some(new.path.clone()));
    let asset = store.bind(&slot, "12").unwrap();
    assert_eq!(asset.original_path(), Some(new.path.as_path()));
    assert_eq!(asset.read_as_bytes().unwrap().unwrap(), b"new view");
}

#[test]
fn test_identities_do_not_collide() {
    let root = TempDir::new().unwrap();
    let store = plain_store(root.path());
    let slot = photo_slot(false);

    store.publish_bytes(&slot, b"one", "jpg", "1").unwrap();
    store.publish_bytes(&slot, b"eleven", "jpg", "11").unwrap();

    assert_eq!(
        store.bind(&slot, "1").unwrap().read_as_bytes().unwrap().unwrap(),
        b"one"
    );
    assert_eq!(
        store.bind(&slot, "11").unwrap().read_as_bytes().unwrap().unwrap(),
        b"eleven"
    );
}

#[test]
fn test_foreign_files_are_ignored() {
    let root = TempDir::new().unwrap();
    let store = plain_store(root.path());
    let slot = photo_slot(false);
    let published = store.publish_bytes(&slot, b"real", "jpg", "2").unwrap();

    let regular = store.layout(&slot).regular().clone();
    std::fs::write(regular.join("photo-00000000000002-readme.jpg"), b"junk").unwrap();
    std::fs::write(regular.join("photo-00000000000002-s00-abc"), b"junk").unwrap();

    assert_eq!(store.resolve_current(&slot, "2").unwrap(), Some(published.path));
}

#[test]
fn test_info_and_check_exists() {
    let root = TempDir::new().unwrap();
    let store = plain_store(root.path());
    let slot = photo_slot(false);
    assert_eq!(store.info(&slot, "6").unwrap(), None);
    assert!(!store.check_exists(&slot, "jpg", "6", "anything").unwrap());

    let published = store.publish_bytes(&slot, b"abc", "jpg", "6").unwrap();
    let info = store.info(&slot, "6").unwrap().unwrap();
    assert_eq!(info.path, published.path);
    assert_eq!(info.extension, "jpg");
    assert!(info.exists);
    assert!(!info.encoding_key.is_encrypted());
    assert_eq!(info.size_bytes, 3);

    assert!(store.check_exists(&slot, ".JPG", "6", &info.hash).unwrap());
    assert!(!store.check_exists(&slot, "png", "6", &info.hash).unwrap());
    assert!(!store.check_exists(&slot, "jpg", "6", "0000").unwrap());
}

#[test]
fn test_read_to_pending_hands_over_plaintext() {
    let root = TempDir::new().unwrap();
    let store = keyed_store(root.path(), "secret");
    let slot = photo_slot(true);
    store.publish_bytes(&slot, b"for the client", "png", "77").unwrap();

    let path = store.read_to_pending(&slot, "77").unwrap().unwrap();
    assert!(path.starts_with(store.layout(&slot).pending()));
    assert_eq!(std::fs::read(&path).unwrap(), b"for the client");
    // The caller owns the copy
    std::fs::remove_file(path).unwrap();
}

/// Without an atomic link the check-then-copy placement lets two writers of
/// different content both succeed; resolve still picks one current version
/// and the obsolescence sweep later retires the other.
#[test]
fn test_competing_versions_resolve_to_newest() {
    let root = TempDir::new().unwrap();
    let store = plain_store(root.path());
    let slot = photo_slot(false);

    let a = store.publish_bytes(&slot, b"writer a", "jpg", "30").unwrap();
    let b = store.publish_bytes(&slot, b"writer b", "jpg", "30").unwrap();
    assert_ne!(a.path, b.path);
    age(&a.path, 2);

    assert_eq!(store.resolve_current(&slot, "30").unwrap(), Some(b.path));
    assert_eq!(fsops::list_files(store.layout(&slot).regular()).unwrap().len(), 2);
}

#[test]
fn test_concurrent_publishes_keep_identities_apart() {
    let root = TempDir::new().unwrap();
    let store = keyed_store(root.path(), "secret");
    let slot = photo_slot(true);
    let identities: Vec<String> = (1..=8).map(|n| n.to_string()).collect();

    std::thread::scope(|scope| {
        for identifier in &identities {
            let (store, slot) = (&store, &slot);
            scope.spawn(move || {
                let content = format!("room {}", identifier);
                let published = store
                    .publish_bytes(slot, content.as_bytes(), "jpg", identifier)
                    .unwrap();
                assert_eq!(published.status, PublishStatus::Stored);
            });
        }
    });

    for identifier in &identities {
        let asset = store.bind(&slot, identifier).unwrap();
        assert_eq!(
            asset.read_as_string().unwrap().unwrap(),
            format!("room {}", identifier)
        );
    }
    let layout = store.layout(&slot);
    assert_eq!(fsops::list_files(layout.regular()).unwrap().len(), identities.len());
    assert!(fsops::list_files(layout.pending()).unwrap().is_empty());
}

#[test]
fn test_concurrent_writers_of_one_identity_both_succeed() {
    let root = TempDir::new().unwrap();
    let store = plain_store(root.path());
    let slot = photo_slot(false);

    let (a, b) = std::thread::scope(|scope| {
        let a = scope.spawn(|| store.publish_bytes(&slot, b"writer a", "jpg", "30"));
        let b = scope.spawn(|| store.publish_bytes(&slot, b"writer b", "jpg", "30"));
        (a.join().unwrap().unwrap(), b.join().unwrap().unwrap())
    });
    assert_eq!(a.status, PublishStatus::Stored);
    assert_eq!(b.status, PublishStatus::Stored);

    let current = store.resolve_current(&slot, "30").unwrap().unwrap();
    assert!(current == a.path || current == b.path);
    let content = std::fs::read(&current).unwrap();
    assert!(content == b"writer a" || content == b"writer b");
    assert!(fsops::list_files(store.layout(&slot).pending()).unwrap().is_empty());
}
