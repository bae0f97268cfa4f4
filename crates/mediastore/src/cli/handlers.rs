//! Command handlers.

use super::commands::OutputFormat;
use mediastore::{
    LocalMediaBridge, MediaStoreConfig, MediaStoreResult, RemoteMediaBridge, SlotRef,
    StoreError, StoreErrorKind, fsops,
};
use std::path::Path;
use std::sync::Arc;

fn open_bridge(config: &MediaStoreConfig) -> MediaStoreResult<LocalMediaBridge> {
    let store = config.open_store()?;
    let slots = config.slot_registry()?;
    Ok(LocalMediaBridge::new(Arc::new(store), Arc::new(slots)))
}

/// Run every sweep over the slots this role stores.
pub fn clean(
    config: &MediaStoreConfig,
    pending_days: Option<i64>,
    deleted_days: Option<i64>,
    obsolete_days: Option<i64>,
) -> MediaStoreResult<()> {
    let store = config.open_store()?;
    let slots = config.slot_registry()?;
    let defaults = config.retention();
    let retention = defaults
        .with_pending_days(pending_days.unwrap_or(*defaults.pending_days()))
        .with_deleted_days(deleted_days.unwrap_or(*defaults.deleted_days()))
        .with_obsolete_days(obsolete_days.unwrap_or(*defaults.obsolete_days()));

    let report = store.clean_all_slots(&slots, &retention);
    println!(
        "Swept {} slots: {} obsolete moved, {} pending deleted, {} deleted purged, {} failed",
        report.slots, report.moved, report.pending_deleted, report.deleted_purged, report.failures
    );
    if report.failures > 0 {
        return Err(StoreError::io(format!("{} slot sweeps failed", report.failures)).into());
    }
    Ok(())
}

/// Publish a local file.
pub async fn publish(
    config: &MediaStoreConfig,
    group: &str,
    name: &str,
    file: &Path,
    id: &str,
) -> MediaStoreResult<()> {
    let bridge = open_bridge(config)?;
    let slot = SlotRef::new(group, name);
    let status = bridge.upload(&slot, file, id).await?;
    println!("{} {} {}", slot, id, status);
    Ok(())
}

/// Print what is known about the current version.
pub fn info(
    config: &MediaStoreConfig,
    group: &str,
    name: &str,
    id: &str,
    format: OutputFormat,
) -> MediaStoreResult<()> {
    let store = config.open_store()?;
    let slot = config.slot_registry()?.require(group, name)?;
    let Some(info) = store.info(&slot, id)? else {
        println!("{}/{} {}: nothing stored", group, name, id);
        return Ok(());
    };
    let modified = chrono::DateTime::<chrono::Local>::from(info.modified).to_rfc3339();

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "path": info.path.display().to_string(),
                "extension": info.extension,
                "exists": info.exists,
                "hash": info.hash,
                "encoding_key": info.encoding_key.to_string(),
                "encrypted": info.encoding_key.is_encrypted(),
                "modified": modified,
                "size_bytes": info.size_bytes,
            });
            println!("{:#}", json);
        }
        OutputFormat::Human => {
            println!("Path:         {}", info.path.display());
            println!("Extension:    {}", info.extension);
            println!("Exists:       {}", info.exists);
            println!("Hash:         {}", info.hash);
            println!("Encoding key: {}", info.encoding_key);
            println!("Modified:     {}", modified);
            println!("Size:         {} bytes", info.size_bytes);
        }
    }
    Ok(())
}

/// Write the plaintext of the current version to `out`.
pub async fn read(
    config: &MediaStoreConfig,
    group: &str,
    name: &str,
    id: &str,
    out: &Path,
) -> MediaStoreResult<()> {
    let bridge = open_bridge(config)?;
    let slot = SlotRef::new(group, name);
    let Some(working) = bridge.read(&slot, id).await? else {
        return Err(StoreError::new(StoreErrorKind::NotFound(format!("{} {}", slot, id))).into());
    };
    let copied = fsops::copy(&working, out);
    fsops::remove_logged(&working);
    let bytes = copied?;
    println!("Wrote {} bytes to {}", bytes, out.display());
    Ok(())
}
