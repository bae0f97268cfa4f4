//! Age-based garbage collection.
//!
//! Three independent sweeps run per slot:
//! - pending: delete working copies older than the window
//! - deleted: purge files retired earlier, once older than the window
//! - obsolescence: move every superseded regular file older than the window
//!   into `deleted`; the newest version of an identity is never moved

use crate::naming::{self, NameField};
use crate::{MediaSlotSpec, MediaStore, SlotRegistry, fsops};
use mediastore_error::StoreResult;
use std::collections::BTreeSet;
use std::path::Path;
use std::time::{Duration, SystemTime};

const SECONDS_PER_DAY: u64 = 86_400;

/// Clamp a configured retention to at least one day.
pub fn clamp_days(days_to_keep: i64) -> u64 {
    days_to_keep.max(1) as u64
}

fn cutoff(days_to_keep: i64) -> SystemTime {
    let window = Duration::from_secs(clamp_days(days_to_keep).saturating_mul(SECONDS_PER_DAY));
    SystemTime::now()
        .checked_sub(window)
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

/// Retention windows, in days, for the three sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_getters::Getters, derive_setters::Setters)]
#[setters(prefix = "with_")]
pub struct Retention {
    /// Days pending working copies are kept
    pending_days: i64,
    /// Days retired files are kept before purge
    deleted_days: i64,
    /// Days superseded versions stay in the regular directory
    obsolete_days: i64,
}

impl Retention {
    /// Retention with explicit windows; values below one day are clamped when used.
    pub fn new(pending_days: i64, deleted_days: i64, obsolete_days: i64) -> Self {
        Self {
            pending_days,
            deleted_days,
            obsolete_days,
        }
    }
}

impl Default for Retention {
    fn default() -> Self {
        Self::new(1, 30, 7)
    }
}

/// Totals of a [`MediaStore::clean_all_slots`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    /// Slots swept without error
    pub slots: usize,
    /// Superseded files moved into `deleted`
    pub moved: usize,
    /// Pending working copies deleted
    pub pending_deleted: usize,
    /// Retired files purged from `deleted`
    pub deleted_purged: usize,
    /// Slots whose sweep failed
    pub failures: usize,
}

fn delete_older_than(dir: &Path, days_to_keep: i64) -> StoreResult<usize> {
    let cutoff = cutoff(days_to_keep);
    let mut deleted = 0;
    for path in fsops::list_files(dir)? {
        let modified = match fsops::modified(&path) {
            Ok(modified) => modified,
            Err(e) if e.is_not_found() => continue,
            Err(e) => return Err(e),
        };
        if modified < cutoff {
            fsops::remove(&path)?;
            tracing::debug!(path = %path.display(), "Deleted aged file");
            deleted += 1;
        }
    }
    Ok(deleted)
}

impl MediaStore {
    /// Delete pending working copies older than `days_to_keep` days.
    #[tracing::instrument(skip(self, slot), fields(slot = %slot.alias()))]
    pub fn clean_pending(&self, slot: &MediaSlotSpec, days_to_keep: i64) -> StoreResult<usize> {
        let deleted = delete_older_than(self.layout(slot).pending(), days_to_keep)?;
        tracing::info!(deleted, "Cleaned pending directory");
        Ok(deleted)
    }

    /// Purge retired files older than `days_to_keep` days.
    #[tracing::instrument(skip(self, slot), fields(slot = %slot.alias()))]
    pub fn clean_deleted(&self, slot: &MediaSlotSpec, days_to_keep: i64) -> StoreResult<usize> {
        let purged = delete_older_than(self.layout(slot).deleted(), days_to_keep)?;
        tracing::info!(purged, "Cleaned deleted directory");
        Ok(purged)
    }

    /// Move superseded versions older than `days_to_keep` days into `deleted`.
    ///
    /// The newest version of every identity stays regardless of its age, so
    /// the regular file count drops by exactly the number of files moved.
    #[tracing::instrument(skip(self, slot), fields(slot = %slot.alias()))]
    pub fn clean_obsolete(&self, slot: &MediaSlotSpec, days_to_keep: i64) -> StoreResult<usize> {
        let layout = self.layout(slot);
        let cutoff = cutoff(days_to_keep);

        let identifiers: BTreeSet<String> = fsops::list_files(layout.regular())?
            .iter()
            .filter(|path| {
                naming::decode_field(path, NameField::Alias).as_deref() == Some(slot.alias().as_str())
            })
            .filter_map(|path| naming::decode_field(path, NameField::Identifier))
            .collect();

        let mut moved = 0;
        for identifier in identifiers {
            let mut versions = self.versions(slot, &identifier)?;
            if versions.len() < 2 {
                continue;
            }
            versions.sort_by(|(a_path, a_time), (b_path, b_time)| {
                a_time.cmp(b_time).then_with(|| a_path.cmp(b_path))
            });
            // Last entry is the current version
            versions.pop();
            for (path, modified) in versions {
                if modified >= cutoff {
                    continue;
                }
                fsops::ensure_dir(layout.deleted())?;
                let target = layout.deleted().join(naming::deleted_name(&path));
                fsops::move_file(&path, &target)?;
                tracing::debug!(from = %path.display(), to = %target.display(), "Retired obsolete version");
                moved += 1;
            }
        }
        tracing::info!(moved, "Cleaned obsolete versions");
        Ok(moved)
    }

    fn clean_slot(&self, slot: &MediaSlotSpec, retention: &Retention, report: &mut CleanReport) -> StoreResult<()> {
        let moved = self.clean_obsolete(slot, *retention.obsolete_days())?;
        let pending = self.clean_pending(slot, *retention.pending_days())?;
        let purged = self.clean_deleted(slot, *retention.deleted_days())?;
        report.moved += moved;
        report.pending_deleted += pending;
        report.deleted_purged += purged;
        Ok(())
    }

    /// Run all three sweeps over every slot this role stores.
    ///
    /// A failing slot is logged and skipped; the run continues with the next.
    #[tracing::instrument(skip(self, slots, retention), fields(slots = slots.len()))]
    pub fn clean_all_slots(&self, slots: &SlotRegistry, retention: &Retention) -> CleanReport {
        let role = *self.settings().role();
        let mut report = CleanReport::default();
        for slot in slots.iter() {
            if !slot.storage_location().is_stored_by(role) {
                continue;
            }
            match self.clean_slot(slot, retention, &mut report) {
                Ok(()) => report.slots += 1,
                Err(e) => {
                    report.failures += 1;
                    tracing::error!(
                        group = %slot.group(),
                        name = %slot.name(),
                        error = %e,
                        "Media sweep failed for slot"
                    );
                }
            }
        }
        tracing::info!(
            slots = report.slots,
            moved = report.moved,
            pending_deleted = report.pending_deleted,
            deleted_purged = report.deleted_purged,
            failures = report.failures,
            "Finished media sweep"
        );
        report
    }
}
