//! Import of the single-slot save file used by older releases.

use super::layout::{Displaced, METADATA_FILE, STATE_FILE, SlotLayout};
use super::metadata::{self, LEGACY_DESCRIPTION, SlotMetadata};
use super::slot::SlotNumber;
use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::fs;
use std::path::Path;

/// What a migration run did (or, for a dry run, would do).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// No legacy file, or it was empty.
    NoLegacyState,
    /// Slot 1 already holds a save; the legacy file was left untouched.
    SlotOccupied,
    /// The legacy file exceeds the state size limit and was left untouched.
    TooLarge { bytes: u64, limit: u64 },
    /// Dry run: the legacy file would be imported.
    WouldMigrate { bytes: u64 },
    /// The legacy file was imported into slot 1 and removed.
    Migrated { bytes: u64 },
    /// Import failed; the legacy file is still in place.
    Failed(String),
}

/// Copy the legacy state file into slot 1 if that slot is free.
///
/// Safe to call on every start: once the legacy file is gone this is a no-op.
/// Errors are logged and reported through [`MigrationOutcome::Failed`].
pub fn migrate_legacy_state(
    layout: &SlotLayout,
    max_state_bytes: u64,
    dry_run: bool,
) -> MigrationOutcome {
    let legacy_path = layout.legacy_state_path();
    let bytes = match fs::metadata(&legacy_path) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => meta.len(),
        _ => return MigrationOutcome::NoLegacyState,
    };

    let slot = SlotNumber::FIRST;
    if layout.has_state(slot) {
        debug!("Slot 1 already has a save, skipping legacy migration");
        return MigrationOutcome::SlotOccupied;
    }

    if bytes > max_state_bytes {
        warn!(
            "Legacy save state {} is {} bytes which exceeds the configured limit ({} bytes); leaving it in place",
            legacy_path.display(),
            bytes,
            max_state_bytes
        );
        return MigrationOutcome::TooLarge {
            bytes,
            limit: max_state_bytes,
        };
    }

    if dry_run {
        return MigrationOutcome::WouldMigrate { bytes };
    }

    info!(
        "Migrating legacy save state {} to slot 1",
        legacy_path.display()
    );
    match import_into_slot(layout, slot) {
        Ok(()) => {
            if let Err(err) = fs::remove_file(&legacy_path) {
                // Slot 1 is now occupied, so the next run reports SlotOccupied.
                error!(
                    "Legacy save migrated but {} could not be removed: {}",
                    legacy_path.display(),
                    err
                );
            }
            info!("Legacy save state migrated to slot 1 ({bytes} bytes)");
            MigrationOutcome::Migrated { bytes }
        }
        Err(err) => {
            error!("Failed to migrate legacy save state: {err:#}");
            MigrationOutcome::Failed(format!("{err:#}"))
        }
    }
}

fn import_into_slot(layout: &SlotLayout, slot: SlotNumber) -> Result<()> {
    let staging = layout.fresh_staging_dir(slot)?;
    let result = stage_legacy(layout, slot, &staging)
        .and_then(|()| layout.commit_staged(slot, &staging).map(Displaced::finish));

    if result.is_err() && staging.exists() {
        fs::remove_dir_all(&staging).ok();
    }
    result
}

fn stage_legacy(layout: &SlotLayout, slot: SlotNumber, staging: &Path) -> Result<()> {
    let legacy_path = layout.legacy_state_path();
    fs::copy(&legacy_path, staging.join(STATE_FILE))
        .with_context(|| format!("failed to copy legacy state {}", legacy_path.display()))?;

    let record = SlotMetadata {
        name: format!("{} (Legacy)", slot.default_name()),
        description: LEGACY_DESCRIPTION.to_string(),
        ..SlotMetadata::fresh(slot, None, "")
    };
    metadata::write_metadata(&staging.join(METADATA_FILE), &record)
}
