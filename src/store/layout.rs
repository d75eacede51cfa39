//! On-disk layout of the slot directories.
//!
//! ```text
//! <root>/
//!   saves/
//!     slot_<n>/{state.bin, screenshot.webp, metadata.json}
//!     .staging-slot_<n>/   new contents being assembled
//!     .trash-slot_<n>/     contents displaced by a write, restorable
//!     .deleted-slot_<n>/   contents of a removed slot, never restored
//!   state                  single-slot blob from older releases
//! ```

use super::slot::SlotNumber;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const SAVES_DIR: &str = "saves";
pub const STATE_FILE: &str = "state.bin";
pub const SCREENSHOT_FILE: &str = "screenshot.webp";
pub const METADATA_FILE: &str = "metadata.json";
pub const LEGACY_STATE_FILE: &str = "state";

const STAGING_PREFIX: &str = ".staging-";
const TRASH_PREFIX: &str = ".trash-";
const DELETED_PREFIX: &str = ".deleted-";
const TEMP_SUFFIX: &str = "tmp";

#[derive(Debug, Clone)]
pub struct SlotLayout {
    root: PathBuf,
    saves_dir: PathBuf,
}

impl SlotLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let saves_dir = root.join(SAVES_DIR);
        Self { root, saves_dir }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn slot_dir(&self, slot: SlotNumber) -> PathBuf {
        self.saves_dir.join(slot_dir_name(slot))
    }

    pub fn state_path(&self, slot: SlotNumber) -> PathBuf {
        self.slot_dir(slot).join(STATE_FILE)
    }

    pub fn screenshot_path(&self, slot: SlotNumber) -> PathBuf {
        self.slot_dir(slot).join(SCREENSHOT_FILE)
    }

    pub fn metadata_path(&self, slot: SlotNumber) -> PathBuf {
        self.slot_dir(slot).join(METADATA_FILE)
    }

    pub fn legacy_state_path(&self) -> PathBuf {
        self.root.join(LEGACY_STATE_FILE)
    }

    pub fn staging_dir(&self, slot: SlotNumber) -> PathBuf {
        self.saves_dir
            .join(format!("{STAGING_PREFIX}{}", slot_dir_name(slot)))
    }

    pub fn trash_dir(&self, slot: SlotNumber) -> PathBuf {
        self.saves_dir
            .join(format!("{TRASH_PREFIX}{}", slot_dir_name(slot)))
    }

    pub fn deleted_dir(&self, slot: SlotNumber) -> PathBuf {
        self.saves_dir
            .join(format!("{DELETED_PREFIX}{}", slot_dir_name(slot)))
    }

    pub fn has_state(&self, slot: SlotNumber) -> bool {
        self.state_path(slot).is_file()
    }

    pub fn ensure_saves_dir(&self) -> Result<()> {
        if !self.saves_dir.exists() {
            fs::create_dir_all(&self.saves_dir).with_context(|| {
                format!(
                    "failed to create saves directory {}",
                    self.saves_dir.display()
                )
            })?;
            debug!("Created saves directory {}", self.saves_dir.display());
        }
        Ok(())
    }

    /// Undo the effects of a swap that was interrupted part-way.
    ///
    /// A trash directory whose slot directory is missing holds the last good
    /// contents of an unfinished write and is moved back. Removed slots stay
    /// removed, and every other leftover is discarded.
    pub fn recover_interrupted(&self) {
        for slot in SlotNumber::all() {
            let slot_dir = self.slot_dir(slot);
            let trash_dir = self.trash_dir(slot);
            let staging_dir = self.staging_dir(slot);
            let deleted_dir = self.deleted_dir(slot);

            if deleted_dir.exists() {
                debug!("Discarding contents of removed slot {slot}");
                remove_dir_logged(&deleted_dir);
            }

            if trash_dir.exists() {
                if slot_dir.exists() {
                    remove_dir_logged(&trash_dir);
                } else {
                    match fs::rename(&trash_dir, &slot_dir) {
                        Ok(()) => info!("Restored slot {slot} from an interrupted write"),
                        Err(err) => warn!(
                            "failed to restore {} -> {}: {}",
                            trash_dir.display(),
                            slot_dir.display(),
                            err
                        ),
                    }
                }
            }

            if staging_dir.exists() {
                remove_dir_logged(&staging_dir);
            }
        }
    }

    /// Create an empty staging directory for `slot`, clearing any leftover.
    pub fn fresh_staging_dir(&self, slot: SlotNumber) -> Result<PathBuf> {
        let staging = self.staging_dir(slot);
        if staging.exists() {
            fs::remove_dir_all(&staging).with_context(|| {
                format!("failed to clear staging directory {}", staging.display())
            })?;
        }
        fs::create_dir_all(&staging).with_context(|| {
            format!("failed to create staging directory {}", staging.display())
        })?;
        Ok(staging)
    }

    /// Swap a fully written staging directory into `slot`'s place.
    ///
    /// The previous contents stay parked in the trash directory until the
    /// returned [`Displaced`] is finished or rolled back.
    pub fn commit_staged(&self, slot: SlotNumber, staging: &Path) -> Result<Displaced> {
        let slot_dir = self.slot_dir(slot);
        let displaced = self.park_in(slot, self.trash_dir(slot))?;

        if let Err(err) = fs::rename(staging, &slot_dir) {
            displaced.rollback(self);
            return Err(err).with_context(|| {
                format!(
                    "failed to move {} -> {}",
                    staging.display(),
                    slot_dir.display()
                )
            });
        }

        Ok(displaced)
    }

    /// Empty `slot` by moving its directory (if any) to the deleted location.
    ///
    /// Until the returned [`Displaced`] is finished the contents can still be
    /// rolled back in-process; after a crash they are discarded at open.
    pub fn remove(&self, slot: SlotNumber) -> Result<Displaced> {
        self.park_in(slot, self.deleted_dir(slot))
    }

    fn park_in(&self, slot: SlotNumber, trash: PathBuf) -> Result<Displaced> {
        let slot_dir = self.slot_dir(slot);

        if trash.exists() {
            fs::remove_dir_all(&trash)
                .with_context(|| format!("failed to clear {}", trash.display()))?;
        }

        if !slot_dir.exists() {
            return Ok(Displaced { slot, parked: None });
        }

        fs::rename(&slot_dir, &trash).with_context(|| {
            format!(
                "failed to move {} -> {}",
                slot_dir.display(),
                trash.display()
            )
        })?;
        Ok(Displaced {
            slot,
            parked: Some(trash),
        })
    }
}

/// Previous contents of a slot, held until a multi-step change settles.
#[derive(Debug)]
#[must_use]
pub struct Displaced {
    slot: SlotNumber,
    parked: Option<PathBuf>,
}

impl Displaced {
    /// Drop the previous contents for good.
    pub fn finish(self) {
        if let Some(parked) = &self.parked {
            remove_dir_logged(parked);
        }
    }

    /// Put the previous contents back, discarding whatever replaced them.
    pub fn rollback(self, layout: &SlotLayout) -> bool {
        let slot_dir = layout.slot_dir(self.slot);
        if slot_dir.exists()
            && let Err(err) = fs::remove_dir_all(&slot_dir)
        {
            warn!(
                "failed to discard {} during rollback: {}",
                slot_dir.display(),
                err
            );
            return false;
        }

        let Some(parked) = &self.parked else {
            return true;
        };
        match fs::rename(parked, &slot_dir) {
            Ok(()) => true,
            Err(err) => {
                // Left in place; recover_interrupted picks it up on next open.
                warn!(
                    "failed to restore {} -> {}: {}",
                    parked.display(),
                    slot_dir.display(),
                    err
                );
                false
            }
        }
    }
}

/// Write `bytes` to a new file at `path` and flush it to disk.
pub fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    file.write_all(bytes)
        .with_context(|| format!("failed to write {}", path.display()))?;
    file.sync_all()
        .with_context(|| format!("failed to sync {}", path.display()))
}

/// Replace the file at `path` through a temporary sibling and a rename.
pub fn replace_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = temp_path(path);
    if tmp.exists() {
        fs::remove_file(&tmp).ok();
    }
    if let Err(err) = write_file(&tmp, bytes) {
        fs::remove_file(&tmp).ok();
        return Err(err);
    }
    fs::rename(&tmp, path).with_context(|| {
        format!(
            "failed to move temporary file {} -> {}",
            tmp.display(),
            path.display()
        )
    })
}

pub fn is_temp_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == TEMP_SUFFIX)
}

fn temp_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(TEMP_SUFFIX);
    target.with_file_name(name)
}

fn slot_dir_name(slot: SlotNumber) -> String {
    format!("slot_{}", slot.get())
}

fn remove_dir_logged(path: &Path) {
    if let Err(err) = fs::remove_dir_all(path) {
        warn!("failed to remove {}: {}", path.display(), err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(raw: u32) -> SlotNumber {
        SlotNumber::new(raw).unwrap()
    }

    #[test]
    fn paths_follow_slot_convention() {
        let layout = SlotLayout::new("/data/app");
        assert_eq!(
            layout.state_path(slot(3)),
            PathBuf::from("/data/app/saves/slot_3/state.bin")
        );
        assert_eq!(
            layout.screenshot_path(slot(3)),
            PathBuf::from("/data/app/saves/slot_3/screenshot.webp")
        );
        assert_eq!(
            layout.metadata_path(slot(9)),
            PathBuf::from("/data/app/saves/slot_9/metadata.json")
        );
        assert_eq!(layout.legacy_state_path(), PathBuf::from("/data/app/state"));
    }

    #[test]
    fn commit_replaces_previous_contents() {
        let temp = tempfile::tempdir().unwrap();
        let layout = SlotLayout::new(temp.path());
        layout.ensure_saves_dir().unwrap();

        fs::create_dir_all(layout.slot_dir(slot(1))).unwrap();
        fs::write(layout.state_path(slot(1)), b"old").unwrap();

        let staging = layout.fresh_staging_dir(slot(1)).unwrap();
        fs::write(staging.join(STATE_FILE), b"new").unwrap();
        layout.commit_staged(slot(1), &staging).unwrap().finish();

        assert_eq!(fs::read(layout.state_path(slot(1))).unwrap(), b"new");
        assert!(!layout.trash_dir(slot(1)).exists());
        assert!(!layout.staging_dir(slot(1)).exists());
    }

    #[test]
    fn rollback_restores_previous_contents() {
        let temp = tempfile::tempdir().unwrap();
        let layout = SlotLayout::new(temp.path());
        layout.ensure_saves_dir().unwrap();

        fs::create_dir_all(layout.slot_dir(slot(2))).unwrap();
        fs::write(layout.state_path(slot(2)), b"old").unwrap();

        let staging = layout.fresh_staging_dir(slot(2)).unwrap();
        fs::write(staging.join(STATE_FILE), b"new").unwrap();
        let displaced = layout.commit_staged(slot(2), &staging).unwrap();
        assert!(displaced.rollback(&layout));

        assert_eq!(fs::read(layout.state_path(slot(2))).unwrap(), b"old");
    }

    #[test]
    fn replace_file_overwrites_without_leaving_temp() {
        let temp = tempfile::tempdir().unwrap();
        let target = temp.path().join("metadata.json");
        fs::write(&target, b"old").unwrap();

        replace_file(&target, b"new").unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"new");
        assert!(!temp.path().join("metadata.json.tmp").exists());
        assert!(is_temp_file(Path::new("metadata.json.tmp")));
        assert!(!is_temp_file(&target));
    }

    #[test]
    fn recovery_restores_orphaned_trash() {
        let temp = tempfile::tempdir().unwrap();
        let layout = SlotLayout::new(temp.path());
        layout.ensure_saves_dir().unwrap();

        let trash = layout.trash_dir(slot(5));
        fs::create_dir_all(&trash).unwrap();
        fs::write(trash.join(STATE_FILE), b"survivor").unwrap();
        fs::create_dir_all(layout.staging_dir(slot(5))).unwrap();

        layout.recover_interrupted();

        assert_eq!(fs::read(layout.state_path(slot(5))).unwrap(), b"survivor");
        assert!(!trash.exists());
        assert!(!layout.staging_dir(slot(5)).exists());
    }

    #[test]
    fn recovery_never_restores_removed_slot() {
        let temp = tempfile::tempdir().unwrap();
        let layout = SlotLayout::new(temp.path());
        layout.ensure_saves_dir().unwrap();

        fs::create_dir_all(layout.slot_dir(slot(3))).unwrap();
        fs::write(layout.state_path(slot(3)), b"gone").unwrap();
        let _interrupted = layout.remove(slot(3)).unwrap();
        assert!(layout.deleted_dir(slot(3)).exists());

        layout.recover_interrupted();

        assert!(!layout.slot_dir(slot(3)).exists());
        assert!(!layout.deleted_dir(slot(3)).exists());
    }

    #[test]
    fn recovery_discards_trash_when_slot_present() {
        let temp = tempfile::tempdir().unwrap();
        let layout = SlotLayout::new(temp.path());
        layout.ensure_saves_dir().unwrap();

        fs::create_dir_all(layout.slot_dir(slot(4))).unwrap();
        fs::write(layout.state_path(slot(4)), b"current").unwrap();
        fs::create_dir_all(layout.trash_dir(slot(4))).unwrap();

        layout.recover_interrupted();

        assert_eq!(fs::read(layout.state_path(slot(4))).unwrap(), b"current");
        assert!(!layout.trash_dir(slot(4)).exists());
    }
}
