//! Slot-based save-state store.
//!
//! Each of the nine slots maps to `saves/slot_<n>/` under the store root and
//! holds an opaque state blob, an optional WebP preview and a JSON metadata
//! document. Slot numbers outside `1..=9` are contract violations and are
//! rejected with [`SlotError`]; I/O problems never escape the store and are
//! reported as `false` / `None` after being logged.
//!
//! Every mutation assembles the new slot contents in a staging directory and
//! swaps it into place with renames, so a failed write leaves the previous
//! contents intact. Operations on the same slot are serialised by a per-slot
//! mutex.

mod layout;
mod metadata;
mod migration;
mod options;
mod screenshot;
mod slot;

pub use layout::{LEGACY_STATE_FILE, METADATA_FILE, SAVES_DIR, SCREENSHOT_FILE, STATE_FILE};
pub use metadata::{LEGACY_DESCRIPTION, MetadataStatus, SlotMetadata};
pub use migration::MigrationOutcome;
pub use options::{DEFAULT_MAX_STATE_BYTES, StoreOptions, options_from_config};
pub use screenshot::Screenshot;
pub use slot::{Slot, SlotError, SlotNumber, TOTAL_SLOTS};

use anyhow::{Context, Result, bail};
use layout::{Displaced, SlotLayout};
use log::{debug, error, info, warn};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Everything the caller hands over when saving to a slot.
#[derive(Debug, Clone, Default)]
pub struct SaveRequest {
    pub state: Vec<u8>,
    pub screenshot: Option<Screenshot>,
    /// Display name; `"Slot <n>"` when absent.
    pub name: Option<String>,
    /// Identifier of the emulated content (stored as `romName`).
    pub source_title: String,
}

impl SaveRequest {
    pub fn new(state: impl Into<Vec<u8>>) -> Self {
        Self {
            state: state.into(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_source_title(mut self, title: impl Into<String>) -> Self {
        self.source_title = title.into();
        self
    }

    pub fn with_screenshot(mut self, screenshot: Screenshot) -> Self {
        self.screenshot = Some(screenshot);
        self
    }
}

pub struct SaveStateStore {
    layout: SlotLayout,
    options: StoreOptions,
    locks: [Mutex<()>; TOTAL_SLOTS as usize],
}

impl SaveStateStore {
    /// Open the store rooted at `options.root`.
    ///
    /// Creates `saves/` if needed, repairs interrupted writes and, unless
    /// disabled, imports the legacy single-slot save. Only failure to create
    /// the saves directory is reported as an error.
    pub fn open(options: StoreOptions) -> Result<Self> {
        let layout = SlotLayout::new(&options.root);
        layout.ensure_saves_dir()?;
        layout.recover_interrupted();

        if options.migrate_legacy {
            match migration::migrate_legacy_state(&layout, options.max_state_bytes, false) {
                MigrationOutcome::NoLegacyState => {}
                outcome => debug!("Legacy migration at open: {outcome:?}"),
            }
        }

        Ok(Self {
            layout,
            options,
            locks: std::array::from_fn(|_| Mutex::new(())),
        })
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    /// All slots in order, occupied or empty.
    pub fn list_slots(&self) -> Vec<Slot> {
        SlotNumber::all().map(|slot| self.read_slot(slot)).collect()
    }

    pub fn get_slot(&self, slot: u32) -> Result<Slot, SlotError> {
        let slot = SlotNumber::new(slot)?;
        Ok(self.read_slot(slot))
    }

    /// Write `request` to `slot`, replacing whatever was there.
    ///
    /// Returns `Ok(false)` on I/O failure; the previous contents are then intact.
    pub fn save_to_slot(&self, slot: u32, request: SaveRequest) -> Result<bool, SlotError> {
        let slot = SlotNumber::new(slot)?;
        let _guard = self.lock(slot);

        match self.write_slot(slot, &request) {
            Ok(()) => {
                info!(
                    "Save state written to slot {} ({} bytes)",
                    slot,
                    request.state.len()
                );
                Ok(true)
            }
            Err(err) => {
                error!("Failed to save state to slot {slot}: {err:#}");
                Ok(false)
            }
        }
    }

    /// Raw state blob of `slot`, or `None` when empty or unreadable.
    pub fn load_from_slot(&self, slot: u32) -> Result<Option<Vec<u8>>, SlotError> {
        let slot = SlotNumber::new(slot)?;
        let _guard = self.lock(slot);

        let state_path = self.layout.state_path(slot);
        let len = match fs::metadata(&state_path) {
            Ok(meta) if meta.is_file() => meta.len(),
            _ => {
                debug!("Slot {slot} is empty");
                return Ok(None);
            }
        };
        if len > self.options.max_state_bytes {
            warn!(
                "State blob for slot {} is {} bytes which exceeds the configured limit ({} bytes); refusing to load",
                slot, len, self.options.max_state_bytes
            );
            return Ok(None);
        }

        match fs::read(&state_path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) => {
                error!("Failed to load state from slot {slot}: {err}");
                Ok(None)
            }
        }
    }

    /// Remove everything stored in `slot`. Deleting an empty slot succeeds.
    pub fn delete_slot(&self, slot: u32) -> Result<bool, SlotError> {
        let slot = SlotNumber::new(slot)?;
        let _guard = self.lock(slot);

        match self.layout.remove(slot) {
            Ok(displaced) => {
                displaced.finish();
                debug!("Slot {slot} deleted");
                Ok(true)
            }
            Err(err) => {
                error!("Failed to delete slot {slot}: {err:#}");
                Ok(false)
            }
        }
    }

    /// Replace `target` with a duplicate of `source`.
    pub fn copy_slot(&self, source: u32, target: u32) -> Result<bool, SlotError> {
        let (source, target) = distinct_pair(source, target)?;
        let _guards = self.lock_pair(source, target);

        if !self.layout.has_state(source) {
            warn!("Source slot {source} is empty");
            return Ok(false);
        }

        match self.copy_into(source, target) {
            Ok(displaced) => {
                displaced.finish();
                debug!("Slot {source} copied to slot {target}");
                Ok(true)
            }
            Err(err) => {
                error!("Failed to copy slot {source} to {target}: {err:#}");
                Ok(false)
            }
        }
    }

    /// Copy `source` to `target`, then empty `source`.
    ///
    /// If `source` cannot be removed after the copy, `target` is restored to
    /// its previous contents and the move reports failure.
    pub fn move_slot(&self, source: u32, target: u32) -> Result<bool, SlotError> {
        let (source, target) = distinct_pair(source, target)?;
        let _guards = self.lock_pair(source, target);

        if !self.layout.has_state(source) {
            warn!("Source slot {source} is empty");
            return Ok(false);
        }

        let displaced_target = match self.copy_into(source, target) {
            Ok(displaced) => displaced,
            Err(err) => {
                error!("Failed to move slot {source} to {target}: {err:#}");
                return Ok(false);
            }
        };

        match self.layout.remove(source) {
            Ok(displaced_source) => {
                displaced_source.finish();
                displaced_target.finish();
                debug!("Slot {source} moved to slot {target}");
                Ok(true)
            }
            Err(err) => {
                error!("Failed to clear slot {source} after copying it to {target}: {err:#}");
                if !displaced_target.rollback(&self.layout) {
                    error!("Slot {target} could not be restored; it now duplicates slot {source}");
                }
                Ok(false)
            }
        }
    }

    /// Change the display name of `slot`, keeping every other metadata field.
    pub fn rename_slot(&self, slot: u32, new_name: &str) -> Result<bool, SlotError> {
        let slot = SlotNumber::new(slot)?;
        let _guard = self.lock(slot);

        let metadata_path = self.layout.metadata_path(slot);
        if !metadata_path.is_file() {
            warn!("Slot {slot} has no metadata");
            return Ok(false);
        }

        let (mut record, status) = metadata::read_metadata(&metadata_path, slot);
        if let MetadataStatus::Corrupt(reason) = status {
            error!("Failed to rename slot {slot}: metadata unreadable ({reason})");
            return Ok(false);
        }

        record.name = new_name.to_string();
        match metadata::encode(&record).and_then(|bytes| layout::replace_file(&metadata_path, &bytes)) {
            Ok(()) => {
                debug!("Slot {slot} renamed to '{new_name}'");
                Ok(true)
            }
            Err(err) => {
                error!("Failed to rename slot {slot}: {err:#}");
                Ok(false)
            }
        }
    }

    /// Replace the preview of an occupied slot.
    pub fn update_screenshot(&self, slot: u32, screenshot: &Screenshot) -> Result<bool, SlotError> {
        let slot = SlotNumber::new(slot)?;
        let _guard = self.lock(slot);

        if !self.layout.has_state(slot) {
            warn!("Slot {slot} does not exist");
            return Ok(false);
        }

        let result = screenshot.to_webp().and_then(|bytes| {
            layout::replace_file(&self.layout.screenshot_path(slot), &bytes)
        });
        match result {
            Ok(()) => {
                debug!("Screenshot updated for slot {slot}");
                Ok(true)
            }
            Err(err) => {
                error!("Failed to update screenshot for slot {slot}: {err:#}");
                Ok(false)
            }
        }
    }

    pub fn has_any_save(&self) -> bool {
        self.list_slots().iter().any(|slot| !slot.is_empty)
    }

    pub fn first_empty_slot(&self) -> Option<SlotNumber> {
        self.list_slots()
            .into_iter()
            .find(|slot| slot.is_empty)
            .map(|slot| slot.slot_number)
    }

    pub fn occupied_slot_count(&self) -> usize {
        self.list_slots()
            .iter()
            .filter(|slot| !slot.is_empty)
            .count()
    }

    /// Run the legacy import on demand (it also runs at open when enabled).
    pub fn migrate_legacy(&self, dry_run: bool) -> MigrationOutcome {
        let _guard = self.lock(SlotNumber::FIRST);
        migration::migrate_legacy_state(&self.layout, self.options.max_state_bytes, dry_run)
    }

    fn lock(&self, slot: SlotNumber) -> MutexGuard<'_, ()> {
        // The guarded value is (), so a poisoned lock carries no broken state.
        self.locks[slot.index()]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_pair(&self, a: SlotNumber, b: SlotNumber) -> [MutexGuard<'_, ()>; 2] {
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        [self.lock(low), self.lock(high)]
    }

    fn read_slot(&self, slot: SlotNumber) -> Slot {
        let _guard = self.lock(slot);

        let state_path = self.layout.state_path(slot);
        if !state_path.is_file() {
            return Slot::empty(slot);
        }

        let (record, status) = metadata::read_metadata(&self.layout.metadata_path(slot), slot);
        let screenshot_path = self.layout.screenshot_path(slot);
        let screenshot_path = screenshot_path.is_file().then_some(screenshot_path);
        Slot::occupied(slot, record, status, state_path, screenshot_path)
    }

    fn write_slot(&self, slot: SlotNumber, request: &SaveRequest) -> Result<()> {
        let size = request.state.len() as u64;
        if size > self.options.max_state_bytes {
            bail!(
                "state blob of {} bytes exceeds the configured limit of {} bytes",
                size,
                self.options.max_state_bytes
            );
        }

        self.stage_and_commit(slot, |staging| {
            layout::write_file(&staging.join(STATE_FILE), &request.state)?;

            if let Some(screenshot) = &request.screenshot {
                if self.options.write_screenshots {
                    match screenshot.to_webp() {
                        Ok(bytes) => layout::write_file(&staging.join(SCREENSHOT_FILE), &bytes)?,
                        Err(err) => warn!("Skipping screenshot for slot {slot}: {err:#}"),
                    }
                } else {
                    debug!("Screenshots disabled; not writing preview for slot {slot}");
                }
            }

            let record = SlotMetadata::fresh(slot, request.name.as_deref(), &request.source_title);
            layout::write_file(&staging.join(METADATA_FILE), &metadata::encode(&record)?)
        })
        .map(Displaced::finish)
    }

    fn copy_into(&self, source: SlotNumber, target: SlotNumber) -> Result<Displaced> {
        let source_dir = self.layout.slot_dir(source);

        self.stage_and_commit(target, |staging| {
            let entries = fs::read_dir(&source_dir)
                .with_context(|| format!("failed to list {}", source_dir.display()))?;
            for entry in entries {
                let entry = entry?;
                let path = entry.path();
                if !entry.file_type()?.is_file() || layout::is_temp_file(&path) {
                    continue;
                }
                let dest = staging.join(entry.file_name());
                fs::copy(&path, &dest).with_context(|| {
                    format!("failed to copy {} to {}", path.display(), dest.display())
                })?;
            }

            // Missing or unreadable metadata is carried over verbatim; readers
            // synthesize defaults from the directory's slot number either way.
            let metadata_path = staging.join(METADATA_FILE);
            if let (mut record, MetadataStatus::Parsed) =
                metadata::read_metadata(&metadata_path, target)
            {
                record.slot_number = target.get();
                layout::replace_file(&metadata_path, &metadata::encode(&record)?)?;
            }
            Ok(())
        })
    }

    /// Fill a fresh staging directory with `fill` and swap it into `slot`.
    fn stage_and_commit(
        &self,
        slot: SlotNumber,
        fill: impl FnOnce(&Path) -> Result<()>,
    ) -> Result<Displaced> {
        let staging = self.layout.fresh_staging_dir(slot)?;
        let result = fill(staging.as_path()).and_then(|()| self.layout.commit_staged(slot, &staging));
        if result.is_err() && staging.exists() {
            fs::remove_dir_all(&staging).ok();
        }
        result
    }
}

fn distinct_pair(source: u32, target: u32) -> Result<(SlotNumber, SlotNumber), SlotError> {
    let source = SlotNumber::new(source)?;
    let target = SlotNumber::new(target)?;
    if source == target {
        return Err(SlotError::SameSlot(source.get()));
    }
    Ok((source, target))
}

static SHARED_STORE: Mutex<Option<Arc<SaveStateStore>>> = Mutex::new(None);

/// Process-wide store, opened on first use.
///
/// Later calls return the same instance; their `options` are ignored.
pub fn shared_store(options: &StoreOptions) -> Result<Arc<SaveStateStore>> {
    let mut shared = SHARED_STORE
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

    if let Some(store) = shared.as_ref() {
        if store.root() != options.root {
            warn!(
                "Shared store already open at {}; ignoring request for {}",
                store.root().display(),
                options.root.display()
            );
        }
        return Ok(Arc::clone(store));
    }

    let store = Arc::new(SaveStateStore::open(options.clone())?);
    *shared = Some(Arc::clone(&store));
    Ok(store)
}
