//! Slot identity and the per-slot view returned to callers.

use super::metadata::{MetadataStatus, SlotMetadata};
use chrono::{DateTime, Local, Utc};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Number of addressable save slots.
pub const TOTAL_SLOTS: u32 = 9;

/// Contract violations reported by the store and the session tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SlotError {
    #[error("slot number must be between 1 and {max}, got {0}", max = TOTAL_SLOTS)]
    OutOfRange(u32),

    #[error("source and target slots must be different (both {0})")]
    SameSlot(u32),
}

/// A validated slot number in `1..=TOTAL_SLOTS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotNumber(u32);

impl SlotNumber {
    pub const FIRST: SlotNumber = SlotNumber(1);

    pub fn new(raw: u32) -> Result<Self, SlotError> {
        if (1..=TOTAL_SLOTS).contains(&raw) {
            Ok(Self(raw))
        } else {
            Err(SlotError::OutOfRange(raw))
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// All slots in ascending order.
    pub fn all() -> impl Iterator<Item = SlotNumber> {
        (1..=TOTAL_SLOTS).map(SlotNumber)
    }

    pub(crate) fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    /// Label used when a slot has no user-supplied name.
    pub fn default_name(self) -> String {
        format!("Slot {}", self.0)
    }
}

impl TryFrom<u32> for SlotNumber {
    type Error = SlotError;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl fmt::Display for SlotNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Snapshot of one slot as seen on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub slot_number: SlotNumber,
    pub name: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub source_title: String,
    pub play_time_seconds: u64,
    pub description: String,
    pub state_path: Option<PathBuf>,
    pub screenshot_path: Option<PathBuf>,
    pub is_empty: bool,
    pub metadata_status: MetadataStatus,
}

impl Slot {
    /// Representation of a slot without a state blob.
    pub fn empty(slot_number: SlotNumber) -> Self {
        Self {
            slot_number,
            name: slot_number.default_name(),
            timestamp: None,
            source_title: String::new(),
            play_time_seconds: 0,
            description: String::new(),
            state_path: None,
            screenshot_path: None,
            is_empty: true,
            metadata_status: MetadataStatus::Missing,
        }
    }

    pub(crate) fn occupied(
        slot_number: SlotNumber,
        metadata: SlotMetadata,
        status: MetadataStatus,
        state_path: PathBuf,
        screenshot_path: Option<PathBuf>,
    ) -> Self {
        // The directory identity wins over whatever slotNumber the document carries.
        Self {
            slot_number,
            name: metadata.name,
            timestamp: metadata.timestamp,
            source_title: metadata.rom_name,
            play_time_seconds: metadata.play_time,
            description: metadata.description,
            state_path: Some(state_path),
            screenshot_path,
            is_empty: false,
            metadata_status: status,
        }
    }

    pub fn display_name(&self) -> &str {
        if self.is_empty { "Empty" } else { &self.name }
    }

    /// Save time in local time as `dd/mm/YYYY HH:MM`, or an empty string.
    pub fn formatted_timestamp(&self) -> String {
        self.timestamp
            .map(|ts| ts.with_timezone(&Local).format("%d/%m/%Y %H:%M").to_string())
            .unwrap_or_default()
    }

    pub fn formatted_play_time(&self) -> String {
        format_play_time(self.play_time_seconds)
    }

    pub fn has_screenshot(&self) -> bool {
        self.screenshot_path
            .as_ref()
            .is_some_and(|path| path.exists())
    }
}

fn format_play_time(seconds: u64) -> String {
    if seconds == 0 {
        return String::new();
    }
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    match (hours, minutes) {
        (0, 0) => "<1m".to_string(),
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}
