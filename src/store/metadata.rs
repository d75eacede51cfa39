//! `metadata.json` encoding and tolerant decoding.
//!
//! Decoding never fails: a missing or unreadable document collapses to the
//! slot's default record, tagged with a [`MetadataStatus`] so callers that care
//! can tell the cases apart. Encoding always writes every field and carries
//! through keys this version does not know about.

use super::slot::SlotNumber;
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Description written for saves imported from the single-slot layout.
pub const LEGACY_DESCRIPTION: &str = "Migrated from single-slot save system";

/// How the metadata behind a [`super::Slot`] was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataStatus {
    /// The document was present and parsed.
    Parsed,
    /// No document on disk; defaults were synthesized.
    Missing,
    /// The document could not be read or parsed; defaults were synthesized.
    Corrupt(String),
}

/// Decoded contents of `metadata.json`.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotMetadata {
    pub name: String,
    pub timestamp: Option<DateTime<Utc>>,
    /// `timestamp` exactly as read from disk. Written back unchanged while it
    /// still agrees with `timestamp`, so unparsable or non-canonical text
    /// survives field-scoped rewrites.
    pub timestamp_text: Option<String>,
    pub slot_number: u32,
    pub rom_name: String,
    pub play_time: u64,
    pub description: String,
    /// Keys written by other versions, kept verbatim.
    pub extra: Map<String, Value>,
}

impl SlotMetadata {
    /// Minimal record used when nothing usable is on disk.
    pub fn defaults(slot: SlotNumber) -> Self {
        Self {
            name: slot.default_name(),
            timestamp: None,
            timestamp_text: None,
            slot_number: slot.get(),
            rom_name: String::new(),
            play_time: 0,
            description: String::new(),
            extra: Map::new(),
        }
    }

    /// Record for a save made right now.
    pub fn fresh(slot: SlotNumber, name: Option<&str>, rom_name: &str) -> Self {
        Self {
            name: name.map_or_else(|| slot.default_name(), str::to_string),
            timestamp: Some(Utc::now()),
            rom_name: rom_name.to_string(),
            ..Self::defaults(slot)
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetadataFile {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    slot_number: Option<u32>,
    #[serde(default)]
    rom_name: Option<String>,
    #[serde(default)]
    play_time: Option<u64>,
    #[serde(default)]
    description: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Serialise metadata as a pretty-printed JSON document.
pub fn encode(metadata: &SlotMetadata) -> Result<Vec<u8>> {
    let file = MetadataFile {
        name: Some(metadata.name.clone()),
        timestamp: Some(encode_timestamp(metadata)),
        slot_number: Some(metadata.slot_number),
        rom_name: Some(metadata.rom_name.clone()),
        play_time: Some(metadata.play_time),
        description: Some(metadata.description.clone()),
        extra: metadata.extra.clone(),
    };
    serde_json::to_vec_pretty(&file).context("failed to serialise slot metadata")
}

fn encode_timestamp(metadata: &SlotMetadata) -> String {
    let raw = metadata.timestamp_text.as_deref();
    match (metadata.timestamp, raw) {
        (Some(ts), Some(raw)) if parse_timestamp(raw) == Some(ts) => raw.to_string(),
        (Some(ts), _) => ts.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        (None, Some(raw)) if parse_timestamp(raw).is_none() => raw.to_string(),
        (None, _) => String::new(),
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

/// Parse a metadata document, falling back to defaults on any error.
pub fn decode(bytes: &[u8], slot: SlotNumber) -> (SlotMetadata, MetadataStatus) {
    let file: MetadataFile = match serde_json::from_slice(bytes) {
        Ok(file) => file,
        Err(err) => {
            warn!("Metadata for slot {slot} is corrupt, using defaults: {err}");
            return (
                SlotMetadata::defaults(slot),
                MetadataStatus::Corrupt(err.to_string()),
            );
        }
    };

    let timestamp_text = file.timestamp.filter(|raw| !raw.is_empty());
    let timestamp = timestamp_text.as_deref().and_then(|raw| {
        let parsed = parse_timestamp(raw);
        if parsed.is_none() {
            debug!("Ignoring unparsable timestamp '{raw}' for slot {slot}");
        }
        parsed
    });

    let metadata = SlotMetadata {
        name: file.name.unwrap_or_else(|| slot.default_name()),
        timestamp,
        timestamp_text,
        slot_number: file.slot_number.unwrap_or(slot.get()),
        rom_name: file.rom_name.unwrap_or_default(),
        play_time: file.play_time.unwrap_or(0),
        description: file.description.unwrap_or_default(),
        extra: file.extra,
    };
    (metadata, MetadataStatus::Parsed)
}

/// Read and decode the document at `path`.
pub fn read_metadata(path: &Path, slot: SlotNumber) -> (SlotMetadata, MetadataStatus) {
    match fs::read(path) {
        Ok(bytes) => decode(&bytes, slot),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            (SlotMetadata::defaults(slot), MetadataStatus::Missing)
        }
        Err(err) => {
            warn!(
                "Failed to read metadata {} for slot {slot}: {err}",
                path.display()
            );
            (
                SlotMetadata::defaults(slot),
                MetadataStatus::Corrupt(err.to_string()),
            )
        }
    }
}

pub fn write_metadata(path: &Path, metadata: &SlotMetadata) -> Result<()> {
    let bytes = encode(metadata)?;
    fs::write(path, bytes)
        .with_context(|| format!("failed to write metadata {}", path.display()))
}
