//! Configuration enum types.

use serde::{Deserialize, Serialize};

/// Where the save root lives.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StorageMode {
    /// Platform data directory (`$XDG_DATA_HOME/slotsave` on Linux)
    #[default]
    Auto,
    /// Directory named by `storage.custom_directory`
    Custom,
}
