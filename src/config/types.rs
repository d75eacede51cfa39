//! Configuration type definitions.

use super::enums::StorageMode;
use serde::{Deserialize, Serialize};

/// Save root and size limits.
#[derive(Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Where saves are stored (auto or custom)
    #[serde(default)]
    pub mode: StorageMode,

    /// Save root used when `mode = "custom"`; `~/` is expanded
    #[serde(default)]
    pub custom_directory: Option<String>,

    /// Largest state blob accepted on save or load, in MiB (valid range: 1 - 1024)
    #[serde(default = "default_max_state_size_mb")]
    pub max_state_size_mb: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            mode: StorageMode::default(),
            custom_directory: None,
            max_state_size_mb: default_max_state_size_mb(),
        }
    }
}

/// Preview image settings.
#[derive(Debug, Serialize, Deserialize)]
pub struct ScreenshotConfig {
    /// Write `screenshot.webp` when the caller supplies a preview
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for ScreenshotConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

/// Legacy single-slot import.
#[derive(Debug, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Import `<root>/state` into slot 1 when the store opens
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
        }
    }
}

fn default_max_state_size_mb() -> u64 {
    64
}

fn default_true() -> bool {
    true
}
