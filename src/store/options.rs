use crate::config::{Config, StorageMode};
use anyhow::{Context, Result, anyhow};
use std::path::{Path, PathBuf};

pub const DEFAULT_MAX_STATE_BYTES: u64 = 64 * 1024 * 1024; // 64 MiB

/// Runtime options for a [`super::SaveStateStore`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Application-private root; `saves/` and the legacy `state` file live here.
    pub root: PathBuf,
    pub max_state_bytes: u64,
    pub write_screenshots: bool,
    pub migrate_legacy: bool,
}

impl StoreOptions {
    /// Options with defaults rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_state_bytes: DEFAULT_MAX_STATE_BYTES,
            write_screenshots: true,
            migrate_legacy: true,
        }
    }
}

/// Build runtime store options from configuration values.
///
/// `root_override` takes precedence over the configured storage mode.
pub fn options_from_config(config: &Config, root_override: Option<&Path>) -> Result<StoreOptions> {
    let root = match root_override {
        Some(root) => root.to_path_buf(),
        None => match config.storage.mode {
            StorageMode::Auto => dirs::data_dir()
                .context("Could not find data directory")?
                .join("slotsave"),
            StorageMode::Custom => {
                let raw = config.storage.custom_directory.as_ref().ok_or_else(|| {
                    anyhow!("storage.custom_directory must be set when mode = \"custom\"")
                })?;
                let expanded = expand_tilde(raw);
                if expanded.as_os_str().is_empty() {
                    return Err(anyhow!(
                        "storage.custom_directory resolved to an empty path"
                    ));
                }
                expanded
            }
        },
    };

    let mut options = StoreOptions::new(root);
    options.max_state_bytes = config
        .storage
        .max_state_size_mb
        .saturating_mul(1024 * 1024)
        .max(1);
    options.write_screenshots = config.screenshots.enabled;
    options.migrate_legacy = config.migration.enabled;
    Ok(options)
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(stripped);
    }
    PathBuf::from(path)
}
