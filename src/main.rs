use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use slotsave::config::Config;
use slotsave::store::{
    self, MetadataStatus, MigrationOutcome, SaveRequest, SaveStateStore, Slot,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "slotsave")]
#[command(version, about = "Inspect and maintain emulator save-state slots")]
struct Cli {
    /// Save root to use instead of the configured storage location
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Read configuration from FILE instead of ~/.config/slotsave/config.toml
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all slots
    List,
    /// Show details of one slot
    Show { slot: u32 },
    /// Delete everything stored in a slot
    Delete { slot: u32 },
    /// Copy a slot over another one
    Copy { source: u32, target: u32 },
    /// Move a slot to another one, leaving the source empty
    Move { source: u32, target: u32 },
    /// Change the display name of a slot
    Rename { slot: u32, name: String },
    /// Save the contents of FILE into a slot
    Import {
        slot: u32,
        file: PathBuf,
        /// Display name for the new save
        #[arg(long)]
        name: Option<String>,
    },
    /// Write the state blob of a slot to FILE
    Export { slot: u32, file: PathBuf },
    /// Import the legacy single-slot save into slot 1
    Migrate {
        /// Show what would happen without touching any files
        #[arg(long, action = ArgAction::SetTrue)]
        dry_run: bool,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    // Explicit migrate runs report their own outcome, so skip the silent one at open.
    let migrate_at_open = !matches!(cli.command, Command::Migrate { .. });
    let store = open_store(cli.root.as_deref(), cli.config.as_deref(), migrate_at_open)?;
    log::debug!("Using save root {}", store.root().display());

    match cli.command {
        Command::List => {
            for slot in store.list_slots() {
                println!("{}", list_line(&slot));
            }
        }
        Command::Show { slot } => {
            let slot = store.get_slot(slot)?;
            print_details(&slot);
        }
        Command::Delete { slot } => {
            if !store.delete_slot(slot)? {
                bail!("Failed to delete slot {slot}");
            }
            println!("Deleted slot {slot}");
        }
        Command::Copy { source, target } => {
            if !store.copy_slot(source, target)? {
                bail!("Failed to copy slot {source} to slot {target}");
            }
            println!("Copied slot {source} to slot {target}");
        }
        Command::Move { source, target } => {
            if !store.move_slot(source, target)? {
                bail!("Failed to move slot {source} to slot {target}");
            }
            println!("Moved slot {source} to slot {target}");
        }
        Command::Rename { slot, name } => {
            if !store.rename_slot(slot, &name)? {
                bail!("Failed to rename slot {slot}");
            }
            println!("Renamed slot {slot} to '{name}'");
        }
        Command::Import { slot, file, name } => {
            let state = fs::read(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let size = state.len();
            let mut request = SaveRequest::new(state);
            if let Some(name) = name {
                request = request.with_name(name);
            }
            if !store.save_to_slot(slot, request)? {
                bail!("Failed to import {} into slot {slot}", file.display());
            }
            println!("Imported {size} bytes into slot {slot}");
        }
        Command::Export { slot, file } => {
            let Some(state) = store.load_from_slot(slot)? else {
                bail!("Slot {slot} is empty");
            };
            fs::write(&file, &state)
                .with_context(|| format!("Failed to write {}", file.display()))?;
            println!("Exported {} bytes from slot {slot} to {}", state.len(), file.display());
        }
        Command::Migrate { dry_run } => match store.migrate_legacy(dry_run) {
            MigrationOutcome::NoLegacyState => println!("No legacy save state found"),
            MigrationOutcome::SlotOccupied => {
                println!("Slot 1 already holds a save; legacy state left in place")
            }
            MigrationOutcome::TooLarge { bytes, limit } => bail!(
                "Legacy save state is {bytes} bytes, over the {limit} byte limit; left in place"
            ),
            MigrationOutcome::WouldMigrate { bytes } => {
                println!("Dry-run: would migrate {bytes} bytes into slot 1")
            }
            MigrationOutcome::Migrated { bytes } => {
                println!("Migrated {bytes} bytes into slot 1")
            }
            MigrationOutcome::Failed(reason) => bail!("Legacy migration failed: {reason}"),
        },
    }

    Ok(())
}

fn open_store(
    root: Option<&Path>,
    config_path: Option<&Path>,
    migrate_at_open: bool,
) -> Result<SaveStateStore> {
    let config = match config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let mut options = store::options_from_config(&config, root)?;
    options.migrate_legacy &= migrate_at_open;
    SaveStateStore::open(options)
}

fn list_line(slot: &Slot) -> String {
    if slot.is_empty {
        return format!("{:>2}  Empty", slot.slot_number.get());
    }
    format!(
        "{:>2}  {:<24} {:<16} {}",
        slot.slot_number.get(),
        slot.display_name(),
        slot.formatted_timestamp(),
        slot.formatted_play_time()
    )
    .trim_end()
    .to_string()
}

fn print_details(slot: &Slot) {
    println!("Slot:        {}", slot.slot_number);
    if slot.is_empty {
        println!("Status:      empty");
        return;
    }
    println!("Name:        {}", slot.name);
    println!("Saved:       {}", slot.formatted_timestamp());
    if !slot.source_title.is_empty() {
        println!("Game:        {}", slot.source_title);
    }
    println!("Play time:   {}", slot.formatted_play_time());
    if !slot.description.is_empty() {
        println!("Description: {}", slot.description);
    }
    if let Some(path) = &slot.state_path {
        let size = fs::metadata(path).map(|meta| meta.len()).unwrap_or(0);
        println!("State:       {} ({} bytes)", path.display(), size);
    }
    match &slot.screenshot_path {
        Some(path) => println!("Screenshot:  {}", path.display()),
        None => println!("Screenshot:  none"),
    }
    match &slot.metadata_status {
        MetadataStatus::Parsed => {}
        MetadataStatus::Missing => println!("Metadata:    missing, showing defaults"),
        MetadataStatus::Corrupt(reason) => {
            println!("Metadata:    unreadable ({reason}), showing defaults")
        }
    }
}
