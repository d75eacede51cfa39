//! Slot-based save-state storage for emulator front ends.
//!
//! [`store`] keeps up to nine save slots on disk, each with a raw state blob,
//! an optional WebP preview and JSON metadata. [`session`] remembers which
//! slot was used last during the current run, and [`config`] reads the user's
//! storage settings.

pub mod config;
pub mod session;
pub mod store;

pub use config::Config;
pub use session::{SessionSlotTracker, SlotOperation};
pub use store::{SaveRequest, SaveStateStore, Slot, SlotError, SlotNumber, shared_store};
