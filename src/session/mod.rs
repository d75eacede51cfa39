//! In-memory record of the slot most recently saved to or loaded from.
//!
//! Front ends use it to pre-select a slot in their menus. Nothing here touches
//! disk; the context lives for the process and is gone on restart.

use crate::store::{SlotError, SlotNumber};
use log::debug;
use std::fmt;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

/// Kind of the last recorded slot operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotOperation {
    Save,
    Load,
}

impl fmt::Display for SlotOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotOperation::Save => f.write_str("save"),
            SlotOperation::Load => f.write_str("load"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SlotContext {
    slot: SlotNumber,
    operation: SlotOperation,
}

#[derive(Debug, Default)]
pub struct SessionSlotTracker {
    context: Mutex<Option<SlotContext>>,
}

impl SessionSlotTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide tracker.
    pub fn global() -> &'static SessionSlotTracker {
        static GLOBAL: OnceLock<SessionSlotTracker> = OnceLock::new();
        GLOBAL.get_or_init(SessionSlotTracker::new)
    }

    pub fn record_save(&self, slot: u32) -> Result<(), SlotError> {
        self.record(slot, SlotOperation::Save)
    }

    pub fn record_load(&self, slot: u32) -> Result<(), SlotError> {
        self.record(slot, SlotOperation::Load)
    }

    pub fn last_used_slot(&self) -> Option<SlotNumber> {
        self.context().map(|ctx| ctx.slot)
    }

    pub fn last_operation(&self) -> Option<SlotOperation> {
        self.context().map(|ctx| ctx.operation)
    }

    pub fn has_slot_context(&self) -> bool {
        self.context().is_some()
    }

    pub fn clear(&self) {
        *self.lock() = None;
        debug!("Session slot context cleared");
    }

    fn record(&self, slot: u32, operation: SlotOperation) -> Result<(), SlotError> {
        let slot = SlotNumber::new(slot)?;
        *self.lock() = Some(SlotContext { slot, operation });
        debug!("Session slot context: {operation} on slot {slot}");
        Ok(())
    }

    fn context(&self) -> Option<SlotContext> {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, Option<SlotContext>> {
        self.context.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests;
