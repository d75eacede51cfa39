use super::*;
use crate::store::TOTAL_SLOTS;

#[test]
fn starts_without_context() {
    let tracker = SessionSlotTracker::new();
    assert!(!tracker.has_slot_context());
    assert_eq!(tracker.last_used_slot(), None);
    assert_eq!(tracker.last_operation(), None);
}

#[test]
fn record_save_sets_context() {
    let tracker = SessionSlotTracker::new();
    tracker.record_save(3).unwrap();

    assert!(tracker.has_slot_context());
    assert_eq!(tracker.last_used_slot().map(SlotNumber::get), Some(3));
    assert_eq!(tracker.last_operation(), Some(SlotOperation::Save));
}

#[test]
fn latest_record_wins() {
    let tracker = SessionSlotTracker::new();
    tracker.record_save(1).unwrap();
    tracker.record_load(7).unwrap();

    assert_eq!(tracker.last_used_slot().map(SlotNumber::get), Some(7));
    assert_eq!(tracker.last_operation(), Some(SlotOperation::Load));

    tracker.record_save(2).unwrap();
    assert_eq!(tracker.last_used_slot().map(SlotNumber::get), Some(2));
    assert_eq!(tracker.last_operation(), Some(SlotOperation::Save));
}

#[test]
fn clear_drops_context() {
    let tracker = SessionSlotTracker::new();
    tracker.record_load(5).unwrap();
    tracker.clear();

    assert!(!tracker.has_slot_context());
    assert_eq!(tracker.last_used_slot(), None);
    assert_eq!(tracker.last_operation(), None);
}

#[test]
fn invalid_slots_leave_context_untouched() {
    let tracker = SessionSlotTracker::new();
    tracker.record_save(4).unwrap();

    assert_eq!(tracker.record_save(0), Err(SlotError::OutOfRange(0)));
    assert_eq!(
        tracker.record_load(TOTAL_SLOTS + 1),
        Err(SlotError::OutOfRange(TOTAL_SLOTS + 1))
    );
    assert_eq!(tracker.last_used_slot().map(SlotNumber::get), Some(4));
    assert_eq!(tracker.last_operation(), Some(SlotOperation::Save));
}

#[test]
fn every_valid_slot_is_accepted() {
    let tracker = SessionSlotTracker::new();
    for slot in 1..=TOTAL_SLOTS {
        tracker.record_load(slot).unwrap();
        assert_eq!(tracker.last_used_slot().map(SlotNumber::get), Some(slot));
    }
}

#[test]
fn global_is_a_single_instance() {
    assert!(std::ptr::eq(
        SessionSlotTracker::global(),
        SessionSlotTracker::global()
    ));
}
