use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

type Slot = Arc<Mutex<()>>;

/// Mutual exclusion keyed by user id. Work for one user runs one at a time;
/// different users never wait on each other beyond the brief map lookup.
#[derive(Debug, Default)]
pub struct UserLocks {
    slots: Mutex<HashMap<i64, Slot>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` while holding the lock for `user_id`.
    pub fn with_user<T>(&self, user_id: i64, f: impl FnOnce() -> T) -> T {
        let held = HeldSlot {
            locks: self,
            user_id,
            slot: self.acquire_slot(user_id),
        };
        let _guard = held.slot.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    /// Users that currently hold or wait for their lock.
    pub fn tracked_users(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn acquire_slot(&self, user_id: i64) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(user_id).or_default().clone()
    }

    fn release_slot(&self, user_id: i64, slot: &Slot) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one here: nobody else is queued.
        if Arc::strong_count(slot) == 2 {
            slots.remove(&user_id);
        }
    }
}

/// Releases the map entry on drop, so a panicking closure cannot leak it.
struct HeldSlot<'a> {
    locks: &'a UserLocks,
    user_id: i64,
    slot: Slot,
}

impl Drop for HeldSlot<'_> {
    fn drop(&mut self) {
        self.locks.release_slot(self.user_id, &self.slot);
    }
}
