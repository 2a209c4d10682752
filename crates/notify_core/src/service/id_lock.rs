//! Per-id mutual exclusion for read-modify-write sequences.
//!
//! # Invariants
//! - Two callers holding the same id never run their closures concurrently.
//! - Distinct ids never contend beyond the short table lookup.
//! - A slot is dropped from the table once no caller references it, also
//!   when the critical section unwinds.

use crate::model::notification::NotificationId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
pub(crate) struct IdLockTable {
    slots: Mutex<HashMap<NotificationId, Arc<Mutex<()>>>>,
}

impl IdLockTable {
    /// Runs `critical` while holding the lock for `id`.
    pub(crate) fn with_lock<T>(&self, id: NotificationId, critical: impl FnOnce() -> T) -> T {
        let release = SlotRelease {
            table: self,
            id,
            slot: Arc::clone(self.slots().entry(id).or_default()),
        };
        // Declared after `release`, so the mutex unlocks before the slot is released.
        let _guard = release.slot.lock().unwrap_or_else(PoisonError::into_inner);
        critical()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots().len()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<NotificationId, Arc<Mutex<()>>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Removes an idle slot from the table when the caller leaves.
struct SlotRelease<'table> {
    table: &'table IdLockTable,
    id: NotificationId,
    slot: Arc<Mutex<()>>,
}

impl Drop for SlotRelease<'_> {
    fn drop(&mut self) {
        let mut slots = self.table.slots();
        // One reference in the table plus ours means nobody else is waiting.
        if Arc::strong_count(&self.slot) == 2 {
            slots.remove(&self.id);
        }
    }
}
