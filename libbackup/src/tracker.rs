use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use common::Status;

/// Snapshot of the active backup, if any.
///
/// An empty `id` means no backup is running.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OperationRecord {
    pub id: String,
    pub status: Status,
    pub path: String,
    pub started_at: Option<DateTime<Utc>>,
}

impl OperationRecord {
    pub fn is_active(&self) -> bool {
        !self.id.is_empty()
    }
}

/// Single-slot record of the running backup.
///
/// `renew` is the only way to occupy the slot and `reset` the only way to
/// release it; together they form the at-most-one-backup lock.
#[derive(Debug, Default)]
pub struct Tracker {
    slot: Mutex<OperationRecord>,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, OperationRecord> {
        // a panic while holding the guard leaves the record itself consistent
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Occupies the slot if it is empty and returns `""`, otherwise returns
    /// the id currently holding it without touching anything.
    pub fn renew(&self, id: &str, now: DateTime<Utc>, path: &str) -> String {
        let mut slot = self.lock();
        if slot.is_active() {
            return slot.id.clone();
        }
        *slot = OperationRecord {
            id: id.to_owned(),
            status: Status::Started,
            path: path.to_owned(),
            started_at: Some(now),
        };
        String::new()
    }

    pub fn set(&self, status: Status) {
        let mut slot = self.lock();
        if slot.is_active() {
            slot.status = status;
        }
    }

    pub fn get(&self) -> OperationRecord {
        self.lock().clone()
    }

    pub fn reset(&self) {
        *self.lock() = OperationRecord::default();
    }
}
