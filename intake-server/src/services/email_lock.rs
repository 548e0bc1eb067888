//! Per-email submission lock
//!
//! Serialises submissions sharing a tab and normalised email so the existence
//! check and the append run as one step within this process.

use intake_common::category::normalize_email;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockTable = HashMap<String, Arc<AsyncMutex<()>>>;

/// Keyed async locks, one per (tab, email) in flight
#[derive(Clone, Default)]
pub struct EmailLocks {
    table: Arc<Mutex<LockTable>>,
}

impl EmailLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other submission holds `(sheet_name, email)`.
    pub async fn acquire(&self, sheet_name: &str, email: &str) -> EmailLockGuard {
        let key = format!("{}\n{}", sheet_name, normalize_email(email));
        let entry = self.lock_table().entry(key.clone()).or_default().clone();

        // Cleans up if this future is dropped while still waiting
        let mut waiting = Waiting {
            key: key.clone(),
            locks: self.clone(),
            done: false,
        };
        let guard = entry.lock_owned().await;
        waiting.done = true;

        EmailLockGuard {
            key,
            locks: self.clone(),
            _guard: guard,
        }
    }

    /// Number of keys currently held or awaited
    pub fn len(&self) -> usize {
        self.lock_table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock_table(&self) -> MutexGuard<'_, LockTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drop the entry for `key` once at most `held` references remain
    fn release_if_idle(&self, key: &str, held: usize) {
        let mut table = self.lock_table();
        let idle = table
            .get(key)
            .map(|entry| Arc::strong_count(entry) <= held)
            .unwrap_or(false);
        if idle {
            table.remove(key);
        }
    }
}

/// An `acquire` still waiting for its lock
struct Waiting {
    key: String,
    locks: EmailLocks,
    done: bool,
}

impl Drop for Waiting {
    fn drop(&mut self) {
        if !self.done {
            // Only the table is left once the pending lock future is gone
            self.locks.release_if_idle(&self.key, 1);
        }
    }
}

/// Held for the duration of one submission
pub struct EmailLockGuard {
    key: String,
    locks: EmailLocks,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for EmailLockGuard {
    fn drop(&mut self) {
        // The table and this guard hold the only references when nobody waits
        self.locks.release_if_idle(&self.key, 2);
    }
}
