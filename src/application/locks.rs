use crate::domain::account::AccountId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-account mutual exclusion for read-modify-write cycles.
///
/// Slots are created lazily and kept for the lifetime of the registry.
#[derive(Default)]
pub struct AccountLocks {
    slots: Mutex<HashMap<AccountId, Arc<AsyncMutex<()>>>>,
}

/// Held for as long as the locked accounts must not change underneath the caller.
#[must_use]
pub struct AccountGuard {
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, id: AccountId) -> Arc<AsyncMutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(id).or_default().clone()
    }

    pub async fn lock(&self, id: AccountId) -> AccountGuard {
        self.lock_all(&[id]).await
    }

    /// Locks every distinct id in ascending order, so two callers locking
    /// overlapping sets cannot deadlock.
    pub async fn lock_all(&self, ids: &[AccountId]) -> AccountGuard {
        let mut ids = ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mut guards = Vec::with_capacity(ids.len());
        for id in ids {
            guards.push(self.slot(id).lock_owned().await);
        }
        AccountGuard { _guards: guards }
    }
}
