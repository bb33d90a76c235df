//! # Keyed lock
//!
//! Process-local mutual exclusion per string key. At most one [`LockGuard`] exists for a key
//! at any time; waiters queue in FIFO order and do not occupy a thread while waiting.
//!
//! Keys are released when their guard is dropped, on every exit path. Map entries are removed
//! once no holder or waiter refers to them. A leaked guard (`mem::forget`) keeps its key until
//! the process exits.

mod error;

pub use error::LockError;

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, warn};

type Entries = Arc<Mutex<HashMap<String, Arc<Entry>>>>;

struct Entry {
    gate: Arc<AsyncMutex<()>>,
    owner: Mutex<Option<String>>,
    /// Holders plus waiters. Only changed while the map is locked.
    refs: AtomicUsize,
}

impl Entry {
    fn set_owner(&self, owner: Option<String>) {
        *self
            .owner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = owner;
    }

    fn owner(&self) -> Option<String> {
        self.owner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

/// Registry of keyed locks. Clones share the same keys.
#[derive(Default, Clone)]
pub struct LockManager {
    entries: Entries,
}

/// Counted reference to a map entry; dropped when the holder releases or a waiter gives up.
struct Registration {
    entries: Entries,
    key: String,
    entry: Arc<Entry>,
}

impl Drop for Registration {
    fn drop(&mut self) {
        let mut map = lock_map(&self.entries);
        if self.entry.refs.fetch_sub(1, Ordering::SeqCst) == 1 {
            if let Some(current) = map.get(&self.key) {
                if Arc::ptr_eq(current, &self.entry) {
                    map.remove(&self.key);
                }
            }
        }
    }
}

/// Proof of holding a key. Dropping it releases the key.
pub struct LockGuard {
    owner: String,
    // Field order matters: the gate opens before the registration is given back.
    _permit: OwnedMutexGuard<()>,
    registration: Registration,
}

impl LockGuard {
    pub fn key(&self) -> &str {
        &self.registration.key
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.registration.entry.set_owner(None);
        debug!(key = %self.registration.key, owner = %self.owner, "Released lock");
    }
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard")
            .field("key", &self.key())
            .field("owner", &self.owner)
            .finish()
    }
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, key: &str) -> Registration {
        let mut map = lock_map(&self.entries);
        let entry = map
            .entry(key.to_string())
            .or_insert_with(|| {
                Arc::new(Entry {
                    gate: Arc::new(AsyncMutex::new(())),
                    owner: Mutex::new(None),
                    refs: AtomicUsize::new(0),
                })
            })
            .clone();
        entry.refs.fetch_add(1, Ordering::SeqCst);
        Registration {
            entries: self.entries.clone(),
            key: key.to_string(),
            entry,
        }
    }

    fn hold(registration: Registration, permit: OwnedMutexGuard<()>, owner: &str) -> LockGuard {
        registration.entry.set_owner(Some(owner.to_string()));
        debug!(key = %registration.key, owner = %owner, "Acquired lock");
        LockGuard {
            owner: owner.to_string(),
            _permit: permit,
            registration,
        }
    }

    /// Waits until `key` is free, then holds it for `owner`.
    pub async fn acquire(&self, key: &str, owner: &str) -> LockGuard {
        let registration = self.register(key);
        let permit = registration.entry.gate.clone().lock_owned().await;
        Self::hold(registration, permit, owner)
    }

    /// Like [`acquire`](Self::acquire) but gives up after `timeout`.
    pub async fn acquire_timeout(
        &self,
        key: &str,
        owner: &str,
        timeout: Duration,
    ) -> Result<LockGuard, LockError> {
        let registration = self.register(key);
        let gate = registration.entry.gate.clone();
        match tokio::time::timeout(timeout, gate.lock_owned()).await {
            Ok(permit) => Ok(Self::hold(registration, permit, owner)),
            Err(_) => {
                warn!(
                    key = %key,
                    owner = %owner,
                    holder = ?registration.entry.owner(),
                    "Timed out waiting for lock"
                );
                Err(LockError::Timeout {
                    key: key.to_string(),
                    waited: timeout,
                })
            }
        }
    }

    /// Holds `key` only if it is free right now.
    pub fn try_acquire(&self, key: &str, owner: &str) -> Option<LockGuard> {
        let registration = self.register(key);
        let permit = registration.entry.gate.clone().try_lock_owned().ok()?;
        Some(Self::hold(registration, permit, owner))
    }

    /// Runs `fut` while holding `key`; released when `fut` completes, panics or is dropped.
    pub async fn with_lock<F, T>(&self, key: &str, owner: &str, fut: F) -> T
    where
        F: Future<Output = T>,
    {
        let _guard = self.acquire(key, owner).await;
        fut.await
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.owner(key).is_some()
    }

    /// Owner of `key` while it is held.
    pub fn owner(&self, key: &str) -> Option<String> {
        let entry = lock_map(&self.entries).get(key).cloned()?;
        entry.owner()
    }

    /// Keys currently held, sorted.
    pub fn held_keys(&self) -> Vec<String> {
        let map = lock_map(&self.entries);
        let mut keys: Vec<String> = map
            .iter()
            .filter(|(_, entry)| entry.owner().is_some())
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Number of keys with a holder or waiters.
    pub fn tracked_keys(&self) -> usize {
        lock_map(&self.entries).len()
    }
}

fn lock_map(entries: &Entries) -> MutexGuard<'_, HashMap<String, Arc<Entry>>> {
    entries
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
