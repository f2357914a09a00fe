// src/generation.rs
//! Latest-request-wins bookkeeping for work that completes out of order,
//! plus per-key locks for the writes that follow it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Handed out when a request starts; redeemed when its response arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    key: String,
    generation: u64,
}

#[derive(Debug, Default)]
struct Generations {
    issued: u64,
    latest: HashMap<String, u64>,
}

impl Generations {
    fn next(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }
}

/// Tracks the newest request per key. A response may only be applied while
/// its ticket is still the newest one issued for that key.
///
/// Generations come from one counter shared by all keys, so a ticket never
/// matches again once its key has been retired or forgotten.
#[derive(Debug, Default)]
pub struct GenerationGuard {
    state: Mutex<Generations>,
}

impl GenerationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self, key: &str) -> Ticket {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let generation = state.next();
        state.latest.insert(key.to_string(), generation);
        Ticket {
            key: key.to_string(),
            generation,
        }
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.latest.get(&ticket.key) == Some(&ticket.generation)
    }

    /// Invalidate every outstanding ticket for a key.
    pub fn retire(&self, key: &str) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.latest.contains_key(key) {
            let generation = state.next();
            state.latest.insert(key.to_string(), generation);
        }
    }

    /// Drop a key for good. Outstanding tickets stop being current.
    pub fn forget(&self, key: &str) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.latest.remove(key);
    }

    #[cfg(test)]
    pub(crate) fn tracked_keys(&self) -> usize {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.latest.len()
    }
}

/// Async mutual exclusion per key. An entry lives only while some task
/// holds or waits for it.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// Held for the duration of a keyed critical section.
pub struct KeyGuard<'a> {
    owner: &'a KeyedLocks,
    key: String,
    _held: OwnedMutexGuard<()>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: &str) -> KeyGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.entry(key.to_string()).or_default().clone()
        };
        KeyGuard {
            owner: self,
            key: key.to_string(),
            _held: lock.lock_owned().await,
        }
    }

    #[cfg(test)]
    pub(crate) fn live_keys(&self) -> usize {
        let locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.len()
    }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        let mut locks = self.owner.locks.lock().unwrap_or_else(|e| e.into_inner());
        // the map and this guard hold the only references: no waiters left
        if locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) <= 2)
        {
            locks.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn newer_ticket_supersedes_older() {
        let guard = GenerationGuard::new();
        let first = guard.begin("h1");
        let second = guard.begin("h1");
        assert!(!guard.is_current(&first));
        assert!(guard.is_current(&second));
    }

    #[test]
    fn keys_are_independent() {
        let guard = GenerationGuard::new();
        let a = guard.begin("h1");
        let b = guard.begin("h2");
        assert!(guard.is_current(&a));
        assert!(guard.is_current(&b));
    }

    #[test]
    fn retired_key_invalidates_tickets() {
        let guard = GenerationGuard::new();
        let ticket = guard.begin("h1");
        guard.retire("h1");
        assert!(!guard.is_current(&ticket));
        assert!(guard.is_current(&guard.begin("h1")));
    }

    #[test]
    fn forgotten_key_is_dropped_and_old_tickets_stay_stale() {
        let guard = GenerationGuard::new();
        let old = guard.begin("h1");
        guard.forget("h1");
        assert_eq!(guard.tracked_keys(), 0);
        assert!(!guard.is_current(&old));

        let fresh = guard.begin("h1");
        assert!(guard.is_current(&fresh));
        assert!(!guard.is_current(&old));
    }

    #[test]
    fn retiring_unknown_key_tracks_nothing() {
        let guard = GenerationGuard::new();
        guard.retire("ghost");
        assert_eq!(guard.tracked_keys(), 0);
    }

    #[tokio::test]
    async fn keyed_lock_serialises_same_key() {
        let locks = Arc::new(KeyedLocks::new());
        let first = locks.lock("h1").await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _second = locks.lock("h1").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        // other keys are not blocked
        drop(locks.lock("h2").await);

        drop(first);
        contender.await.unwrap();
        assert_eq!(locks.live_keys(), 0);
    }
}
