//! Server-side cache of per-session Galois keys.
//!
//! A client sends its key bundle with the first request of a session; later
//! requests carry only the session id. The store is consulted once per
//! request and never held across homomorphic evaluation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::linpir::GaloisKeyBundle;

/// Session identifier chosen by the client
pub type SessionId = u64;

/// Evaluation keys of one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKeys {
    bundle: GaloisKeyBundle,
}

impl SessionKeys {
    pub fn new(bundle: GaloisKeyBundle) -> Self {
        Self { bundle }
    }

    pub fn bundle(&self) -> &GaloisKeyBundle {
        &self.bundle
    }
}

/// Storage for session keys, shared by concurrent request handlers
pub trait SessionStore: Send + Sync {
    /// Keys of `session_id`, refreshing its recency
    fn get(&self, session_id: SessionId) -> Option<Arc<SessionKeys>>;

    /// Insert or replace the keys of `session_id`
    fn insert(&self, session_id: SessionId, keys: Arc<SessionKeys>);

    /// Drop the keys of `session_id`; returns whether they were present
    fn evict(&self, session_id: SessionId) -> bool;

    /// Drop every cached session
    fn clear(&self);

    /// Number of cached sessions
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bounds of an [`LruSessionStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Maximum number of cached sessions
    pub capacity: usize,
    /// Entries older than this (since insertion) expire on access
    pub ttl: Option<Duration>,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            capacity: 1024,
            ttl: None,
        }
    }
}

#[derive(Debug)]
struct Entry {
    keys: Arc<SessionKeys>,
    inserted: Instant,
    last_used: u64,
}

#[derive(Debug, Default)]
struct LruState {
    entries: HashMap<SessionId, Entry>,
    tick: u64,
}

impl LruState {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }
}

/// Least-recently-used session store with an optional TTL
#[derive(Debug, Default)]
pub struct LruSessionStore {
    policy: CachePolicy,
    state: Mutex<LruState>,
}

impl LruSessionStore {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(LruState::default()),
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    fn lock(&self) -> MutexGuard<'_, LruState> {
        // entries stay consistent even if a holder panicked
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_expired(&self, entry: &Entry, now: Instant) -> bool {
        self.policy
            .ttl
            .is_some_and(|ttl| now.duration_since(entry.inserted) >= ttl)
    }
}

impl SessionStore for LruSessionStore {
    fn get(&self, session_id: SessionId) -> Option<Arc<SessionKeys>> {
        let mut state = self.lock();
        let now = Instant::now();
        let expired = state
            .entries
            .get(&session_id)
            .is_some_and(|entry| self.is_expired(entry, now));
        if expired {
            state.entries.remove(&session_id);
            debug!(session_id, "session keys expired");
            return None;
        }

        let tick = state.next_tick();
        let entry = state.entries.get_mut(&session_id)?;
        entry.last_used = tick;
        Some(Arc::clone(&entry.keys))
    }

    fn insert(&self, session_id: SessionId, keys: Arc<SessionKeys>) {
        if self.policy.capacity == 0 {
            return;
        }
        let mut state = self.lock();
        let now = Instant::now();

        if let Some(ttl) = self.policy.ttl {
            state
                .entries
                .retain(|_, entry| now.duration_since(entry.inserted) < ttl);
        }
        while state.entries.len() >= self.policy.capacity
            && !state.entries.contains_key(&session_id)
        {
            let oldest = state
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(&id, _)| id);
            match oldest {
                Some(id) => {
                    state.entries.remove(&id);
                    debug!(session_id = id, "evicted least recently used session");
                }
                None => break,
            }
        }

        let last_used = state.next_tick();
        state.entries.insert(
            session_id,
            Entry {
                keys,
                inserted: now,
                last_used,
            },
        );
        debug!(session_id, cached = state.entries.len(), "session keys cached");
    }

    fn evict(&self, session_id: SessionId) -> bool {
        self.lock().entries.remove(&session_id).is_some()
    }

    fn clear(&self) {
        let mut state = self.lock();
        let dropped = state.entries.len();
        state.entries.clear();
        debug!(dropped, "session cache cleared");
    }

    fn len(&self) -> usize {
        self.lock().entries.len()
    }
}
