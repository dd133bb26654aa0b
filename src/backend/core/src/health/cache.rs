//! Time-bounded memoization of the aggregate state.
//!
//! # Concurrency
//!
//! ```text
//! request ─▶ read lock ─▶ fresh? ──yes──▶ return cached
//!                            │
//!                            no
//!                            ▼
//!                    flight mutex (async)
//!                            │
//!          refreshed while waiting? ──yes──▶ return that state
//!                            │
//!                            no
//!                            ▼
//!              compute ─▶ store ─▶ notify listener
//! ```
//!
//! Fresh reads only take a shared lock. Concurrent misses queue on the flight
//! mutex, so one miss window produces exactly one computation.

use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::check::AggregateState;
use super::listener::{notify_transition, StatusListener};
use super::deadline_after;

/// Cache time-to-live when none is given.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(1);

struct CacheEntry {
    state: Arc<AggregateState>,
    expires_at: Instant,
    /// Incremented on every store. Lets waiters detect a refresh even when
    /// the ttl is zero.
    generation: u64,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Holds the most recent [`AggregateState`].
pub struct StateCache {
    ttl: Duration,
    entry: RwLock<Option<CacheEntry>>,
    flight: Mutex<()>,
    listener: Option<Arc<dyn StatusListener>>,
}

impl StateCache {
    /// Create a cache. A zero `ttl` disables caching.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: RwLock::new(None),
            flight: Mutex::new(()),
            listener: None,
        }
    }

    /// Notify `listener` whenever a newly stored state changes status.
    pub fn with_listener(mut self, listener: Arc<dyn StatusListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The last stored state, fresh or not.
    pub fn peek(&self) -> Option<Arc<AggregateState>> {
        self.entry.read().as_ref().map(|e| e.state.clone())
    }

    /// Return the cached state if fresh, otherwise run `compute` once and
    /// store its result.
    ///
    /// Callers arriving while a computation is in flight wait for it and share
    /// its result.
    pub async fn get_or_compute<F, Fut>(&self, compute: F) -> Arc<AggregateState>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AggregateState>,
    {
        let seen_generation = {
            let entry = self.entry.read();
            match entry.as_ref() {
                Some(e) if e.is_fresh(Instant::now()) => return e.state.clone(),
                Some(e) => e.generation,
                None => 0,
            }
        };

        let _flight = self.flight.lock().await;

        let refreshed = self
            .entry
            .read()
            .as_ref()
            .filter(|e| e.generation != seen_generation || e.is_fresh(Instant::now()))
            .map(|e| e.state.clone());
        if let Some(state) = refreshed {
            return state;
        }

        let state = Arc::new(compute().await);

        let previous = {
            let mut entry = self.entry.write();
            let previous = entry.as_ref().map(|e| e.state.status);
            let generation = entry.as_ref().map_or(1, |e| e.generation + 1);
            *entry = Some(CacheEntry {
                state: state.clone(),
                expires_at: deadline_after(Instant::now(), self.ttl),
                generation,
            });
            previous
        };

        if let Some(listener) = &self.listener {
            notify_transition(listener.as_ref(), previous, state.status);
        }

        state
    }

    /// Drop the stored state so the next call recomputes. The previous status
    /// is forgotten as well.
    pub fn invalidate(&self) {
        *self.entry.write() = None;
    }
}

impl std::fmt::Debug for StateCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateCache")
            .field("ttl", &self.ttl)
            .field("has_entry", &self.entry.read().is_some())
            .field("has_listener", &self.listener.is_some())
            .finish()
    }
}
