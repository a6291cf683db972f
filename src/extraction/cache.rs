// In-memory TTL cache shared by the extraction operations
//
// Eviction is lazy: expired entries are purged on every read, no sweeper task.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

/// Monotonic time source. Readings are offsets from an arbitrary origin.
pub trait Clock: Send + Sync {
    fn now(&self) -> Duration;
}

/// Wall clock backed by [`Instant`]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-driven clock for simulating expiry
#[cfg(test)]
#[derive(Default)]
pub struct ManualClock {
    now: Mutex<Duration>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, at: Duration) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = at;
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) += by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Thread-safe key → value store with per-entry expiry
pub struct TtlCache<V> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    store: Mutex<HashMap<String, (Duration, V)>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock::new()))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            store: Mutex::new(HashMap::new()),
        }
    }

    /// Cached value if its age is below the TTL
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut store = self.store.lock().unwrap_or_else(|e| e.into_inner());
        Self::evict_expired(&mut store, now, self.ttl);
        store.get(key).map(|(_, value)| value.clone())
    }

    /// Insert or overwrite; overwriting resets the entry's age
    pub fn set(&self, key: impl Into<String>, value: V) {
        let now = self.clock.now();
        let mut store = self.store.lock().unwrap_or_else(|e| e.into_inner());
        store.insert(key.into(), (now, value));
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        let now = self.clock.now();
        let mut store = self.store.lock().unwrap_or_else(|e| e.into_inner());
        Self::evict_expired(&mut store, now, self.ttl);
        store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_expired(store: &mut HashMap<String, (Duration, V)>, now: Duration, ttl: Duration) {
        store.retain(|_, (inserted, _)| now.saturating_sub(*inserted) < ttl);
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
