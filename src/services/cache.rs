//! Time-to-live cache for upstream platform reads.
//!
//! Entries older than the TTL are treated as absent and evicted on read.
//! Clones are cheap to share: the map lives behind `Arc<Mutex<_>>`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Clone)]
pub struct TtlCache<V> {
    inner: Arc<Mutex<HashMap<String, (Instant, V)>>>,
    ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self { inner: Arc::new(Mutex::new(HashMap::new())), ttl }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    fn get_at(&self, key: &str, now: Instant) -> Option<V> {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let (stored_at, value) = map.get(key)?;
        if now.duration_since(*stored_at) < self.ttl {
            return Some(value.clone());
        }
        map.remove(key);
        None
    }

    fn insert_at(&self, key: impl Into<String>, value: V, now: Instant) {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        map.insert(key.into(), (now, value));
    }

    pub fn clear(&self) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
