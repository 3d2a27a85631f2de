//! In-memory table with dirty tracking for write-behind persistence.
//!
//! DESIGN
//! ======
//! Live records are authoritative in memory. Every mutation bumps a
//! per-key revision and marks the key dirty; removals move the key to a
//! deleted set. The persistence task takes a snapshot under lock, writes
//! without holding it, then acks. An ack clears a dirty key only if its
//! revision is unchanged since the snapshot, so writes racing a flush are
//! never lost.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// A keyed table that remembers which rows changed since the last flush.
#[derive(Debug, Clone)]
pub struct TrackedTable<K, V> {
    rows: HashMap<K, V>,
    revisions: HashMap<K, u64>,
    dirty: HashSet<K>,
    deleted: HashSet<K>,
    next_revision: u64,
}

/// Snapshot of pending writes taken by [`TrackedTable::snapshot`].
#[derive(Debug, Clone)]
pub struct PendingWrites<K, V> {
    pub upserts: Vec<(K, V, u64)>,
    pub deletes: Vec<K>,
}

impl<K, V> PendingWrites<K, V> {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.deletes.is_empty()
    }
}

impl<K, V> Default for TrackedTable<K, V> {
    fn default() -> Self {
        Self {
            rows: HashMap::new(),
            revisions: HashMap::new(),
            dirty: HashSet::new(),
            deleted: HashSet::new(),
            next_revision: 0,
        }
    }
}

impl<K, V> TrackedTable<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load rows read from storage. Hydrated rows are clean.
    pub fn hydrate(&mut self, rows: impl IntoIterator<Item = (K, V)>) {
        for (key, value) in rows {
            self.rows.insert(key, value);
        }
    }

    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.rows.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.rows.contains_key(key)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.rows.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.rows.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Insert or replace a row and mark it dirty.
    pub fn insert(&mut self, key: K, value: V) {
        self.deleted.remove(&key);
        self.touch(key.clone());
        self.rows.insert(key, value);
    }

    /// Mutate a row in place. Returns `None` when the key is absent.
    pub fn update<R>(&mut self, key: &K, f: impl FnOnce(&mut V) -> R) -> Option<R> {
        let row = self.rows.get_mut(key)?;
        let out = f(row);
        self.touch(key.clone());
        Some(out)
    }

    /// Remove a row and queue its deletion.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let removed = self.rows.remove(key)?;
        self.dirty.remove(key);
        self.revisions.remove(key);
        self.deleted.insert(key.clone());
        Some(removed)
    }

    /// Remove every row matching `pred`. Returns the removed keys.
    pub fn remove_where(&mut self, mut pred: impl FnMut(&K, &V) -> bool) -> Vec<K> {
        let doomed: Vec<K> = self
            .rows
            .iter()
            .filter(|(k, v)| pred(k, v))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &doomed {
            self.remove(key);
        }
        doomed
    }

    /// Clone every pending write. The table is left untouched until acked.
    #[must_use]
    pub fn snapshot(&self) -> PendingWrites<K, V> {
        let upserts = self
            .dirty
            .iter()
            .filter_map(|key| {
                let row = self.rows.get(key)?;
                let revision = self.revisions.get(key).copied().unwrap_or_default();
                Some((key.clone(), row.clone(), revision))
            })
            .collect();
        let deletes = self.deleted.iter().cloned().collect();
        PendingWrites { upserts, deletes }
    }

    /// Clear dirty flags for rows written at the given revisions.
    pub fn ack_upserts(&mut self, written: impl IntoIterator<Item = (K, u64)>) {
        for (key, revision) in written {
            // EDGE: keep the flag if the row changed again after the snapshot.
            if self.revisions.get(&key) == Some(&revision) {
                self.dirty.remove(&key);
            }
        }
    }

    /// Clear deletions that reached storage.
    pub fn ack_deletes(&mut self, deleted: impl IntoIterator<Item = K>) {
        for key in deleted {
            self.deleted.remove(&key);
        }
    }

    #[must_use]
    pub fn dirty_count(&self) -> usize {
        self.dirty.len() + self.deleted.len()
    }

    fn touch(&mut self, key: K) {
        self.next_revision += 1;
        self.revisions.insert(key.clone(), self.next_revision);
        self.dirty.insert(key);
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
