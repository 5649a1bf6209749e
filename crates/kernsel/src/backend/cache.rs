use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use super::key::ResolutionKey;
use super::registry::BackendHandle;

/// Memoized backend resolutions keyed by the full [`ResolutionKey`].
///
/// Entries are never evicted. Concurrent misses on the same key may each run the resolution,
/// but only the first result is stored and every caller gets the stored handle back.
#[derive(Default)]
pub struct BackendCache {
    entries: Mutex<HashMap<ResolutionKey, BackendHandle>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Point-in-time counters for a [`BackendCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl BackendCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &ResolutionKey) -> Option<BackendHandle> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Returns the cached handle for `key`, building and storing it on a miss.
    ///
    /// The boolean is `true` when the handle was found without calling `build`, matching the hit
    /// counter. The lock is not held while `build` runs; if another caller stored a handle first,
    /// that handle is returned and the call is reported as a miss.
    pub fn get_or_try_insert_with<E, F>(
        &self,
        key: &ResolutionKey,
        build: F,
    ) -> Result<(BackendHandle, bool), E>
    where
        F: FnOnce() -> Result<BackendHandle, E>,
    {
        if let Some(existing) = self.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok((existing, true));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let built = build()?;
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.entry(key.clone()) {
            // Lost a concurrent build; the call still counts as a miss.
            Entry::Occupied(entry) => Ok((entry.get().clone(), false)),
            Entry::Vacant(entry) => {
                entry.insert(built.clone());
                Ok((built, false))
            }
        }
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
