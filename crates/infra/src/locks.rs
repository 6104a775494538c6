//! Per-key mutual exclusion.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use storefront_core::{DomainError, DomainResult};

/// Serializes work per key while letting different keys run in parallel.
///
/// Entries are dropped once no caller holds or waits on them.
#[derive(Debug)]
pub struct KeyedLocks<K> {
    inner: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }
}

impl<K> KeyedLocks<K>
where
    K: Clone + Eq + Hash + core::fmt::Display,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `key`.
    pub fn with_lock<R>(&self, key: &K, f: impl FnOnce() -> R) -> DomainResult<R> {
        let entry = {
            let mut map = self.inner.lock().map_err(|_| poisoned(key))?;
            map.entry(key.clone()).or_default().clone()
        };

        let result = {
            let _guard = entry.lock().map_err(|_| poisoned(key))?;
            f()
        };

        if let Ok(mut map) = self.inner.lock() {
            // Map + our clone: nobody else is waiting.
            if Arc::strong_count(&entry) == 2 {
                map.remove(key);
            }
        }
        Ok(result)
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.inner.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned(key: &impl core::fmt::Display) -> DomainError {
    DomainError::inconsistency(format!("lock for {key} poisoned"))
}
