//! Thread-safe primitives shared across the pool.
//!
//! Every operation on these types is atomic with respect to all other
//! operations on the same instance. None of them block beyond ordinary
//! lock contention; contention windows here are expected to be
//! microseconds, so there are no timeouts.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic event counter.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Increments the counter and returns the new value.
    pub fn increment(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Adds `n` to the counter and returns the new value.
    pub fn add(&self, n: u64) -> u64 {
        self.0.fetch_add(n, Ordering::Relaxed) + n
    }

    /// Decrements the counter, saturating at zero, and returns the new value.
    pub fn decrement(&self) -> u64 {
        let mut current = self.0.load(Ordering::Relaxed);
        loop {
            let next = current.saturating_sub(1);
            match self.0.compare_exchange_weak(
                current,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(observed) => current = observed,
            }
        }
    }

    pub fn value(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Mutex-guarded key/value store.
///
/// Accessors that return collections (`keys`, `values`, `entries`,
/// `project`) return independent copies, never live views, so a
/// concurrent writer cannot corrupt an in-progress iteration.
#[derive(Debug)]
pub struct SharedMap<K, V> {
    inner: Mutex<HashMap<K, V>>,
}

impl<K, V> Default for SharedMap<K, V> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> SharedMap<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Inserts a value, returning the previous one if present.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.inner.lock().unwrap().insert(key, value)
    }

    /// Removes and returns the value for `key`.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.inner.lock().unwrap().remove(key)
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.inner.lock().unwrap().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }

    pub fn clear(&self) {
        self.inner.lock().unwrap().clear()
    }

    /// Snapshot of all keys.
    pub fn keys(&self) -> Vec<K> {
        self.inner.lock().unwrap().keys().cloned().collect()
    }

    /// Applies `f` to every entry under the lock and collects the outputs.
    ///
    /// This is the sanctioned way to observe non-`Clone` values (for
    /// eviction scans); the guarded map itself is never exposed.
    pub fn project<T>(&self, mut f: impl FnMut(&K, &V) -> T) -> Vec<T> {
        self.inner
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| f(k, v))
            .collect()
    }
}

impl<K, V> SharedMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Returns a copy of the value for `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.inner.lock().unwrap().get(key).cloned()
    }

    /// Snapshot of all values.
    pub fn values(&self) -> Vec<V> {
        self.inner.lock().unwrap().values().cloned().collect()
    }

    /// Snapshot of all entries.
    pub fn entries(&self) -> Vec<(K, V)> {
        self.inner
            .lock()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn counter_increment_decrement() {
        let counter = Counter::new();
        assert_eq!(counter.increment(), 1);
        assert_eq!(counter.add(4), 5);
        assert_eq!(counter.decrement(), 4);
        assert_eq!(counter.value(), 4);
    }

    #[test]
    fn counter_decrement_saturates_at_zero() {
        let counter = Counter::new();
        assert_eq!(counter.decrement(), 0);
        assert_eq!(counter.value(), 0);
    }

    #[test]
    fn counter_concurrent_increments() {
        let counter = Arc::new(Counter::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counter = counter.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        counter.increment();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counter.value(), 8000);
    }

    #[test]
    fn map_snapshots_are_independent() {
        let map: SharedMap<String, u32> = SharedMap::new();
        map.insert("a".to_string(), 1);
        map.insert("b".to_string(), 2);

        let keys = map.keys();
        map.insert("c".to_string(), 3);

        // The earlier snapshot is unaffected by the later write.
        assert_eq!(keys.len(), 2);
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn map_get_and_remove_by_borrowed_key() {
        let map: SharedMap<String, u32> = SharedMap::new();
        map.insert("x".to_string(), 7);
        assert_eq!(map.get("x"), Some(7));
        assert_eq!(map.remove("x"), Some(7));
        assert!(!map.contains("x"));
    }
}
