//! Process-local memoization keyed by immutable inputs.
//!
//! Entries are never evicted: a run covers one bounded set of archives and
//! the key spaces (mentions, URIs, KB ids) stay small relative to memory.
use std::hash::Hash;

use dashmap::DashMap;

pub struct Memo<K, V> {
    entries: DashMap<K, V>,
}

impl<K: Eq + Hash, V> Default for Memo<K, V> {
    fn default() -> Self {
        Self { entries: DashMap::new() }
    }
}

impl<K, V> Memo<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    /// Store `value` unless another caller got there first; returns the value
    /// that is cached after the call.
    pub fn insert(&self, key: K, value: V) -> V {
        self.entries.entry(key).or_insert(value).value().clone()
    }

    /// Cached value for `key`, computing it with `f` on a miss. `f` runs
    /// outside the shard lock; concurrent misses converge on the first stored
    /// value.
    pub fn get_or_insert_with<F>(&self, key: &K, f: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(v) = self.get(key) {
            return v;
        }
        let value = f();
        self.insert(key.clone(), value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::Memo;
    use std::cell::Cell;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn computes_once_per_key() {
        let memo: Memo<String, usize> = Memo::new();
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            42
        };
        assert_eq!(memo.get_or_insert_with(&"a".to_string(), compute), 42);
        assert_eq!(memo.get_or_insert_with(&"a".to_string(), || 7), 42);
        assert_eq!(calls.get(), 1);
        assert_eq!(memo.len(), 1);
    }

    #[test]
    fn first_insert_wins() {
        let memo: Memo<u64, &str> = Memo::new();
        assert_eq!(memo.insert(1, "first"), "first");
        assert_eq!(memo.insert(1, "second"), "first");
    }

    #[test]
    fn concurrent_inserts_agree_on_one_value() {
        let memo: Arc<Memo<u64, usize>> = Arc::new(Memo::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let memo = memo.clone();
                thread::spawn(move || memo.get_or_insert_with(&7, || i))
            })
            .collect();
        let seen: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(seen.iter().all(|v| *v == seen[0]));
        assert_eq!(memo.get(&7), Some(seen[0]));
    }
}
