//! Shared record-state table between processors and the flush daemon.
//!
//! Entries move through pending → done → flushed → removed. Every mutation
//! replaces a whole entry while holding its map shard, so readers never
//! observe a half-written entry. Removed ids are remembered for the rest of
//! the run and cannot be inserted again.
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use tokio::sync::Notify;

use linker_core::types::{Mapping, RecordKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobEntry {
    mappings: Vec<Mapping>,
    done: bool,
    flushed: bool,
}

impl JobEntry {
    pub fn pending() -> Self {
        Self { mappings: Vec::new(), done: false, flushed: false }
    }

    pub fn completed(mappings: Vec<Mapping>) -> Self {
        Self { mappings, done: true, flushed: false }
    }

    /// Same mappings, marked as written to the sink.
    pub fn into_flushed(self) -> Self {
        Self { flushed: true, ..self }
    }

    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn is_flushed(&self) -> bool {
        self.flushed
    }

    /// Done but not yet written.
    pub fn is_ready(&self) -> bool {
        self.done && !self.flushed
    }
}

pub struct JobTable {
    entries: DashMap<RecordKey, JobEntry>,
    retired: DashSet<String>,
    completed: Notify,
}

impl JobTable {
    /// `shards` is rounded up to the power of two the map requires.
    pub fn new(shards: usize) -> Self {
        let shards = shards.max(2).next_power_of_two();
        Self { entries: DashMap::with_shard_amount(shards), retired: DashSet::new(), completed: Notify::new() }
    }

    /// Track `key` as pending. Refused when the id is already present or was
    /// removed earlier in the run.
    pub fn insert_pending(&self, key: RecordKey) -> bool {
        // `remove` retires the id before dropping the entry, so checking the
        // retired set while holding the vacant slot cannot miss a removal.
        match self.entries.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                if self.retired.contains(&slot.key().id) {
                    return false;
                }
                slot.insert(JobEntry::pending());
                true
            }
        }
    }

    pub fn get(&self, key: &RecordKey) -> Option<JobEntry> {
        self.entries.get(key).map(|e| e.value().clone())
    }

    /// Snapshot of the keys present right now.
    pub fn keys(&self) -> Vec<RecordKey> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }

    /// Atomically swap the entry for `key` with whatever `f` returns.
    /// Returns false when the key is absent or `f` declines.
    pub fn replace<F>(&self, key: &RecordKey, f: F) -> bool
    where
        F: FnOnce(&JobEntry) -> Option<JobEntry>,
    {
        let Some(mut current) = self.entries.get_mut(key) else {
            return false;
        };
        match f(current.value()) {
            Some(next) => {
                *current = next;
                true
            }
            None => false,
        }
    }

    /// Finish a pending entry. A record that already completed (for example
    /// by timeout) keeps its first result.
    pub fn complete(&self, key: &RecordKey, mappings: Vec<Mapping>) -> bool {
        let replaced = self.replace(key, |current| (!current.is_done()).then(|| JobEntry::completed(mappings)));
        if replaced {
            self.completed.notify_one();
        }
        replaced
    }

    pub fn mark_flushed(&self, key: &RecordKey) -> bool {
        self.replace(key, |current| current.is_ready().then(|| current.clone().into_flushed()))
    }

    pub fn remove(&self, key: &RecordKey) -> Option<JobEntry> {
        self.retired.insert(key.id.clone());
        self.entries.remove(key).map(|(_, entry)| entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Signalled after every successful [`JobTable::complete`].
    pub fn completed(&self) -> &Notify {
        &self.completed
    }
}
