//! Storage behind the attempt limiter.

use dashmap::{mapref::entry::Entry, DashMap};

use super::RateLimitRecord;

/// Key-value storage for attempt records.
///
/// The in-process [`MemoryStore`] is the only implementation shipped; a
/// networked store can sit behind the same trait to share limits between
/// instances.
pub trait RateLimitStore: Send + Sync {
    fn get(&self, key: &str) -> Option<RateLimitRecord>;

    fn put(&self, key: &str, record: RateLimitRecord);

    fn delete(&self, key: &str);

    /// Remove every record for which `is_stale` holds and return how many were dropped.
    fn sweep(&self, is_stale: &dyn Fn(&RateLimitRecord) -> bool) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read-modify-write of one key. The default is a plain `get` then `put`
    /// and gives no atomicity; implementations should override it when they can.
    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<RateLimitRecord>) -> RateLimitRecord,
    ) -> RateLimitRecord {
        let next = apply(self.get(key));
        self.put(key, next);
        next
    }
}

/// Sharded concurrent map; `update` holds the shard lock for the whole
/// read-check-increment so two requests from one identifier cannot race.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<String, RateLimitRecord>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateLimitStore for MemoryStore {
    fn get(&self, key: &str) -> Option<RateLimitRecord> {
        self.records.get(key).map(|record| *record)
    }

    fn put(&self, key: &str, record: RateLimitRecord) {
        self.records.insert(key.to_string(), record);
    }

    fn delete(&self, key: &str) {
        self.records.remove(key);
    }

    fn sweep(&self, is_stale: &dyn Fn(&RateLimitRecord) -> bool) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| !is_stale(record));
        before.saturating_sub(self.records.len())
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<RateLimitRecord>) -> RateLimitRecord,
    ) -> RateLimitRecord {
        match self.records.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                let next = apply(Some(*entry.get()));
                entry.insert(next);
                next
            }
            Entry::Vacant(entry) => {
                let next = apply(None);
                entry.insert(next);
                next
            }
        }
    }
}
