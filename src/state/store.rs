//! Concurrent storage of timer records keyed by identifier

use std::collections::HashMap;
use parking_lot::Mutex;

use super::{TimerRecord, TimerSnapshot};

/// Shared mapping from timer id to record
///
/// `modify` is the one atomic primitive: the closure sees the slot for `id`
/// (`None` when absent) and may insert, mutate or take the record, all
/// without another operation on that id interleaving.
pub trait TimerStore: Send + Sync + 'static {
    fn modify<R>(&self, id: &str, f: impl FnOnce(&mut Option<TimerRecord>) -> R) -> R;

    /// Identifiers currently stored, in no particular order
    fn ids(&self) -> Vec<String>;

    /// Insert or overwrite; the replaced record is handed back so the caller
    /// can cancel its callback
    fn put(&self, id: &str, record: TimerRecord) -> Option<TimerRecord> {
        self.modify(id, |slot| slot.replace(record))
    }

    fn get(&self, id: &str) -> Option<TimerSnapshot> {
        self.modify(id, |slot| slot.as_ref().map(TimerRecord::snapshot))
    }

    fn delete(&self, id: &str) -> Option<TimerRecord> {
        self.modify(id, Option::take)
    }

    fn len(&self) -> usize {
        self.ids().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory store behind a single coarse lock
///
/// Slots are edited in place, so a closure that panics leaves the stored
/// record as it found it. Empty slots are swept on the way out.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, Option<TimerRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TimerStore for MemoryStore {
    fn modify<R>(&self, id: &str, f: impl FnOnce(&mut Option<TimerRecord>) -> R) -> R {
        let mut records = self.records.lock();
        let out = match records.get_mut(id) {
            Some(slot) => f(slot),
            None => f(records.entry(id.to_string()).or_default()),
        };
        if records.get(id).is_some_and(Option::is_none) {
            records.remove(id);
        }
        out
    }

    fn ids(&self) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .filter(|(_, slot)| slot.is_some())
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn len(&self) -> usize {
        self.records.lock().values().filter(|slot| slot.is_some()).count()
    }
}
