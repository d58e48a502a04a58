use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bugtrack_core::{AppError, AppResult};
use bugtrack_domain::{
    Bug, BugId, PermissionPolicy, Project, ProjectId, RoleName, UserId, UserProfile,
};
use tokio::sync::OwnedMutexGuard;

/// Record held in a [`LocalCollection`], addressed by a stable key.
pub trait CollectionRecord: Clone + Send + Sync + 'static {
    /// Key type identifying one record.
    type Key: Clone + Eq + Hash + Display + Send + Sync + 'static;

    /// Returns the record's key.
    fn record_key(&self) -> Self::Key;
}

impl CollectionRecord for UserProfile {
    type Key = UserId;

    fn record_key(&self) -> Self::Key {
        self.id
    }
}

impl CollectionRecord for PermissionPolicy {
    type Key = RoleName;

    fn record_key(&self) -> Self::Key {
        self.role().clone()
    }
}

impl CollectionRecord for Bug {
    type Key = BugId;

    fn record_key(&self) -> Self::Key {
        self.id
    }
}

impl CollectionRecord for Project {
    type Key = ProjectId;

    fn record_key(&self) -> Self::Key {
        self.id
    }
}

/// Local change applied to one record before the remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordChange<T> {
    /// Overwrite the record in place.
    Replace(T),
    /// Drop the record from the collection.
    Remove,
}

struct CollectionState<T> {
    records: Arc<Vec<T>>,
    version: u64,
}

type RecordLocks<K> = Arc<Mutex<HashMap<K, Arc<tokio::sync::Mutex<()>>>>>;

/// Client-side list of records that is swapped whole on every change.
///
/// Readers get cheap `Arc` snapshots. Optimistic mutations on the same key
/// are serialized through a per-record async lock.
///
/// Reverting a failed mutation restores the exact pre-mutation list when
/// nothing else changed meanwhile. Otherwise only the mutated record is
/// restored to its prior value: a replaced record is swapped back in place,
/// and a removed record is reinserted after its nearest predecessor from the
/// pre-mutation list that is still present, so other records keep their
/// changes and the original order survives any sequence of failures.
pub struct LocalCollection<T: CollectionRecord> {
    state: Arc<Mutex<CollectionState<T>>>,
    locks: RecordLocks<T::Key>,
}

impl<T: CollectionRecord> Clone for LocalCollection<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            locks: Arc::clone(&self.locks),
        }
    }
}

impl<T: CollectionRecord> Default for LocalCollection<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T: CollectionRecord> LocalCollection<T> {
    /// Creates a collection holding `records`.
    #[must_use]
    pub fn new(records: Vec<T>) -> Self {
        Self {
            state: Arc::new(Mutex::new(CollectionState {
                records: Arc::new(records),
                version: 0,
            })),
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the current records.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Vec<T>> {
        Arc::clone(&self.state().records)
    }

    /// Returns an owned copy of the current records.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.snapshot().as_ref().clone()
    }

    /// Replaces every record, e.g. after a reload.
    pub fn replace(&self, records: Vec<T>) {
        let mut state = self.state();
        state.records = Arc::new(records);
        state.version += 1;
    }

    /// Appends a record that the backend has already persisted.
    pub fn push(&self, record: T) {
        let mut state = self.state();
        let mut records = state.records.as_ref().clone();
        records.push(record);
        state.records = Arc::new(records);
        state.version += 1;
    }

    /// Returns the record with `key`.
    #[must_use]
    pub fn get(&self, key: &T::Key) -> Option<T> {
        self.state()
            .records
            .iter()
            .find(|record| &record.record_key() == key)
            .cloned()
    }

    /// Returns whether a record with `key` exists.
    #[must_use]
    pub fn contains(&self, key: &T::Key) -> bool {
        self.get(key).is_some()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state().records.len()
    }

    /// Returns whether the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(super) async fn lock_record(&self, key: &T::Key) -> RecordLease<T::Key> {
        let record_lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(key.clone()).or_default())
        };

        RecordLease {
            key: key.clone(),
            locks: Arc::clone(&self.locks),
            guard: Some(record_lock.lock_owned().await),
        }
    }

    pub(super) fn apply(&self, key: &T::Key, change: RecordChange<T>) -> AppResult<Applied<T>> {
        let mut state = self.state();
        let index = state
            .records
            .iter()
            .position(|record| &record.record_key() == key)
            .ok_or_else(|| AppError::NotFound(format!("record '{key}' is not loaded")))?;

        let snapshot = Arc::clone(&state.records);
        let prior = snapshot[index].clone();
        let mut records = snapshot.as_ref().clone();
        match change {
            RecordChange::Replace(record) => records[index] = record,
            RecordChange::Remove => {
                records.remove(index);
            }
        }

        state.records = Arc::new(records);
        state.version += 1;

        Ok(Applied {
            snapshot,
            prior,
            index,
            version: state.version,
        })
    }

    pub(super) fn revert(&self, key: &T::Key, applied: Applied<T>) {
        let mut state = self.state();
        let untouched = state.version == applied.version;
        state.version += 1;

        if untouched {
            state.records = applied.snapshot;
            return;
        }

        let mut records = state.records.as_ref().clone();
        if let Some(position) = records.iter().position(|record| &record.record_key() == key) {
            records[position] = applied.prior;
        } else {
            let index = Self::restore_position(&records, &applied.snapshot[..applied.index]);
            records.insert(index, applied.prior);
        }
        state.records = Arc::new(records);
    }

    /// Slot right after the nearest predecessor from `before` that is still present.
    fn restore_position(records: &[T], before: &[T]) -> usize {
        before
            .iter()
            .rev()
            .find_map(|predecessor| {
                let predecessor_key = predecessor.record_key();
                records
                    .iter()
                    .position(|record| record.record_key() == predecessor_key)
            })
            .map_or(0, |position| position + 1)
    }

    fn state(&self) -> MutexGuard<'_, CollectionState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Bookkeeping for undoing one optimistic apply.
pub(super) struct Applied<T> {
    snapshot: Arc<Vec<T>>,
    prior: T,
    index: usize,
    version: u64,
}

/// Exclusive hold on one record key for the duration of a mutation.
pub(super) struct RecordLease<K: Eq + Hash> {
    key: K,
    locks: RecordLocks<K>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<K: Eq + Hash> Drop for RecordLease<K> {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(&self.key)
            .is_some_and(|record_lock| Arc::strong_count(record_lock) == 1)
        {
            locks.remove(&self.key);
        }
    }
}
