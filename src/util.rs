//! # Storage Utilities
//!
//! Helpers shared by the queue and the registries: fallible string copies,
//! and [`Slots`], the growth-managed entry list both registries are built on.

use alloc::string::String;
use alloc::vec::Vec;

use crate::config::Capacity;
use crate::error::SchedulerError;

/// Copy `text` into a new heap string.
///
/// Allocation failure is reported as [`SchedulerError::CapacityExhausted`]
/// instead of aborting. Topics and patterns have no length limit.
pub fn copy_str(text: &str) -> Result<String, SchedulerError> {
    let mut owned = String::new();
    owned
        .try_reserve_exact(text.len())
        .map_err(|_| SchedulerError::CapacityExhausted)?;
    owned.push_str(text);
    Ok(owned)
}

/// Entries keyed by a monotonically increasing id, kept in key order.
///
/// Keys are issued in increasing order and entries are only ever appended, so
/// storage order, registration order and key order coincide. That lets a
/// caller walk the list with a key cursor ([`Slots::next_after`]) instead of
/// an index, which stays valid while entries are added or removed between
/// steps.
pub struct Slots<K, T> {
    entries: Vec<(K, T)>,
    capacity: Capacity,
}

impl<K: Copy + Ord, T> Slots<K, T> {
    pub fn new(capacity: Capacity) -> Self {
        Self {
            entries: Vec::with_capacity(capacity.initial.min(capacity.max_entries())),
            capacity,
        }
    }

    /// Append an entry, growing storage according to the capacity policy.
    ///
    /// `key` must be greater than every key already stored.
    pub fn try_push(&mut self, key: K, value: T) -> Result<(), SchedulerError> {
        debug_assert!(self.entries.last().is_none_or(|(last, _)| *last < key));

        let len = self.entries.len();
        let max = self.capacity.max_entries();
        if len >= max {
            return Err(SchedulerError::CapacityExhausted);
        }
        if len == self.entries.capacity() {
            let additional = len.max(1).min(max - len);
            self.entries
                .try_reserve_exact(additional)
                .map_err(|_| SchedulerError::CapacityExhausted)?;
        }
        self.entries.push((key, value));
        Ok(())
    }

    /// Remove the entry with the given key.
    pub fn remove(&mut self, key: K) -> Option<T> {
        let idx = self.position(key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn get(&self, key: K) -> Option<&T> {
        let idx = self.position(key)?;
        Some(&self.entries[idx].1)
    }

    pub fn get_mut(&mut self, key: K) -> Option<&mut T> {
        let idx = self.position(key)?;
        Some(&mut self.entries[idx].1)
    }

    /// First entry with a key strictly greater than `cursor` (or the first
    /// entry when `cursor` is `None`).
    pub fn next_after(&self, cursor: Option<K>) -> Option<(K, &T)> {
        let idx = match cursor {
            Some(cursor) => self.entries.partition_point(|(k, _)| *k <= cursor),
            None => 0,
        };
        self.entries.get(idx).map(|(k, v)| (*k, v))
    }

    /// Entries after `cursor`, in key order.
    pub fn iter_after(&self, cursor: Option<K>) -> impl Iterator<Item = (K, &T)> {
        let idx = match cursor {
            Some(cursor) => self.entries.partition_point(|(k, _)| *k <= cursor),
            None => 0,
        };
        self.entries[idx..].iter().map(|(k, v)| (*k, v))
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, &T)> {
        self.iter_after(None)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (K, &mut T)> {
        self.entries.iter_mut().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Slots currently allocated.
    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    pub fn policy(&self) -> Capacity {
        self.capacity
    }

    fn position(&self, key: K) -> Option<usize> {
        self.entries.binary_search_by(|(k, _)| k.cmp(&key)).ok()
    }
}
