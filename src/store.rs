//! Aggregation store
//!
//! The [`AggregationStore`] owns every pending group. All access goes
//! through one exclusive lock over the whole map; hold times are bounded by
//! the size of one group, which stays small because groups are drained
//! every period.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::message::{GroupKey, Message};

/// What an insertion did to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insertion {
    /// A new group was created; the key must be signalled to the dispatcher
    Created(GroupKey),
    /// The message was appended to an existing group
    Appended,
}

/// Concurrent map from grouping key to pending messages, oldest first
#[derive(Debug, Default)]
pub struct AggregationStore {
    groups: Mutex<HashMap<GroupKey, Vec<Message>>>,
}

impl AggregationStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to its group, creating the group if absent
    pub fn insert(&self, msg: Message) -> Insertion {
        let key = msg.key();
        let mut groups = self.groups.lock();
        match groups.get_mut(&key) {
            Some(pending) => {
                pending.push(msg);
                Insertion::Appended
            }
            None => {
                groups.insert(key.clone(), vec![msg]);
                Insertion::Created(key)
            }
        }
    }

    /// Take the group for `key` and split it with `split`
    ///
    /// `split` receives the whole group and returns its output together with
    /// the messages to keep pending. A non-empty remainder replaces the
    /// group, an empty one deletes it. The take, the split and the write-back
    /// happen under one lock acquisition, so producers never see the key
    /// absent in the middle of a drain.
    ///
    /// Returns `None` if no group exists for `key`.
    pub fn drain<T, F>(&self, key: &GroupKey, split: F) -> Option<T>
    where
        F: FnOnce(Vec<Message>) -> (T, Vec<Message>),
    {
        let mut groups = self.groups.lock();
        let msgs = groups.remove(key)?;
        let (out, remainder) = split(msgs);
        if !remainder.is_empty() {
            groups.insert(key.clone(), remainder);
        }
        Some(out)
    }

    /// Number of messages pending for `key`
    pub fn pending(&self, key: &GroupKey) -> usize {
        self.groups.lock().get(key).map_or(0, Vec::len)
    }

    /// Check if a group exists for `key`
    pub fn contains(&self, key: &GroupKey) -> bool {
        self.groups.lock().contains_key(key)
    }

    /// Number of pending groups
    pub fn group_count(&self) -> usize {
        self.groups.lock().len()
    }

    /// Total pending messages across all groups
    pub fn message_count(&self) -> usize {
        self.groups.lock().values().map(Vec::len).sum()
    }

    /// Check if the store holds no groups
    pub fn is_empty(&self) -> bool {
        self.groups.lock().is_empty()
    }

    /// Drop every pending group, returning how many messages were discarded
    pub fn clear(&self) -> usize {
        let mut groups = self.groups.lock();
        let discarded = groups.values().map(Vec::len).sum();
        groups.clear();
        discarded
    }
}
