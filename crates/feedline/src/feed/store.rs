//! MessageStore - the cache of attached message handles
//!
//! Insertion order is attach order is paint order. The store is owned and
//! mutated exclusively by the [`Reconciler`](crate::feed::Reconciler);
//! everything else reads attachment state through it.

use indexmap::IndexMap;
use std::collections::HashMap;

use crate::feed::handle::Handle;
use crate::model::MessageId;

/// Stable key for one attached handle; survives unrelated evictions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleKey(u64);

/// id → handle cache with stable attach order
#[derive(Default)]
pub struct MessageStore {
    items: IndexMap<HandleKey, Handle>,
    id_to_key: HashMap<MessageId, HandleKey>,
    next_key: u64,
    revision: u64,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Revision number for dirty tracking; bumps on every mutation
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has(&self, id: &str) -> bool {
        self.id_to_key.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Handle> {
        let key = self.id_to_key.get(id)?;
        self.items.get(key)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Handle> {
        let key = self.id_to_key.get(id)?;
        self.items.get_mut(key)
    }

    /// Attach a handle at the end of the feed.
    ///
    /// An id that is already cached keeps its original handle and position;
    /// the caller decides whether re-insertion is meaningful (it is not,
    /// during reconciliation, where repeated appearances are no-ops).
    pub fn set(&mut self, id: MessageId, handle: Handle) -> HandleKey {
        if let Some(&key) = self.id_to_key.get(&id) {
            return key;
        }
        let key = HandleKey(self.next_key);
        self.next_key += 1;
        self.items.insert(key, handle);
        self.id_to_key.insert(id, key);
        self.revision += 1;
        key
    }

    /// Detach and evict one handle, preserving the relative order of the
    /// survivors. Returns whether anything was removed.
    pub fn delete(&mut self, id: &str) -> bool {
        let Some(key) = self.id_to_key.remove(id) else {
            return false;
        };
        self.items.shift_remove(&key);
        self.revision += 1;
        true
    }

    pub fn clear(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.items.clear();
        self.id_to_key.clear();
        self.revision += 1;
    }

    /// Stable key for an attached id, if present
    pub fn key_of(&self, id: &str) -> Option<HandleKey> {
        self.id_to_key.get(id).copied()
    }

    /// Handles in attach order
    pub fn iter(&self) -> impl Iterator<Item = &Handle> + '_ {
        self.items.values()
    }

    /// Mutable handles in attach order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Handle> + '_ {
        self.items.values_mut()
    }

    /// Attached ids in attach order
    pub fn ids(&self) -> impl Iterator<Item = &MessageId> + '_ {
        self.items.values().map(Handle::id)
    }
}
