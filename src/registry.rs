//! Listener handle to callback mapping.
//!
//! The registry lives inside the dispatcher's mutex. Lookups hand out a
//! cloned `Arc` so the callback can run after the lock is released.
//!
//! Native handles may be reused once a listener is gone, so every insertion
//! also gets a registry-unique id. Removal only succeeds when both match.

use std::{collections::HashMap, sync::Arc};

use log::warn;

use crate::native::ListenerHandle;

/// User callback invoked on the dispatcher thread.
pub type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Identifies one insertion, independent of the native handle value.
pub(crate) type EntryId = u64;

struct Entry<E> {
   id: EntryId,
   callback: Callback<E>,
}

pub(crate) struct Registry<E> {
   listeners: HashMap<ListenerHandle, Entry<E>>,
   next_id: EntryId,
}

impl<E> Registry<E> {
   pub(crate) fn new() -> Self {
      Self {
         listeners: HashMap::new(),
         next_id: 1,
      }
   }

   pub(crate) fn insert(&mut self, handle: ListenerHandle, callback: Callback<E>) -> EntryId {
      let id = self.next_id;
      self.next_id += 1;
      if self.listeners.insert(handle, Entry { id, callback }).is_some() {
         // The native layer reissued a live handle, last registration wins.
         warn!("Listener {handle} registered twice, replacing previous callback");
      }
      id
   }

   /// Removes the entry for `handle` if it is still the insertion `id`.
   pub(crate) fn remove(&mut self, handle: ListenerHandle, id: EntryId) -> Option<Callback<E>> {
      match self.listeners.get(&handle) {
         Some(entry) if entry.id == id => self.listeners.remove(&handle).map(|e| e.callback),
         _ => None,
      }
   }

   pub(crate) fn get(&self, handle: ListenerHandle) -> Option<Callback<E>> {
      self.listeners.get(&handle).map(|e| e.callback.clone())
   }

   pub(crate) fn len(&self) -> usize {
      self.listeners.len()
   }

   /// Empties the registry. Callers drop the returned callbacks outside the lock.
   pub(crate) fn take_all(&mut self) -> Vec<(ListenerHandle, Callback<E>)> {
      self
         .listeners
         .drain()
         .map(|(handle, e)| (handle, e.callback))
         .collect()
   }
}
