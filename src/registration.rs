//! Handle returned to callers of [`Dispatcher::register`](crate::Dispatcher::register).

use std::{fmt, sync::Arc};

use crate::{native::ListenerHandle, registry::EntryId};

/// Owner of the registry a [`Registration`] was inserted into.
pub(crate) trait ListenerOwner: Send + Sync {
   /// Drops the callback for `handle` and cancels native interest in it,
   /// unless the entry was already replaced by a later registration.
   fn deregister(&self, handle: ListenerHandle, entry: EntryId);
}

/// A live listener registration.
///
/// Closing it (explicitly or by dropping it) guarantees that the callback is
/// not invoked for any event the dispatcher looks up afterwards. An
/// invocation that already started runs to completion.
pub struct Registration {
   owner: Arc<dyn ListenerOwner>,
   handle: Option<ListenerHandle>,
   entry: EntryId,
}

impl Registration {
   pub(crate) fn new(owner: Arc<dyn ListenerOwner>, handle: ListenerHandle, entry: EntryId) -> Self {
      Self {
         owner,
         handle: Some(handle),
         entry,
      }
   }

   /// Deregisters the listener. Calling it again does nothing.
   pub fn close(&mut self) {
      if let Some(handle) = self.handle.take() {
         self.owner.deregister(handle, self.entry);
      }
   }

   pub const fn is_valid(&self) -> bool {
      self.handle.is_some()
   }

   pub const fn handle(&self) -> Option<ListenerHandle> {
      self.handle
   }
}

impl Drop for Registration {
   fn drop(&mut self) {
      self.close();
   }
}

impl fmt::Debug for Registration {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("Registration")
         .field("handle", &self.handle)
         .finish_non_exhaustive()
   }
}
