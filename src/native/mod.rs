//! Contract with the native camera-server library.
//!
//! The dispatcher never talks to the camera server directly. It drives an
//! implementation of [`ListenerApi`], which wraps the library's polled
//! listener entry points.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{error::Result, event::EventMask};

#[cfg(test)]
pub(crate) mod mock;

/// Listener handle issued by the native layer, unique while the listener is alive.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListenerHandle(pub i32);

/// Opaque handle to a native listener poller.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct PollerHandle(pub i32);

impl fmt::Debug for ListenerHandle {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      write!(f, "listener#{}", self.0)
   }
}

impl fmt::Display for ListenerHandle {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      fmt::Debug::fmt(self, f)
   }
}

/// Polled listener operations of the native library.
///
/// `poll_listener` is the only blocking call. Implementations must make it
/// return queued events before honoring a pending cancellation, so that a
/// drain observes every batch enqueued ahead of it.
pub trait ListenerApi: Send + Sync + 'static {
   type Event: crate::event::ListenerEvent;

   /// Allocates a new poller.
   fn create_listener_poller(&self) -> Result<PollerHandle>;

   /// Registers interest in `mask` on `poller`. With `immediate_notify` the
   /// library queues a burst of events describing its current state.
   fn add_polled_listener(
      &self,
      poller: PollerHandle,
      mask: EventMask,
      immediate_notify: bool,
   ) -> Result<ListenerHandle>;

   /// Blocks until at least one event is available. Fails with
   /// [`Error::Interrupted`](crate::Error::Interrupted) when woken by
   /// [`cancel_poll_listener`](Self::cancel_poll_listener) or by native
   /// teardown.
   fn poll_listener(&self, poller: PollerHandle) -> Result<Vec<Self::Event>>;

   /// Makes the current or next `poll_listener` on `poller` fail with
   /// `Interrupted`. One cancellation wakes exactly one poll.
   fn cancel_poll_listener(&self, poller: PollerHandle);

   /// Cancels interest; later polls no longer produce events for `listener`.
   fn remove_listener(&self, listener: ListenerHandle);

   /// Releases `poller`. Only called while the poller is known to be valid.
   fn destroy_listener_poller(&self, poller: PollerHandle);
}

impl<T: ListenerApi + ?Sized> ListenerApi for std::sync::Arc<T> {
   type Event = T::Event;

   fn create_listener_poller(&self) -> Result<PollerHandle> {
      (**self).create_listener_poller()
   }

   fn add_polled_listener(
      &self,
      poller: PollerHandle,
      mask: EventMask,
      immediate_notify: bool,
   ) -> Result<ListenerHandle> {
      (**self).add_polled_listener(poller, mask, immediate_notify)
   }

   fn poll_listener(&self, poller: PollerHandle) -> Result<Vec<Self::Event>> {
      (**self).poll_listener(poller)
   }

   fn cancel_poll_listener(&self, poller: PollerHandle) {
      (**self).cancel_poll_listener(poller);
   }

   fn remove_listener(&self, listener: ListenerHandle) {
      (**self).remove_listener(listener);
   }

   fn destroy_listener_poller(&self, poller: PollerHandle) {
      (**self).destroy_listener_poller(poller);
   }
}
