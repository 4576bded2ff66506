//! Scripted stand-in for the native library, used by the unit tests.

use std::collections::{HashMap, VecDeque};

use parking_lot::{Condvar, Mutex};

use super::{ListenerApi, ListenerHandle, PollerHandle};
use crate::{
   error::{Error, Result},
   event::{EventKind, EventMask, VideoEvent},
};

/// Events synthesized per immediate-notify registration.
const IMMEDIATE_BURST: usize = 3;

#[derive(Default)]
struct MockState {
   next_listener: i32,
   next_poller: i32,
   live_poller: Option<PollerHandle>,
   pollers_created: usize,
   pollers_destroyed: Vec<PollerHandle>,
   listeners: HashMap<ListenerHandle, EventMask>,
   removed: Vec<ListenerHandle>,
   queue: VecDeque<Vec<VideoEvent>>,
   cancel_pending: bool,
   torn_down: bool,
   fail_add: Option<i32>,
   reused_listener: Option<ListenerHandle>,
}

pub(crate) struct MockApi {
   state: Mutex<MockState>,
   wake: Condvar,
}

impl MockApi {
   pub(crate) fn new() -> Self {
      Self::starting_at(1)
   }

   /// Hands out listener handles counting up from `first`.
   pub(crate) fn starting_at(first: i32) -> Self {
      Self {
         state: Mutex::new(MockState {
            next_listener: first,
            next_poller: 100,
            ..Default::default()
         }),
         wake: Condvar::new(),
      }
   }

   /// Hands out `handle` for every listener, like a slot-recycling allocator.
   pub(crate) fn reusing(handle: i32) -> Self {
      let mock = Self::new();
      mock.state.lock().reused_listener = Some(ListenerHandle(handle));
      mock
   }

   pub(crate) fn push_batch(&self, batch: Vec<VideoEvent>) {
      self.state.lock().queue.push_back(batch);
      self.wake.notify_all();
   }

   pub(crate) fn push(&self, listener: ListenerHandle, kind: EventKind) {
      self.push_batch(vec![VideoEvent::new(listener, kind)]);
   }

   /// Simulates the library being torn down underneath a blocked poll.
   pub(crate) fn tear_down(&self) {
      self.state.lock().torn_down = true;
      self.wake.notify_all();
   }

   /// Makes subsequent `add_polled_listener` calls fail with `status`.
   pub(crate) fn fail_add(&self, status: Option<i32>) {
      self.state.lock().fail_add = status;
   }

   pub(crate) fn pollers_created(&self) -> usize {
      self.state.lock().pollers_created
   }

   pub(crate) fn pollers_destroyed(&self) -> Vec<PollerHandle> {
      self.state.lock().pollers_destroyed.clone()
   }

   pub(crate) fn live_poller(&self) -> Option<PollerHandle> {
      self.state.lock().live_poller
   }

   pub(crate) fn live_listeners(&self) -> usize {
      self.state.lock().listeners.len()
   }

   pub(crate) fn removed(&self) -> Vec<ListenerHandle> {
      self.state.lock().removed.clone()
   }
}

impl ListenerApi for MockApi {
   type Event = VideoEvent;

   fn create_listener_poller(&self) -> Result<PollerHandle> {
      let mut state = self.state.lock();
      let poller = PollerHandle(state.next_poller);
      state.next_poller += 1;
      state.pollers_created += 1;
      state.live_poller = Some(poller);
      state.cancel_pending = false;
      state.torn_down = false;
      Ok(poller)
   }

   fn add_polled_listener(
      &self,
      poller: PollerHandle,
      mask: EventMask,
      immediate_notify: bool,
   ) -> Result<ListenerHandle> {
      let mut state = self.state.lock();
      if let Some(status) = state.fail_add {
         return Err(Error::native("add_polled_listener", status));
      }
      assert_eq!(state.live_poller, Some(poller), "listener added to dead poller");

      let handle = match state.reused_listener {
         Some(handle) => handle,
         None => {
            state.next_listener += 1;
            ListenerHandle(state.next_listener - 1)
         },
      };
      state.listeners.insert(handle, mask);

      if immediate_notify {
         let burst = mask
            .kinds()
            .take(IMMEDIATE_BURST)
            .enumerate()
            .map(|(i, kind)| VideoEvent::new(handle, kind).with_value(i as i32))
            .collect();
         state.queue.push_back(burst);
         drop(state);
         self.wake.notify_all();
      }
      Ok(handle)
   }

   fn poll_listener(&self, poller: PollerHandle) -> Result<Vec<VideoEvent>> {
      let mut state = self.state.lock();
      loop {
         if state.torn_down || state.live_poller != Some(poller) {
            return Err(Error::Interrupted);
         }
         if let Some(batch) = state.queue.pop_front() {
            return Ok(batch);
         }
         if state.cancel_pending {
            state.cancel_pending = false;
            return Err(Error::Interrupted);
         }
         self.wake.wait(&mut state);
      }
   }

   fn cancel_poll_listener(&self, poller: PollerHandle) {
      let mut state = self.state.lock();
      if state.live_poller == Some(poller) {
         state.cancel_pending = true;
      }
      drop(state);
      self.wake.notify_all();
   }

   fn remove_listener(&self, listener: ListenerHandle) {
      let mut state = self.state.lock();
      state.listeners.remove(&listener);
      state.removed.push(listener);
   }

   fn destroy_listener_poller(&self, poller: PollerHandle) {
      let mut state = self.state.lock();
      assert_eq!(state.live_poller, Some(poller), "destroyed unknown poller");
      state.live_poller = None;
      state.pollers_destroyed.push(poller);
      self.wake.notify_all();
   }
}
