//! The listener dispatcher.
//!
//! A single background thread blocks in the native poll and fans out each
//! returned event to the callback registered under the event's listener
//! handle. Registrations, drains and shutdown all coordinate through one
//! mutex and one condition variable.
//!
//! The poller and the thread are created lazily by the first registration.
//! Removing the last listener keeps both alive; they go away on
//! [`Dispatcher::shutdown`], on drop, or when the native layer interrupts the
//! poll on its own.
//!
//! Callbacks run on the dispatcher thread without the mutex held. A callback
//! may call back into the dispatcher, but registering or closing listeners
//! from inside a callback has no defined ordering with respect to events the
//! native layer already queued.

use std::{
   any::Any,
   panic::{self, AssertUnwindSafe},
   sync::{
      Arc,
      atomic::{AtomicU64, Ordering},
   },
   thread::{self, JoinHandle, ThreadId},
   time::{Duration, Instant},
};

use log::{debug, error, info, warn};
use parking_lot::{Condvar, Mutex};

use crate::{
   config::DispatcherConfig,
   error::{Error, Result},
   event::{EventMask, ListenerEvent},
   native::{ListenerApi, ListenerHandle, PollerHandle},
   registration::{ListenerOwner, Registration},
   registry::{EntryId, Registry},
};

/// Delivery counters, see [`Dispatcher::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
   /// Callbacks that returned normally.
   pub delivered: u64,
   /// Events whose listener had no registered callback.
   pub dropped: u64,
   /// Callbacks that panicked.
   pub faults: u64,
}

#[derive(Default)]
struct Counters {
   delivered: AtomicU64,
   dropped: AtomicU64,
   faults: AtomicU64,
}

struct State<E> {
   poller: Option<PollerHandle>,
   registry: Registry<E>,
   drain_requested: bool,
   drains_completed: u64,
   stop_requested: bool,
   thread: Option<JoinHandle<()>>,
   /// Set while the dispatcher thread runs, even after its handle was taken.
   dispatcher_id: Option<ThreadId>,
}

impl<E> State<E> {
   fn on_dispatcher_thread(&self) -> bool {
      self.dispatcher_id == Some(thread::current().id())
   }
}

struct Shared<N: ListenerApi> {
   native: N,
   config: DispatcherConfig,
   state: Mutex<State<N::Event>>,
   drained: Condvar,
   counters: Counters,
}

/// Multiplexes listener callbacks onto one polling thread.
pub struct Dispatcher<N: ListenerApi> {
   shared: Arc<Shared<N>>,
}

impl<N: ListenerApi> Dispatcher<N> {
   pub fn new(native: N) -> Self {
      Self::with_config(native, DispatcherConfig::default())
   }

   pub fn with_config(native: N, config: DispatcherConfig) -> Self {
      Self {
         shared: Arc::new(Shared {
            native,
            config,
            state: Mutex::new(State {
               poller: None,
               registry: Registry::new(),
               drain_requested: false,
               drains_completed: 0,
               stop_requested: false,
               thread: None,
               dispatcher_id: None,
            }),
            drained: Condvar::new(),
            counters: Counters::default(),
         }),
      }
   }

   /// Registers `callback` for events matching `mask`.
   ///
   /// With `immediate_notify` the native layer queues a burst of events
   /// describing its current state, delivered through the normal dispatch
   /// path. The first registration creates the poller and starts the
   /// dispatcher thread. On failure nothing is left behind.
   pub fn register<F>(
      &self,
      callback: F,
      mask: impl Into<EventMask>,
      immediate_notify: bool,
   ) -> Result<Registration>
   where
      F: Fn(&N::Event) + Send + Sync + 'static,
   {
      let mask = mask.into();
      if mask.is_empty() {
         return Err(Error::InvalidArgument("event mask must not be empty"));
      }

      let shared = &self.shared;
      let native = &shared.native;
      let mut state = shared.state.lock();
      if state.stop_requested {
         return Err(Error::ShuttingDown);
      }

      let handle = if let Some(poller) = state.poller {
         native.add_polled_listener(poller, mask, immediate_notify)?
      } else {
         // A thread that exited on its own already cleared the poller.
         if let Some(stale) = state.thread.take()
            && stale.join().is_err()
         {
            error!("Previous dispatcher thread panicked");
         }

         let poller = native.create_listener_poller()?;
         let handle = match native.add_polled_listener(poller, mask, immediate_notify) {
            Ok(handle) => handle,
            Err(e) => {
               native.destroy_listener_poller(poller);
               return Err(e);
            },
         };
         let thread = match Shared::spawn(shared, poller) {
            Ok(thread) => thread,
            Err(e) => {
               native.remove_listener(handle);
               native.destroy_listener_poller(poller);
               return Err(e);
            },
         };
         info!("Created listener poller {poller:?}");
         state.poller = Some(poller);
         state.dispatcher_id = Some(thread.thread().id());
         state.thread = Some(thread);
         handle
      };

      let entry = state.registry.insert(handle, Arc::new(callback));
      drop(state);

      debug!("Registered {handle} for {mask:?} (immediate: {immediate_notify})");
      let owner: Arc<dyn ListenerOwner> = shared.clone();
      Ok(Registration::new(owner, handle, entry))
   }

   /// Blocks until the dispatcher has handed out every batch the native
   /// layer queued before this call. Returns immediately if no poller exists.
   pub fn drain(&self) -> Result<()> {
      self.wait_drained(None)
   }

   /// Like [`drain`](Self::drain), giving up after `timeout`.
   pub fn drain_timeout(&self, timeout: Duration) -> Result<()> {
      self.wait_drained(Some(Instant::now() + timeout))
   }

   fn wait_drained(&self, deadline: Option<Instant>) -> Result<()> {
      let shared = &self.shared;
      let mut state = shared.state.lock();
      if state.poller.is_none() {
         return Ok(());
      }
      if state.on_dispatcher_thread() {
         return Err(Error::InvalidArgument("cannot drain from the dispatcher thread"));
      }

      // A round already in flight may have consumed its interruption before
      // our caller queued work, so joining it requires one more round.
      let target = state.drains_completed + if state.drain_requested { 2 } else { 1 };

      while state.drains_completed < target {
         let Some(poller) = state.poller else {
            break;
         };
         if !state.drain_requested {
            state.drain_requested = true;
            shared.native.cancel_poll_listener(poller);
         }
         match deadline {
            Some(deadline) => {
               if shared.drained.wait_until(&mut state, deadline).timed_out()
                  && state.drains_completed < target
                  && state.poller.is_some()
               {
                  return Err(Error::DrainTimeout);
               }
            },
            None => shared.drained.wait(&mut state),
         }
      }
      Ok(())
   }

   /// Stops the dispatcher thread, destroys the poller and deregisters every
   /// remaining listener. A later registration starts over from scratch.
   ///
   /// Returns once the thread has exited, also when another caller is
   /// already shutting down. Called from inside a callback, the thread is
   /// signalled but not waited for.
   pub fn shutdown(&self) {
      let shared = &self.shared;
      let mut state = shared.state.lock();
      if let Some(poller) = state.poller {
         state.stop_requested = true;
         shared.native.cancel_poll_listener(poller);
      }
      let on_dispatcher = state.on_dispatcher_thread();
      let thread = state.thread.take();
      let listeners = state.registry.take_all();
      drop(state);

      for (handle, _) in &listeners {
         shared.native.remove_listener(*handle);
      }
      drop(listeners);

      if on_dispatcher {
         return;
      }
      match thread {
         Some(thread) => {
            if thread.join().is_err() {
               error!("Dispatcher thread panicked");
            }
         },
         None => {
            // Another shutdown owns the handle, wait for the thread to exit.
            let mut state = shared.state.lock();
            while state.stop_requested && state.poller.is_some() {
               shared.drained.wait(&mut state);
            }
         },
      }
   }

   /// Whether a poller exists, and with it the dispatcher thread.
   pub fn is_running(&self) -> bool {
      self.shared.state.lock().poller.is_some()
   }

   pub fn listener_count(&self) -> usize {
      self.shared.state.lock().registry.len()
   }

   pub fn stats(&self) -> DispatchStats {
      let counters = &self.shared.counters;
      DispatchStats {
         delivered: counters.delivered.load(Ordering::Relaxed),
         dropped: counters.dropped.load(Ordering::Relaxed),
         faults: counters.faults.load(Ordering::Relaxed),
      }
   }

   pub fn config(&self) -> &DispatcherConfig {
      &self.shared.config
   }
}

impl<N: ListenerApi> Drop for Dispatcher<N> {
   fn drop(&mut self) {
      self.shutdown();
   }
}

impl<N: ListenerApi> Shared<N> {
   fn spawn(shared: &Arc<Self>, poller: PollerHandle) -> Result<JoinHandle<()>> {
      let mut builder = thread::Builder::new().name(shared.config.thread_name.to_string());
      if let Some(size) = shared.config.stack_size {
         builder = builder.stack_size(size);
      }
      let shared = shared.clone();
      Ok(builder.spawn(move || shared.run(poller))?)
   }

   fn run(self: Arc<Self>, poller: PollerHandle) {
      debug!("Dispatcher thread polling {poller:?}");
      let mut was_interrupted = false;

      loop {
         match self.native.poll_listener(poller) {
            Ok(events) => self.dispatch(events),
            Err(e) if e.is_interrupted() => {
               let mut state = self.state.lock();
               let drained = state.drain_requested;
               if drained {
                  state.drain_requested = false;
                  state.drains_completed += 1;
                  self.drained.notify_all();
               }
               if state.stop_requested {
                  break;
               }
               if drained {
                  continue;
               }
               // Torn down natively, the poller handle is no longer valid.
               was_interrupted = true;
               break;
            },
            Err(e) => {
               warn!("Listener poll on {poller:?} failed: {e}");
               break;
            },
         }
      }

      let mut state = self.state.lock();
      // Listeners of a torn down poller are gone natively as well.
      let orphaned = if was_interrupted {
         state.registry.take_all()
      } else {
         self.native.destroy_listener_poller(poller);
         Vec::new()
      };
      state.poller = None;
      state.dispatcher_id = None;
      state.drain_requested = false;
      state.stop_requested = false;
      self.drained.notify_all();
      drop(state);
      drop(orphaned);

      info!("Dispatcher thread exited (poller {poller:?}, interrupted: {was_interrupted})");
   }

   fn dispatch(&self, events: Vec<N::Event>) {
      for event in events {
         let handle = event.listener();
         let callback = self.state.lock().registry.get(handle);
         let Some(callback) = callback else {
            debug!("Dropping event for unregistered {handle}");
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            continue;
         };

         match panic::catch_unwind(AssertUnwindSafe(|| callback(&event))) {
            Ok(()) => {
               self.counters.delivered.fetch_add(1, Ordering::Relaxed);
            },
            Err(payload) => {
               self.counters.faults.fetch_add(1, Ordering::Relaxed);
               error!(
                  "Unhandled panic during listener callback for {handle}: {}",
                  panic_message(payload.as_ref())
               );
            },
         }
      }
   }
}

impl<N: ListenerApi> ListenerOwner for Shared<N> {
   fn deregister(&self, handle: ListenerHandle, entry: EntryId) {
      // Unregister first so events still queued natively find no callback.
      let removed = self.state.lock().registry.remove(handle, entry);
      let Some(callback) = removed else {
         return;
      };
      self.native.remove_listener(handle);
      drop(callback);
      debug!("Deregistered {handle}");
   }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
   if let Some(s) = payload.downcast_ref::<&'static str>() {
      *s
   } else if let Some(s) = payload.downcast_ref::<String>() {
      s.as_str()
   } else {
      "<non-string panic payload>"
   }
}
