//! Listener callbacks for camera-server events.
//!
//! The native camera-server library reports state changes through a polled
//! listener API: a caller creates a poller, adds listeners to it, and blocks
//! in a poll call that returns batches of events. This crate multiplexes any
//! number of user callbacks onto one such poller and one background thread.
//!
//! ```ignore
//! let dispatcher = Dispatcher::new(native);
//! let reg = dispatcher.register(
//!    |event: &VideoEvent| println!("{:?} on source {}", event.kind, event.source),
//!    EventKind::SourceConnected | EventKind::SourceDisconnected,
//!    true,
//! )?;
//! ```
//!
//! The dispatcher thread does not keep the process alive. Use
//! [`Dispatcher::drain`] to wait for queued events and
//! [`Dispatcher::shutdown`] for an orderly stop.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod global;
pub mod native;
pub mod registration;
mod registry;

pub use config::DispatcherConfig;
pub use dispatcher::{DispatchStats, Dispatcher};
pub use error::{Error, Result};
pub use event::{EventKind, EventMask, ListenerEvent, VideoEvent};
pub use native::{ListenerApi, ListenerHandle, PollerHandle};
pub use registration::Registration;
pub use registry::Callback;
