//! Error types for the listener dispatcher.
//!
//! Registration failures are returned synchronously to the caller. Faults
//! raised by user callbacks never show up here; the dispatcher logs and
//! swallows them.

use thiserror::Error;

/// Main error type for listener registration and dispatch.
#[derive(Error, Debug)]
pub enum Error {
   #[error("Invalid argument: {0}")]
   InvalidArgument(&'static str),

   #[error("Native call {op} failed with status {status}")]
   Native { op: &'static str, status: i32 },

   /// Raised by the native poll when it was woken without events.
   #[error("Listener poll interrupted")]
   Interrupted,

   #[error("Failed to spawn dispatcher thread: {0}")]
   ThreadSpawn(#[from] std::io::Error),

   #[error("Timed out waiting for the dispatcher to drain")]
   DrainTimeout,

   #[error("Dispatcher is shutting down")]
   ShuttingDown,

   #[error("Global dispatcher not initialized")]
   NotInitialized,

   #[error("TOML parsing error: {0}")]
   TomlParse(#[from] toml::de::Error),
}

impl Error {
   pub const fn native(op: &'static str, status: i32) -> Self {
      Self::Native { op, status }
   }

   pub const fn is_interrupted(&self) -> bool {
      matches!(self, Self::Interrupted)
   }
}

/// Convenience type alias for Results with the crate [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
