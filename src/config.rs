//! Dispatcher configuration.
//!
//! The library never reads files or the environment on its own. Embedders
//! that keep their settings in TOML can hand the relevant fragment to
//! [`DispatcherConfig::from_toml`].

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::Result;

/// Settings applied when the dispatcher thread is spawned.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DispatcherConfig {
   #[serde(default = "default_thread_name")]
   pub thread_name: SmolStr,

   /// Stack size of the dispatcher thread in bytes, platform default if unset.
   #[serde(default)]
   pub stack_size: Option<usize>,
}

fn default_thread_name() -> SmolStr {
   SmolStr::new_static("VideoListener")
}

impl Default for DispatcherConfig {
   fn default() -> Self {
      Self {
         thread_name: default_thread_name(),
         stack_size: None,
      }
   }
}

impl DispatcherConfig {
   /// Parses a configuration fragment, filling missing keys with defaults.
   pub fn from_toml(contents: &str) -> Result<Self> {
      Ok(toml::from_str(contents)?)
   }

   pub fn thread_name(mut self, name: impl Into<SmolStr>) -> Self {
      self.thread_name = name.into();
      self
   }

   pub fn stack_size(mut self, bytes: usize) -> Self {
      self.stack_size = Some(bytes);
      self
   }
}
