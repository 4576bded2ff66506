//! Optional process-wide dispatcher.
//!
//! Nothing global exists until [`init`] is called. Applications that prefer
//! to own their [`Dispatcher`] never need this module.

use std::sync::{Arc, OnceLock};

use crate::{
   dispatcher::Dispatcher,
   error::{Error, Result},
   event::{EventMask, VideoEvent},
   native::ListenerApi,
   registration::Registration,
};

/// Type-erased native layer backing the global dispatcher.
pub type GlobalApi = Arc<dyn ListenerApi<Event = VideoEvent>>;

static GLOBAL: OnceLock<Dispatcher<GlobalApi>> = OnceLock::new();

/// Installs the process-wide dispatcher. Fails if one is already installed.
pub fn init(native: GlobalApi) -> Result<&'static Dispatcher<GlobalApi>> {
   let mut installed = false;
   let dispatcher = GLOBAL.get_or_init(|| {
      installed = true;
      Dispatcher::new(native)
   });
   if installed {
      Ok(dispatcher)
   } else {
      Err(Error::InvalidArgument("global dispatcher already initialized"))
   }
}

pub fn get() -> Option<&'static Dispatcher<GlobalApi>> {
   GLOBAL.get()
}

/// Registers `callback` with the global dispatcher.
pub fn register<F>(
   callback: F,
   mask: impl Into<EventMask>,
   immediate_notify: bool,
) -> Result<Registration>
where
   F: Fn(&VideoEvent) + Send + Sync + 'static,
{
   get()
      .ok_or(Error::NotInitialized)?
      .register(callback, mask, immediate_notify)
}
