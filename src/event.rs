//! Camera-server events as seen by listeners.
//!
//! The dispatcher only ever looks at the listener handle an event was
//! generated for. Everything else in [`VideoEvent`] is passed through to the
//! callback untouched.

use std::{fmt, ops};

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use strum::IntoEnumIterator;

use crate::native::ListenerHandle;

/// Kinds of events generated by the camera server, one bit each.
#[repr(u32)]
#[derive(
   Debug,
   Clone,
   Copy,
   PartialEq,
   Eq,
   Hash,
   Serialize,
   Deserialize,
   strum::FromRepr,
   strum::Display,
   strum::EnumIter,
)]
pub enum EventKind {
   SourceCreated = 0x0001,
   SourceDestroyed = 0x0002,
   SourceConnected = 0x0004,
   SourceDisconnected = 0x0008,
   SourceVideoModesUpdated = 0x0010,
   SourceVideoModeChanged = 0x0020,
   SourcePropertyCreated = 0x0040,
   SourcePropertyValueUpdated = 0x0080,
   SourcePropertyChoicesUpdated = 0x0100,
   SinkSourceChanged = 0x0200,
   SinkCreated = 0x0400,
   SinkDestroyed = 0x0800,
   SinkEnabled = 0x1000,
   SinkDisabled = 0x2000,
   NetworkInterfacesChanged = 0x4000,
   Telemetry = 0x8000,
   SinkPropertyCreated = 0x10000,
   SinkPropertyValueUpdated = 0x20000,
   SinkPropertyChoicesUpdated = 0x40000,
   UsbCamerasChanged = 0x80000,
}

impl EventKind {
   pub const fn bits(self) -> u32 {
      self as u32
   }
}

/// Bitset of [`EventKind`] values a listener is interested in.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventMask(u32);

impl EventMask {
   pub const NONE: Self = Self(0);
   pub const ALL: Self = Self(0x000F_FFFF);

   pub const fn from_bits(bits: u32) -> Self {
      Self(bits)
   }

   pub const fn bits(self) -> u32 {
      self.0
   }

   pub const fn is_empty(self) -> bool {
      self.0 == 0
   }

   pub const fn contains(self, kind: EventKind) -> bool {
      self.0 & kind.bits() != 0
   }

   /// Iterates the known kinds set in this mask.
   pub fn kinds(self) -> impl Iterator<Item = EventKind> {
      EventKind::iter().filter(move |k| self.contains(*k))
   }
}

impl From<EventKind> for EventMask {
   fn from(kind: EventKind) -> Self {
      Self(kind.bits())
   }
}

impl FromIterator<EventKind> for EventMask {
   fn from_iter<I: IntoIterator<Item = EventKind>>(iter: I) -> Self {
      iter.into_iter().fold(Self::NONE, |mask, kind| mask | kind)
   }
}

impl<T: Into<Self>> ops::BitOr<T> for EventMask {
   type Output = Self;

   fn bitor(self, rhs: T) -> Self {
      Self(self.0 | rhs.into().0)
   }
}

impl ops::BitOr for EventKind {
   type Output = EventMask;

   fn bitor(self, rhs: Self) -> EventMask {
      EventMask(self.bits() | rhs.bits())
   }
}

impl fmt::Debug for EventMask {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      write!(f, "EventMask({:#x})", self.0)
   }
}

/// An event record that knows which listener it was generated for.
pub trait ListenerEvent: Send + 'static {
   fn listener(&self) -> ListenerHandle;
}

/// An event emitted by the camera server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoEvent {
   pub listener: ListenerHandle,
   pub kind: EventKind,

   #[serde(default)]
   pub source: i32,
   #[serde(default)]
   pub sink: i32,
   #[serde(default)]
   pub name: SmolStr,
   #[serde(default)]
   pub property: i32,
   #[serde(default)]
   pub value: i32,
   #[serde(default)]
   pub value_str: SmolStr,
}

impl VideoEvent {
   /// Creates an event with an empty payload.
   pub fn new(listener: ListenerHandle, kind: EventKind) -> Self {
      Self {
         listener,
         kind,
         source: 0,
         sink: 0,
         name: SmolStr::default(),
         property: 0,
         value: 0,
         value_str: SmolStr::default(),
      }
   }

   pub fn with_source(mut self, source: i32, name: impl Into<SmolStr>) -> Self {
      self.source = source;
      self.name = name.into();
      self
   }

   pub fn with_value(mut self, value: i32) -> Self {
      self.value = value;
      self
   }
}

impl ListenerEvent for VideoEvent {
   fn listener(&self) -> ListenerHandle {
      self.listener
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_kind_bits_are_distinct() {
      let mut seen = 0u32;
      for kind in EventKind::iter() {
         assert_eq!(kind.bits().count_ones(), 1, "{kind} is not a single bit");
         assert_eq!(seen & kind.bits(), 0, "{kind} overlaps another kind");
         seen |= kind.bits();
      }
      assert_eq!(EventMask::from_bits(seen), EventMask::ALL);
   }

   #[test]
   fn test_mask_composition() {
      let mask = EventKind::SourceCreated | EventKind::SinkEnabled;
      assert!(mask.contains(EventKind::SourceCreated));
      assert!(mask.contains(EventKind::SinkEnabled));
      assert!(!mask.contains(EventKind::Telemetry));

      let mask = mask | EventKind::Telemetry;
      assert_eq!(
         mask.kinds().collect::<Vec<_>>(),
         [
            EventKind::SourceCreated,
            EventKind::SinkEnabled,
            EventKind::Telemetry
         ]
      );
      assert_eq!(mask, mask.kinds().collect::<EventMask>());
   }

   #[test]
   fn test_empty_mask() {
      assert!(EventMask::NONE.is_empty());
      assert!(EventMask::default().is_empty());
      assert!(!EventMask::from_bits(0xFF).is_empty());
      assert_eq!(EventMask::from_bits(0xFF).kinds().count(), 8);
   }

   #[test]
   fn test_kind_from_repr() {
      assert_eq!(EventKind::from_repr(0x0400), Some(EventKind::SinkCreated));
      assert_eq!(EventKind::from_repr(0x0003), None);
   }
}
