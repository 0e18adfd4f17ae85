//! Message envelope and unique identifiers.
//!
//! The queue only needs one thing from a message: a stable [`MsgUid`] that
//! identifies it among everything else in flight. [`Message`] expresses that
//! contract; [`Msg`] is a ready-made envelope carrying an application-defined
//! kind and an owned payload.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide UID counter. 0 is never handed out.
static NEXT_UID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier of a message, used to correlate responses with requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct MsgUid(u64);

impl MsgUid {
    /// Allocates a fresh identifier.
    ///
    /// Identifiers increase monotonically and are unique within the process.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_UID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wraps a raw identifier.
    ///
    /// Intended for custom [`Message`] implementations that carry their own
    /// identifier scheme; uniqueness is then the caller's responsibility.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<MsgUid> for u64 {
    fn from(uid: MsgUid) -> Self {
        uid.0
    }
}

impl fmt::Display for MsgUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Anything that can travel through a [`Queue`](crate::Queue).
///
/// The UID must not change while the message is owned by the queue, and no
/// two messages in flight at the same time may share one.
pub trait Message {
    /// Returns the message's unique identifier.
    fn uid(&self) -> MsgUid;
}

impl<M: Message + ?Sized> Message for Box<M> {
    fn uid(&self) -> MsgUid {
        (**self).uid()
    }
}

/// Basic message envelope.
///
/// Carries an application-defined kind (`id`), a [`MsgUid`] assigned at
/// construction and an owned payload. `Msg` is deliberately not `Clone`: a
/// message has exactly one owner at a time as it moves through the queue.
#[derive(Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Msg<P = ()> {
    id: i32,
    uid: MsgUid,
    payload: P,
}

impl Msg<()> {
    /// Creates a payload-less message of the given kind.
    #[must_use]
    pub fn signal(id: i32) -> Self {
        Self::new(id, ())
    }
}

impl<P> Msg<P> {
    /// Creates a message with a freshly allocated UID.
    #[must_use]
    pub fn new(id: i32, payload: P) -> Self {
        Self {
            id,
            uid: MsgUid::next(),
            payload,
        }
    }

    /// Application-defined message kind.
    #[must_use]
    pub const fn id(&self) -> i32 {
        self.id
    }

    /// Unique identifier assigned at construction.
    #[must_use]
    pub const fn uid(&self) -> MsgUid {
        self.uid
    }

    #[must_use]
    pub const fn payload(&self) -> &P {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut P {
        &mut self.payload
    }

    /// Consumes the message, returning its payload.
    #[must_use]
    pub fn into_payload(self) -> P {
        self.payload
    }
}

impl<P> Message for Msg<P> {
    fn uid(&self) -> MsgUid {
        self.uid
    }
}
