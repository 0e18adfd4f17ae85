//! Blocking message queue with request-response support.
//!
//! # Locking
//!
//! Two independent mutexes:
//!
//! - the **storage** mutex guards the FIFO and pairs with two condition
//!   variables, `not_empty` (consumers wait on it) and `not_full` (producers
//!   of a bounded queue wait on it)
//! - the **correlator** mutex guards the table of outstanding requests, each
//!   of which carries its own condition variable
//!
//! Plain `put`/`get` never touch the correlator and `respond_to` never
//! touches storage. [`Queue::request`] is the only path that holds both, and
//! it always takes storage first, then the correlator.
//!
//! # Blocking `put`
//!
//! `put` on a full [`BoundedQueue`] waits for space with no timeout. If no
//! consumer ever drains the queue the producer blocks forever. Use
//! [`Queue::try_put`] where that is unacceptable.

mod correlator;

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};
use thiserror::Error;

use crate::msg::{Message, MsgUid};
use crate::storage::{CircularBuffer, Storage};
use crate::trace::{debug, trace, warn};

use correlator::Correlator;

/// Timeout specification for blocking operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timeout {
    /// Wait indefinitely.
    #[default]
    Infinite,
    /// Wait for at most the specified duration. A zero duration does not block.
    Duration(Duration),
}

impl Timeout {
    /// Builds a timeout from milliseconds, where `0` means wait indefinitely.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        if millis == 0 {
            Self::Infinite
        } else {
            Self::Duration(Duration::from_millis(millis))
        }
    }

    /// Absolute deadline measured from now, `None` if infinite.
    ///
    /// A duration too large to represent as an `Instant` waits indefinitely.
    fn deadline(self) -> Option<Instant> {
        match self {
            Self::Infinite => None,
            Self::Duration(d) => Instant::now().checked_add(d),
        }
    }
}

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        Self::Duration(d)
    }
}

/// Errors reported by queue construction and requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// A bounded queue was constructed with zero capacity.
    #[error("bounded queue capacity must be greater than 0")]
    ZeroCapacity,
    /// A request with this UID is already waiting for a response.
    #[error("request {0} is already outstanding")]
    DuplicateRequest(MsgUid),
}

/// Thread-safe FIFO message queue over storage `S`.
///
/// Usually named through [`UnboundedQueue`] or [`BoundedQueue`]. All methods
/// take `&self`; share the queue between threads with `Arc` or scoped threads.
pub struct Queue<M, S> {
    storage: Mutex<S>,
    /// Signalled when an item is pushed.
    not_empty: Condvar,
    /// Signalled when an item is popped from bounded storage.
    not_full: Condvar,
    bounded: bool,
    correlator: Correlator<M>,
}

/// Queue backed by growable storage; `put` never blocks.
pub type UnboundedQueue<M> = Queue<M, VecDeque<M>>;

/// Queue backed by a fixed-capacity ring; `put` blocks while full.
pub type BoundedQueue<M> = Queue<M, CircularBuffer<M>>;

impl<M: Message> Queue<M, VecDeque<M>> {
    /// Creates an empty unbounded queue.
    #[must_use]
    pub fn new() -> Self {
        debug!("unbounded queue created");
        Self::from_storage(VecDeque::new())
    }
}

impl<M: Message> Default for Queue<M, VecDeque<M>> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Message> Queue<M, CircularBuffer<M>> {
    /// Creates an empty bounded queue holding at most `max_items` messages.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::ZeroCapacity`] if `max_items` is 0: such a queue
    /// could never accept a message.
    pub fn new(max_items: usize) -> Result<Self, QueueError> {
        let Some(capacity) = NonZeroUsize::new(max_items) else {
            warn!("rejected bounded queue with zero capacity");
            return Err(QueueError::ZeroCapacity);
        };
        Ok(Self::with_capacity(capacity))
    }

    /// Creates an empty bounded queue with a capacity known to be non-zero.
    #[must_use]
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        debug!(capacity = capacity.get(), "bounded queue created");
        Self::from_storage(CircularBuffer::new(capacity))
    }
}

impl<M: Message, S: Storage<M>> Queue<M, S> {
    /// Wraps an existing (normally empty) storage backend.
    ///
    /// Messages already in `storage` are delivered first, in order.
    pub fn from_storage(storage: S) -> Self {
        Self {
            bounded: storage.capacity().is_some(),
            storage: Mutex::new(storage),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            correlator: Correlator::new(),
        }
    }

    /// Puts a message at the tail of the queue.
    ///
    /// On a full bounded queue this blocks, without timeout, until a consumer
    /// frees a slot.
    pub fn put(&self, msg: M) {
        let storage = self.enqueue(msg);
        drop(storage);
        self.not_empty.notify_one();
    }

    /// Puts a message at the tail of the queue without blocking.
    ///
    /// # Errors
    ///
    /// Returns `Err(msg)` if the queue is full, allowing retry.
    pub fn try_put(&self, msg: M) -> Result<(), M> {
        let mut storage = self.storage.lock();
        storage.push(msg)?;
        trace!(len = storage.len(), "message enqueued");
        drop(storage);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Takes the message at the head of the queue.
    ///
    /// Blocks until a message is available or `timeout` elapses. Returns
    /// `None` on timeout.
    #[must_use]
    pub fn get(&self, timeout: Timeout) -> Option<M> {
        let deadline = timeout.deadline();
        let mut storage = self.storage.lock();
        loop {
            if let Some(msg) = self.dequeue(&mut storage) {
                return Some(msg);
            }
            match deadline {
                None => self.not_empty.wait(&mut storage),
                Some(deadline) => {
                    if self.not_empty.wait_until(&mut storage, deadline).timed_out() {
                        // A put may have raced the deadline; its wakeup must not be lost.
                        let msg = self.dequeue(&mut storage);
                        if msg.is_none() {
                            trace!("get timed out");
                        }
                        return msg;
                    }
                }
            }
        }
    }

    /// Takes the message at the head of the queue without blocking.
    ///
    /// Returns `None` if the queue is empty.
    #[must_use]
    pub fn try_get(&self) -> Option<M> {
        self.dequeue(&mut self.storage.lock())
    }

    /// Puts `msg` on the queue and blocks until someone answers it with
    /// [`respond_to`](Queue::respond_to).
    ///
    /// The timeout covers the wait for the response; enqueueing on a full
    /// bounded queue blocks like [`put`](Queue::put). Returns `Ok(None)` on
    /// timeout.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::DuplicateRequest`] without enqueueing if a request
    /// with the same UID is still waiting.
    pub fn request(&self, msg: M, timeout: Timeout) -> Result<Option<M>, QueueError> {
        let uid = msg.uid();

        let mut storage = self.storage.lock();
        let mut msg = msg;
        // Registered before the message becomes visible, so a consumer can
        // never answer a request whose wait record does not exist yet.
        let pending = loop {
            // Checked before blocking on a full queue so a duplicate fails fast.
            if self.correlator.contains(uid) {
                warn!(%uid, "duplicate request uid");
                return Err(QueueError::DuplicateRequest(uid));
            }
            self.wait_for_space(&mut storage);
            let Some(pending) = self.correlator.register(uid) else {
                warn!(%uid, "duplicate request uid");
                return Err(QueueError::DuplicateRequest(uid));
            };
            match storage.push(msg) {
                Ok(()) => break pending,
                Err(returned) => msg = returned,
            }
        };
        trace!(%uid, len = storage.len(), "request enqueued");
        drop(storage);
        self.not_empty.notify_one();

        Ok(pending.wait(timeout.deadline()))
    }

    /// Answers the request identified by `req_uid`.
    ///
    /// Returns `true` if a matching request was waiting and now receives
    /// `response`. Returns `false` if it is unknown, already timed out or
    /// already answered; the response is dropped in that case.
    pub fn respond_to(&self, req_uid: MsgUid, response: M) -> bool {
        self.correlator.respond(req_uid, response)
    }

    /// Number of queued messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.storage.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.storage.lock().is_empty()
    }

    /// Maximum number of queued messages, or `None` if unbounded.
    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        self.storage.lock().capacity()
    }

    /// Number of [`request`](Queue::request) calls blocked waiting for a response.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.correlator.len()
    }

    /// Blocks on `not_full` until the next push will succeed.
    fn wait_for_space(&self, storage: &mut MutexGuard<'_, S>) {
        while storage.is_full() {
            trace!(len = storage.len(), "queue full, producer waiting");
            self.not_full.wait(storage);
        }
    }

    /// Pushes `msg`, waiting for space first. Returns the still-held guard.
    fn enqueue(&self, msg: M) -> MutexGuard<'_, S> {
        let mut storage = self.storage.lock();
        let mut msg = msg;
        loop {
            self.wait_for_space(&mut storage);
            match storage.push(msg) {
                Ok(()) => break,
                Err(returned) => msg = returned,
            }
        }
        trace!(len = storage.len(), "message enqueued");
        storage
    }

    /// Pops the head and wakes one producer blocked on a full queue.
    fn dequeue(&self, storage: &mut MutexGuard<'_, S>) -> Option<M> {
        let msg = storage.pop()?;
        trace!(uid = %msg.uid(), len = storage.len(), "message dequeued");
        if self.bounded {
            self.not_full.notify_one();
        }
        Some(msg)
    }
}
