//! Thread-safe in-process message queue.
//!
//! Two communication patterns share one queue:
//!
//! - **Fire-and-forget**: [`Queue::put`] / [`Queue::get`] / [`Queue::try_get`]
//! - **Request-response**: [`Queue::request`] blocks until another thread answers with
//!   [`Queue::respond_to`], addressed by the request's [`MsgUid`]
//!
//! Two variants differ only in capacity policy:
//!
//! - [`UnboundedQueue`] - growable storage, `put` never blocks
//! - [`BoundedQueue`] - fixed-capacity ring, `put` blocks while full
//!
//! # Example
//!
//! ```
//! use std::thread;
//! use msgq::{Msg, Timeout, UnboundedQueue};
//!
//! let queue: UnboundedQueue<Msg<&str>> = UnboundedQueue::new();
//!
//! thread::scope(|s| {
//!     s.spawn(|| {
//!         let req = queue.get(Timeout::Infinite).unwrap();
//!         queue.respond_to(req.uid(), Msg::new(2, "pong"));
//!     });
//!
//!     let reply = queue.request(Msg::new(1, "ping"), Timeout::Infinite).unwrap();
//!     assert_eq!(reply.map(|m| *m.payload()), Some("pong"));
//! });
//! ```

pub mod msg;
pub mod queue;
pub mod storage;

mod trace;

pub use msg::{Message, Msg, MsgUid};
pub use queue::{BoundedQueue, Queue, QueueError, Timeout, UnboundedQueue};
pub use storage::{CircularBuffer, Storage};
pub use trace::init_tracing;
