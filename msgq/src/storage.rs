//! FIFO storage backends for [`Queue`](crate::Queue).
//!
//! The queue owns all synchronization; a backend only has to keep items in
//! order and report whether it can accept another one.
//!
//! - [`VecDeque`] - unbounded, never full
//! - [`CircularBuffer`] - fixed capacity ring buffer

mod circular;

pub use circular::CircularBuffer;

use std::collections::VecDeque;

/// Ordered container of owned items.
///
/// Implementations must preserve FIFO order: items come out of [`pop`] in the
/// order they went into [`push`].
///
/// [`push`]: Storage::push
/// [`pop`]: Storage::pop
pub trait Storage<T> {
    /// Appends an item at the tail.
    ///
    /// # Errors
    ///
    /// Returns `Err(item)` if the storage is full, handing the item back.
    fn push(&mut self, item: T) -> Result<(), T>;

    /// Removes the item at the head, or `None` if empty.
    fn pop(&mut self) -> Option<T>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if the next [`push`](Storage::push) would fail.
    fn is_full(&self) -> bool;

    /// Maximum number of items, or `None` if unbounded.
    fn capacity(&self) -> Option<usize>;
}

impl<T> Storage<T> for VecDeque<T> {
    #[inline]
    fn push(&mut self, item: T) -> Result<(), T> {
        self.push_back(item);
        Ok(())
    }

    #[inline]
    fn pop(&mut self) -> Option<T> {
        self.pop_front()
    }

    #[inline]
    fn len(&self) -> usize {
        VecDeque::len(self)
    }

    #[inline]
    fn is_full(&self) -> bool {
        false
    }

    #[inline]
    fn capacity(&self) -> Option<usize> {
        None
    }
}
