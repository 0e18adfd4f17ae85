//! Fixed-capacity circular buffer.
//!
//! Slots are allocated once at construction and reused as the head and tail
//! indices wrap. The buffer never reallocates, so memory use is bounded by the
//! configured capacity.

use std::num::NonZeroUsize;

use super::Storage;

/// Bounded FIFO ring buffer.
///
/// Not synchronized on its own; [`Queue`](crate::Queue) wraps it in a mutex.
#[derive(Debug)]
pub struct CircularBuffer<T> {
    /// Ring slots; `Some` exactly for the `len` slots starting at `head`.
    slots: Box<[Option<T>]>,
    /// Index of the oldest item.
    head: usize,
    /// Number of occupied slots.
    len: usize,
}

impl<T> CircularBuffer<T> {
    /// Creates an empty buffer holding at most `capacity` items.
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            slots: std::iter::repeat_with(|| None)
                .take(capacity.get())
                .collect(),
            head: 0,
            len: 0,
        }
    }

    #[inline]
    fn cap(&self) -> usize {
        self.slots.len()
    }

    /// Slot index of the `offset`-th item after the head.
    #[inline]
    fn index(&self, offset: usize) -> usize {
        (self.head + offset) % self.cap()
    }

    /// Iterates items from head to tail without removing them.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        (0..self.len).filter_map(move |offset| self.slots[self.index(offset)].as_ref())
    }
}

impl<T> Storage<T> for CircularBuffer<T> {
    fn push(&mut self, item: T) -> Result<(), T> {
        if self.is_full() {
            return Err(item);
        }
        let tail = self.index(self.len);
        self.slots[tail] = Some(item);
        self.len += 1;
        Ok(())
    }

    fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let item = self.slots[self.head].take();
        self.head = self.index(1);
        self.len -= 1;
        item
    }

    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn is_full(&self) -> bool {
        self.len == self.cap()
    }

    #[inline]
    fn capacity(&self) -> Option<usize> {
        Some(self.cap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer<T>(cap: usize) -> CircularBuffer<T> {
        CircularBuffer::new(NonZeroUsize::new(cap).unwrap())
    }

    #[test]
    fn test_basic_push_pop() {
        let mut ring = buffer::<u64>(8);

        assert!(ring.push(42).is_ok());
        assert_eq!(ring.pop(), Some(42));
        assert_eq!(ring.pop(), None);
    }

    #[test]
    fn test_full() {
        let mut ring = buffer::<u64>(4);

        for i in 0..4 {
            assert!(ring.push(i).is_ok(), "Failed to push item {i}");
        }
        assert!(ring.is_full());
        assert_eq!(ring.push(999), Err(999));

        assert_eq!(ring.pop(), Some(0));
        assert!(ring.push(4).is_ok());
        assert_eq!(ring.push(1000), Err(1000));
        assert_eq!(ring.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_wrapping_behavior() {
        let mut ring = buffer::<u64>(3);

        for round in 0..5 {
            for i in 0..3 {
                assert!(ring.push(round * 10 + i).is_ok());
            }
            for i in 0..3 {
                assert_eq!(ring.pop(), Some(round * 10 + i));
            }
            assert!(ring.is_empty());
        }
    }

    #[test]
    fn test_interleaved_operations() {
        let mut ring = buffer::<u64>(2);

        ring.push(1).unwrap();
        ring.push(2).unwrap();
        assert_eq!(ring.pop(), Some(1));
        ring.push(3).unwrap();
        assert_eq!(ring.pop(), Some(2));
        assert_eq!(ring.pop(), Some(3));
        ring.push(4).unwrap();
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.pop(), Some(4));
        assert_eq!(ring.pop(), None);
    }

    #[test]
    fn test_capacity_one() {
        let mut ring = buffer::<&str>(1);
        assert_eq!(ring.capacity(), Some(1));
        ring.push("a").unwrap();
        assert_eq!(ring.push("b"), Err("b"));
        assert_eq!(ring.pop(), Some("a"));
        ring.push("b").unwrap();
        assert_eq!(ring.pop(), Some("b"));
    }

    #[test]
    fn test_drops_remaining_items() {
        use std::rc::Rc;

        let tracker = Rc::new(());
        {
            let mut ring = buffer(4);
            ring.push(Rc::clone(&tracker)).unwrap();
            ring.push(Rc::clone(&tracker)).unwrap();
            assert_eq!(Rc::strong_count(&tracker), 3);
        }
        assert_eq!(Rc::strong_count(&tracker), 1);
    }
}
