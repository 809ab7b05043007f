//! Thread-safe double-ended queue.
//!
//! # Why a queue? (for beginners)
//!
//! The engine has two kinds of threads touching the same data:
//!
//! - The **I/O thread** reads messages off sockets and writes messages onto
//!   them.
//! - The **application thread** builds outbound messages and consumes
//!   inbound ones whenever it likes.
//!
//! A [`ThreadSafeDeque`] is the single hand-off point between them.  Every
//! operation takes one internal lock for its whole duration, so a push from
//! the I/O thread and a pop from the application thread can never observe a
//! half-updated container.
//!
//! # Check-then-pop
//!
//! Calling [`ThreadSafeDeque::is_empty`] and then [`ThreadSafeDeque::pop_front`]
//! is two separate lock acquisitions.  With more than one consumer another
//! thread can drain the queue in between.  [`ThreadSafeDeque::try_pop_front`]
//! performs both steps under one lock and is what the engines use.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

/// A double-ended queue where every operation is mutually exclusive.
///
/// # Examples
///
/// ```rust
/// use tcpmsg_core::ThreadSafeDeque;
///
/// let queue = ThreadSafeDeque::new();
/// queue.push_back(1);
/// queue.push_back(2);
/// queue.push_front(0);
/// assert_eq!(queue.len(), 3);
/// assert_eq!(queue.try_pop_front(), Some(0));
/// assert_eq!(queue.try_pop_back(), Some(2));
/// ```
pub struct ThreadSafeDeque<T> {
    inner: Mutex<VecDeque<T>>,
}

impl<T> ThreadSafeDeque<T> {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
        }
    }

    /// Appends an item at the back.
    pub fn push_back(&self, item: T) {
        self.lock().push_back(item);
    }

    /// Inserts an item at the front.
    pub fn push_front(&self, item: T) {
        self.lock().push_front(item);
    }

    /// Removes and returns the front item, or `None` when empty.
    ///
    /// Callers that first check [`is_empty`](Self::is_empty) should prefer
    /// [`try_pop_front`](Self::try_pop_front); the result is identical but the
    /// intent is clearer.
    pub fn pop_front(&self) -> Option<T> {
        self.lock().pop_front()
    }

    /// Removes and returns the back item, or `None` when empty.
    pub fn pop_back(&self) -> Option<T> {
        self.lock().pop_back()
    }

    /// Atomically checks for an item and removes it from the front.
    pub fn try_pop_front(&self) -> Option<T> {
        let mut guard = self.lock();
        if guard.is_empty() {
            None
        } else {
            guard.pop_front()
        }
    }

    /// Atomically checks for an item and removes it from the back.
    pub fn try_pop_back(&self) -> Option<T> {
        let mut guard = self.lock();
        if guard.is_empty() {
            None
        } else {
            guard.pop_back()
        }
    }

    /// Number of queued items.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` when no items are queued.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drops every queued item.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Acquires the lock, recovering the data if a previous holder panicked.
    ///
    /// The container is only ever mutated through single `VecDeque` calls, so
    /// a panic elsewhere cannot leave it in an inconsistent state.
    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T: Clone> ThreadSafeDeque<T> {
    /// Returns a copy of the front item without removing it.
    ///
    /// A reference cannot be handed out because it would outlive the lock.
    pub fn front(&self) -> Option<T> {
        self.lock().front().cloned()
    }

    /// Returns a copy of the back item without removing it.
    pub fn back(&self) -> Option<T> {
        self.lock().back().cloned()
    }
}

impl<T> Default for ThreadSafeDeque<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for ThreadSafeDeque<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T> fmt::Debug for ThreadSafeDeque<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadSafeDeque")
            .field("len", &self.len())
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_new_queue_is_empty() {
        let queue: ThreadSafeDeque<u32> = ThreadSafeDeque::new();
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_push_back_then_pop_front_is_fifo() {
        // Arrange
        let queue = ThreadSafeDeque::new();
        queue.push_back("a");
        queue.push_back("b");
        queue.push_back("c");

        // Act
        let drained: Vec<_> = std::iter::from_fn(|| queue.try_pop_front()).collect();

        // Assert
        assert_eq!(drained, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_push_back_then_pop_back_is_lifo() {
        let queue = ThreadSafeDeque::new();
        queue.push_back(1);
        queue.push_back(2);
        assert_eq!(queue.pop_back(), Some(2));
        assert_eq!(queue.pop_back(), Some(1));
        assert_eq!(queue.pop_back(), None);
    }

    #[test]
    fn test_push_front_places_item_ahead_of_existing() {
        let queue = ThreadSafeDeque::new();
        queue.push_back(2);
        queue.push_front(1);
        assert_eq!(queue.front(), Some(1));
        assert_eq!(queue.back(), Some(2));
    }

    #[test]
    fn test_front_and_back_do_not_remove() {
        let queue = ThreadSafeDeque::new();
        queue.push_back(7);
        assert_eq!(queue.front(), Some(7));
        assert_eq!(queue.back(), Some(7));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_pop_on_empty_queue_returns_none() {
        let queue: ThreadSafeDeque<u8> = ThreadSafeDeque::new();
        assert_eq!(queue.pop_front(), None);
        assert_eq!(queue.try_pop_front(), None);
        assert_eq!(queue.try_pop_back(), None);
        assert_eq!(queue.front(), None);
    }

    #[test]
    fn test_clear_removes_everything() {
        let queue = ThreadSafeDeque::new();
        for i in 0..10 {
            queue.push_back(i);
        }
        queue.clear();
        assert!(queue.is_empty());
    }

    #[test]
    fn test_drop_releases_queued_items() {
        // Arrange – an Arc whose strong count tells us whether the queue
        // still holds a clone.
        let tracked = Arc::new(());
        let queue = ThreadSafeDeque::new();
        queue.push_back(Arc::clone(&tracked));
        assert_eq!(Arc::strong_count(&tracked), 2);

        // Act
        drop(queue);

        // Assert
        assert_eq!(Arc::strong_count(&tracked), 1);
    }

    #[test]
    fn test_debug_prints_length() {
        let queue = ThreadSafeDeque::new();
        queue.push_back(1u8);
        assert_eq!(format!("{queue:?}"), "ThreadSafeDeque { len: 1 }");
    }

    #[test]
    fn test_concurrent_producers_lose_and_duplicate_nothing() {
        // Arrange
        const PRODUCERS: usize = 4;
        const PER_PRODUCER: usize = 1_000;
        let queue = Arc::new(ThreadSafeDeque::new());

        // Act – four producers push while one consumer drains.
        let producers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        queue.push_back(p * PER_PRODUCER + i);
                    }
                })
            })
            .collect();

        let mut seen = HashSet::new();
        while seen.len() < PRODUCERS * PER_PRODUCER {
            if let Some(item) = queue.try_pop_front() {
                assert!(seen.insert(item), "item {item} popped twice");
            } else {
                thread::yield_now();
            }
        }
        for producer in producers {
            producer.join().unwrap();
        }

        // Assert
        assert!(queue.is_empty());
        assert_eq!(seen.len(), PRODUCERS * PER_PRODUCER);
    }

    #[test]
    fn test_per_producer_order_is_preserved() {
        let queue = Arc::new(ThreadSafeDeque::new());
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..500u32 {
                    queue.push_back(i);
                }
            })
        };
        producer.join().unwrap();

        let drained: Vec<_> = std::iter::from_fn(|| queue.try_pop_front()).collect();
        assert_eq!(drained, (0..500).collect::<Vec<_>>());
    }

    #[test]
    fn test_competing_consumers_each_item_popped_once() {
        // Arrange
        let queue = Arc::new(ThreadSafeDeque::new());
        for i in 0..2_000u32 {
            queue.push_back(i);
        }

        // Act – two consumers race on try_pop_front.
        let consumers: Vec<_> = (0..2)
            .map(|_| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    let mut taken = Vec::new();
                    while let Some(item) = queue.try_pop_front() {
                        taken.push(item);
                    }
                    taken
                })
            })
            .collect();
        let mut all: Vec<u32> = consumers
            .into_iter()
            .flat_map(|c| c.join().unwrap())
            .collect();

        // Assert
        all.sort_unstable();
        assert_eq!(all, (0..2_000).collect::<Vec<_>>());
    }
}
