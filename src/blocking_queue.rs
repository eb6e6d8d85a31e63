use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

struct Inner<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Monitor-style FIFO queue for handing work to a fixed set of consumer
/// threads.
///
/// A single lock guards both the items and the closed flag, so a waiter's
/// predicate ("an item is available or the queue was closed") can never
/// observe a torn state between the two.
pub struct BlockingQueue<T> {
    inner: Mutex<Inner<T>>,
    available: Condvar,
}

impl<T> BlockingQueue<T> {
    pub fn new() -> Self {
        BlockingQueue {
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    // Consumers never panic while holding the lock (work runs outside it),
    // so a poisoned mutex carries no torn state and is safe to enter.
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends an item and wakes one blocked consumer, if any.
    pub fn push(&self, item: T) {
        let mut inner = self.lock();
        inner.items.push_back(item);
        self.available.notify_one();
    }

    /// Blocks until an item is available and returns it, or returns `None`
    /// once the queue has been closed.
    ///
    /// Close wins over queued items: a consumer that wakes up on a closed
    /// queue stops immediately instead of draining what is left. Callers
    /// that must not lose work have to consume everything they enqueued
    /// before closing.
    pub fn pop_blocking(&self) -> Option<T> {
        let mut inner = self.lock();
        loop {
            if inner.closed {
                return None;
            }
            if let Some(item) = inner.items.pop_front() {
                return Some(item);
            }
            inner = self
                .available
                .wait(inner)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Returns the next item if one is immediately available. Never blocks.
    pub fn try_pop(&self) -> Option<T> {
        self.lock().items.pop_front()
    }

    /// Instantaneous length snapshot. Advisory only: another thread may
    /// have pushed or popped by the time the caller looks at the value.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Advisory, see [`BlockingQueue::len`].
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Marks the queue closed and wakes every blocked consumer so it can
    /// observe the flag and return `None`.
    pub fn close(&self) {
        let mut inner = self.lock();
        inner.closed = true;
        self.available.notify_all();
    }
}

impl<T> Default for BlockingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
