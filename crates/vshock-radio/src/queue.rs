use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::RecvError;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Thread-safe FIFO with blocking pops.
///
/// Unbounded unless pushed through [`FrameQueue::push_bounded`].
#[derive(Debug)]
pub(crate) struct FrameQueue<T> {
    items: Mutex<VecDeque<T>>,
    ready: Condvar,
}

impl<T> FrameQueue<T> {
    pub(crate) fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            ready: Condvar::new(),
        }
    }

    pub(crate) fn push(&self, item: T) {
        lock(&self.items).push_back(item);
        self.ready.notify_one();
    }

    /// Push, discarding the oldest item once `capacity` is reached.
    /// Returns the discarded item.
    pub(crate) fn push_bounded(&self, item: T, capacity: usize) -> Option<T> {
        let mut items = lock(&self.items);
        let evicted = if capacity > 0 && items.len() >= capacity {
            items.pop_front()
        } else {
            None
        };
        items.push_back(item);
        drop(items);
        self.ready.notify_one();
        evicted
    }

    pub(crate) fn try_pop(&self) -> Option<T> {
        lock(&self.items).pop_front()
    }

    /// Pop one item, waiting per `block` and `timeout`.
    ///
    /// `block == false` never waits. `timeout == None` waits indefinitely.
    pub(crate) fn pop(&self, block: bool, timeout: Option<Duration>) -> Result<T, RecvError> {
        let mut items = lock(&self.items);
        if !block {
            return items.pop_front().ok_or(RecvError::Empty);
        }
        items = match timeout {
            Some(timeout) => {
                let (items, _) = self
                    .ready
                    .wait_timeout_while(items, timeout, |items| items.is_empty())
                    .unwrap_or_else(PoisonError::into_inner);
                items
            }
            None => self
                .ready
                .wait_while(items, |items| items.is_empty())
                .unwrap_or_else(PoisonError::into_inner),
        };
        items
            .pop_front()
            .ok_or(RecvError::Timeout(timeout.unwrap_or_default()))
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.items).len()
    }
}
