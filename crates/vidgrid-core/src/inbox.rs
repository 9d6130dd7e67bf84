//! Cross-boundary mailbox.
//!
//! The pipeline owns every registry and lifecycle record and mutates them on
//! one execution path. Anything arriving from outside that path (load
//! completions, thumbnail results, user `touch` calls from another thread)
//! is pushed here and drained at the start of the next tick.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

pub struct Inbox<T> {
    queue: Arc<Mutex<VecDeque<T>>>,
}

impl<T> Clone for Inbox<T> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
        }
    }
}

impl<T> Default for Inbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Inbox<T> {
    pub fn new() -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    pub fn push(&self, value: T) {
        self.queue.lock().push_back(value);
    }

    /// Takes everything queued so far; items pushed while the caller processes
    /// the batch land in the next drain.
    pub fn drain(&self) -> Vec<T> {
        let mut q = self.queue.lock();
        q.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    pub fn clear(&self) {
        self.queue.lock().clear();
    }
}
