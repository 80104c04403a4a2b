//! Waitable counter of contexts attached to a container.

use parking_lot::{Condvar, Mutex};

/// Counts in-flight contexts; `wait` blocks until all of them are done.
#[derive(Default)]
pub(crate) struct GroupContext {
    count: Mutex<usize>,
    drained: Condvar,
}

impl GroupContext {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&self) {
        *self.count.lock() += 1;
    }

    pub(crate) fn done(&self) {
        let mut count = self.count.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.drained.notify_all();
        }
    }

    pub(crate) fn wait(&self) {
        let mut count = self.count.lock();
        while *count > 0 {
            self.drained.wait(&mut count);
        }
    }

    pub(crate) fn len(&self) -> usize {
        *self.count.lock()
    }
}
