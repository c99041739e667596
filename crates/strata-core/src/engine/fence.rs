//! Pending-work counters used to block until enqueued work completes.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

/// Counts in-flight work items and lets callers wait for zero.
#[derive(Debug, Default)]
pub struct Fence {
    pending: Mutex<usize>,
    idle: Condvar,
}

impl Fence {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register one work item. It completes when the guard drops, even if
    /// the work panics.
    pub fn enter(self: &Arc<Self>) -> FenceGuard {
        *self.pending.lock() += 1;
        FenceGuard {
            fence: Arc::clone(self),
        }
    }

    /// Block until every registered item has completed.
    pub fn wait(&self) {
        let mut pending = self.pending.lock();
        while *pending > 0 {
            self.idle.wait(&mut pending);
        }
    }

    pub fn is_idle(&self) -> bool {
        *self.pending.lock() == 0
    }
}

/// Marks one in-flight work item of a [`Fence`].
#[derive(Debug)]
pub struct FenceGuard {
    fence: Arc<Fence>,
}

impl Drop for FenceGuard {
    fn drop(&mut self) {
        let mut pending = self.fence.pending.lock();
        *pending -= 1;
        if *pending == 0 {
            self.fence.idle.notify_all();
        }
    }
}
