//! Execution streams: ordered queues of engine work.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use super::fence::Fence;
use crate::error::StrataError;
use crate::Result;

/// A unit of enqueued work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// An ordered, possibly asynchronous command queue.
///
/// Tasks run in submission order. `synchronize` blocks until every task
/// submitted before the call has finished.
pub trait Stream: Send + Sync + fmt::Debug {
    fn submit(&self, task: Task) -> Result<()>;

    fn synchronize(&self) -> Result<()>;

    fn is_asynchronous(&self) -> bool;
}

/// Runs every task inline on the submitting thread.
#[derive(Debug, Default)]
pub struct ImmediateStream;

impl ImmediateStream {
    pub fn new() -> Self {
        Self
    }
}

impl Stream for ImmediateStream {
    fn submit(&self, task: Task) -> Result<()> {
        task();
        Ok(())
    }

    fn synchronize(&self) -> Result<()> {
        Ok(())
    }

    fn is_asynchronous(&self) -> bool {
        false
    }
}

/// Runs tasks on a single background thread, in FIFO order.
pub struct WorkerStream {
    sender: Mutex<Option<mpsc::Sender<Task>>>,
    outstanding: Arc<Fence>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl WorkerStream {
    pub fn new() -> Result<Self> {
        let (sender, receiver) = mpsc::channel::<Task>();
        let worker = thread::Builder::new()
            .name("strata-stream".into())
            .spawn(move || {
                for task in receiver {
                    if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
                        tracing::error!("stream task panicked; continuing with next task");
                    }
                }
                tracing::trace!("stream worker exiting");
            })
            .map_err(|e| StrataError::Engine(format!("failed to spawn stream worker: {e}")))?;
        Ok(Self {
            sender: Mutex::new(Some(sender)),
            outstanding: Fence::new(),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Whether every submitted task has finished.
    pub fn is_idle(&self) -> bool {
        self.outstanding.is_idle()
    }
}

impl Stream for WorkerStream {
    fn submit(&self, task: Task) -> Result<()> {
        let guard = self.outstanding.enter();
        let sender = self.sender.lock();
        let sender = sender
            .as_ref()
            .ok_or_else(|| StrataError::Engine("stream is shut down".into()))?;
        sender
            .send(Box::new(move || {
                let _guard = guard;
                task();
            }))
            .map_err(|_| StrataError::Engine("stream worker has exited".into()))
    }

    fn synchronize(&self) -> Result<()> {
        tracing::trace!("synchronizing worker stream");
        self.outstanding.wait();
        Ok(())
    }

    fn is_asynchronous(&self) -> bool {
        true
    }
}

impl fmt::Debug for WorkerStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerStream")
            .field("idle", &self.outstanding.is_idle())
            .finish()
    }
}

impl Drop for WorkerStream {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain what is queued and exit.
        self.sender.lock().take();
        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                tracing::error!("stream worker panicked during shutdown");
            }
        }
    }
}
