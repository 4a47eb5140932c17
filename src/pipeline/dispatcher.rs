//! Owner-thread task queue
//!
//! Texture resources are only touched by tasks run on the dispatcher's owner
//! thread. Any thread may enqueue; only the owner may run.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, ThreadId},
    time::Duration,
};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::trace;

use crate::error::{DaguerreError, Result};

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Cloneable sending side of a [`MainThreadDispatcher`]
#[derive(Clone)]
pub struct DispatchQueue {
    sender: Sender<Task>,
    closed: Arc<AtomicBool>,
}

impl std::fmt::Debug for DispatchQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchQueue")
            .field("pending", &self.sender.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl DispatchQueue {
    /// Schedule `task` on the owner thread
    pub fn enqueue<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_closed() {
            return Err(DaguerreError::dispatch("dispatcher is closed"));
        }
        self.sender
            .send(Box::new(task))
            .map_err(|_| DaguerreError::dispatch("dispatcher has been dropped"))
    }

    /// Refuse new tasks; queued ones still run
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Single-threaded executor bound to one owner thread
pub struct MainThreadDispatcher {
    queue: DispatchQueue,
    receiver: Receiver<Task>,
    owner: Mutex<ThreadId>,
}

impl std::fmt::Debug for MainThreadDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MainThreadDispatcher")
            .field("owner", &*self.owner.lock())
            .field("pending", &self.pending())
            .finish()
    }
}

impl Default for MainThreadDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MainThreadDispatcher {
    /// Create a dispatcher owned by the calling thread
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            queue: DispatchQueue {
                sender,
                closed: Arc::new(AtomicBool::new(false)),
            },
            receiver,
            owner: Mutex::new(thread::current().id()),
        }
    }

    pub fn queue(&self) -> DispatchQueue {
        self.queue.clone()
    }

    pub fn enqueue<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.queue.enqueue(task)
    }

    /// Move ownership to the calling thread
    pub fn bind_to_current_thread(&self) {
        *self.owner.lock() = thread::current().id();
    }

    pub fn is_owner_thread(&self) -> bool {
        *self.owner.lock() == thread::current().id()
    }

    /// Tasks waiting to run
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Run every queued task, including ones queued by tasks run here.
    /// Returns how many ran.
    pub fn run_pending(&self) -> Result<usize> {
        self.check_owner()?;
        let mut ran = 0;
        while let Ok(task) = self.receiver.try_recv() {
            task();
            ran += 1;
        }
        if ran > 0 {
            trace!(ran, "Ran dispatched tasks");
        }
        Ok(ran)
    }

    /// Wait up to `timeout` for a task, then run everything queued
    pub fn run_for(&self, timeout: Duration) -> Result<usize> {
        self.check_owner()?;
        match self.receiver.recv_timeout(timeout) {
            Ok(task) => {
                task();
                Ok(1 + self.run_pending()?)
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => Ok(0),
        }
    }

    pub fn close(&self) {
        self.queue.close();
    }

    fn check_owner(&self) -> Result<()> {
        if !self.is_owner_thread() {
            return Err(DaguerreError::dispatch(
                "dispatched tasks may only run on the owner thread",
            ));
        }
        Ok(())
    }
}
