//! Periodic background maintenance for a shared [`BufferPool`]

use std::{
    sync::{Arc, Weak},
    thread::JoinHandle,
    time::Duration,
};

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use tracing::{debug, trace};

use crate::error::{DaguerreError, Result};

use super::pool::BufferPool;

/// Handle to a running maintenance thread; stops and joins it on drop
#[derive(Debug)]
pub struct MaintenanceHandle {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
    interval: Duration,
}

impl MaintenanceHandle {
    /// Interval between passes
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Stop the thread and wait for it to exit
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Dropping the sender disconnects the channel and wakes the thread.
        self.stop.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for MaintenanceHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl BufferPool {
    /// Run `maintain(false)` every `max_age / 2` on a background thread.
    ///
    /// The thread holds only a weak reference, so it exits once the pool is
    /// dropped or torn down even if the handle is leaked.
    pub fn start_maintenance(self: &Arc<Self>) -> Result<MaintenanceHandle> {
        let interval = self.config().maintenance_interval();
        let pool = Arc::downgrade(self);
        let (stop_tx, stop_rx) = bounded::<()>(0);

        let thread = std::thread::Builder::new()
            .name("daguerre-pool-maint".into())
            .spawn(move || run_maintenance(pool, interval, stop_rx))
            .map_err(|e| DaguerreError::dispatch(format!("failed to spawn maintenance thread: {}", e)))?;

        debug!(interval_ms = interval.as_millis() as u64, "Started pool maintenance");
        Ok(MaintenanceHandle {
            stop: Some(stop_tx),
            thread: Some(thread),
            interval,
        })
    }
}

fn run_maintenance(pool: Weak<BufferPool>, interval: Duration, stop: crossbeam_channel::Receiver<()>) {
    loop {
        match stop.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {
                let Some(pool) = pool.upgrade() else { break };
                if pool.is_torn_down() {
                    break;
                }
                let evicted = pool.maintain(false);
                trace!(evicted, "Periodic maintenance pass");
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    debug!("Pool maintenance stopped");
}
