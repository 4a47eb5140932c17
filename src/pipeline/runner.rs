//! Worker thread feeding native events into a [`CaptureStateMachine`]

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    thread::JoinHandle,
};

use crossbeam_channel::{bounded, select, Receiver, Sender};
use tracing::debug;

use crate::{
    error::{DaguerreError, Result},
    session::NativeEvent,
};

use super::machine::CaptureStateMachine;

/// Consumes the native event channel until stopped or disconnected
#[derive(Debug)]
pub struct PipelineRunner {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
    processed: Arc<AtomicU64>,
}

impl PipelineRunner {
    pub fn spawn(machine: Arc<CaptureStateMachine>, receiver: Receiver<NativeEvent>) -> Result<Self> {
        let (stop_tx, stop_rx) = bounded::<()>(0);
        let processed = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&processed);

        let thread = std::thread::Builder::new()
            .name("daguerre-pipeline".into())
            .spawn(move || {
                loop {
                    select! {
                        recv(receiver) -> event => match event {
                            Ok(event) => {
                                machine.handle_native_event(event);
                                counter.fetch_add(1, Ordering::Relaxed);
                            }
                            Err(_) => {
                                machine.handle_disconnect();
                                break;
                            }
                        },
                        recv(stop_rx) -> _ => break,
                    }
                }
                debug!(processed = counter.load(Ordering::Relaxed), "Pipeline runner exited");
            })
            .map_err(|e| DaguerreError::dispatch(format!("failed to spawn pipeline runner: {}", e)))?;

        Ok(Self {
            stop: Some(stop_tx),
            thread: Some(thread),
            processed,
        })
    }

    /// Native events handled so far
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Stop after the event in progress and join
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for PipelineRunner {
    fn drop(&mut self) {
        self.shutdown();
    }
}
