//! Single-flight photo capture guard

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use crate::error::{DaguerreError, Result};

const IDLE: u8 = 0;
const CAPTURING: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Capturing,
}

/// Atomic `Idle <-> Capturing` flag.
///
/// Entry is a compare-and-set that fails fast instead of queueing. The entry
/// and exit counters let tests check that every entry was matched by exactly
/// one exit.
#[derive(Debug, Default)]
pub struct CaptureGuard {
    state: AtomicU8,
    entries: AtomicU64,
    exits: AtomicU64,
}

impl CaptureGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Idle -> Capturing`, or `StateConflict` if a capture is in flight
    pub fn try_enter(&self) -> Result<()> {
        self.state
            .compare_exchange(IDLE, CAPTURING, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| DaguerreError::state_conflict("Photo capture already in progress"))?;
        self.entries.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// `Capturing -> Idle`; returns false if the guard was already idle
    pub fn exit(&self) -> bool {
        let exited = self
            .state
            .compare_exchange(CAPTURING, IDLE, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if exited {
            self.exits.fetch_add(1, Ordering::Relaxed);
        }
        exited
    }

    pub fn state(&self) -> CaptureState {
        match self.state.load(Ordering::Acquire) {
            CAPTURING => CaptureState::Capturing,
            _ => CaptureState::Idle,
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.state() == CaptureState::Capturing
    }

    pub fn entries(&self) -> u64 {
        self.entries.load(Ordering::Relaxed)
    }

    pub fn exits(&self) -> u64 {
        self.exits.load(Ordering::Relaxed)
    }
}
