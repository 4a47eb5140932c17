//! Transfer-of-custody table for native buffers
//!
//! Every buffer the session hands across the boundary moves through
//! `Free -> Lent -> PendingRelease -> Free`. Free buffers have no entry, so a
//! second release or a read after release finds nothing and fails loudly
//! instead of touching freed memory.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::trace;

use crate::{
    buffers::BufferAddress,
    error::{DaguerreError, Result},
};

use super::record::EventKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustodyState {
    /// Acquired by the producer and being filled
    Lent,
    /// Published; only the consumer's release returns it
    PendingRelease,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustodyEntry {
    pub state: CustodyState,
    pub kind: EventKind,
    /// Bytes the producer wrote
    pub length: usize,
}

/// Address-keyed custody table
#[derive(Debug, Default)]
pub struct CustodyLedger {
    entries: Mutex<HashMap<BufferAddress, CustodyEntry>>,
}

impl CustodyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly acquired buffer
    pub fn lend(&self, address: BufferAddress, kind: EventKind, length: usize) -> Result<()> {
        let mut entries = self.entries.lock();
        if entries.contains_key(&address) {
            return Err(DaguerreError::custody(
                address.as_usize(),
                "buffer lent while already in custody",
            ));
        }
        entries.insert(
            address,
            CustodyEntry {
                state: CustodyState::Lent,
                kind,
                length,
            },
        );
        trace!(%address, kind = kind.name(), length, "Buffer lent");
        Ok(())
    }

    /// Hand a filled buffer over to the consumer
    pub fn publish(&self, address: BufferAddress) -> Result<()> {
        let mut entries = self.entries.lock();
        match entries.get_mut(&address) {
            Some(entry) if entry.state == CustodyState::Lent => {
                entry.state = CustodyState::PendingRelease;
                Ok(())
            }
            Some(_) => Err(DaguerreError::custody(address.as_usize(), "buffer published twice")),
            None => Err(DaguerreError::custody(
                address.as_usize(),
                "publishing a buffer that is not lent",
            )),
        }
    }

    /// Run `read` while `address` is guaranteed to stay published
    pub fn with_published<R>(
        &self,
        address: BufferAddress,
        read: impl FnOnce(&CustodyEntry) -> Result<R>,
    ) -> Result<R> {
        let entries = self.entries.lock();
        match entries.get(&address) {
            Some(entry) if entry.state == CustodyState::PendingRelease => read(entry),
            Some(_) => Err(DaguerreError::custody(
                address.as_usize(),
                "buffer read before it was published",
            )),
            None => Err(DaguerreError::custody(
                address.as_usize(),
                "buffer read after release",
            )),
        }
    }

    /// Consumer release: remove the entry, then run `free` while the table is
    /// still locked so no reader can slip in between
    pub fn release(
        &self,
        address: BufferAddress,
        free: impl FnOnce(&CustodyEntry) -> Result<()>,
    ) -> Result<CustodyEntry> {
        let mut entries = self.entries.lock();
        match entries.get(&address) {
            Some(entry) if entry.state == CustodyState::PendingRelease => {}
            Some(_) => {
                return Err(DaguerreError::custody(
                    address.as_usize(),
                    "buffer released before it was published",
                ))
            }
            None => {
                return Err(DaguerreError::custody(
                    address.as_usize(),
                    "buffer released twice or never lent",
                ))
            }
        }
        let entry = entries.remove(&address).ok_or_else(|| {
            DaguerreError::custody(address.as_usize(), "buffer vanished during release")
        })?;
        free(&entry)?;
        trace!(%address, "Buffer released");
        Ok(entry)
    }

    /// Producer-side abandonment of a buffer that was never published
    pub fn abandon(&self, address: BufferAddress) -> Option<CustodyEntry> {
        let mut entries = self.entries.lock();
        match entries.get(&address) {
            Some(entry) if entry.state == CustodyState::Lent => entries.remove(&address),
            _ => None,
        }
    }

    /// Take every outstanding entry, for force release at teardown
    pub fn drain(&self) -> Vec<(BufferAddress, CustodyEntry)> {
        self.entries.lock().drain().collect()
    }

    pub fn state_of(&self, address: BufferAddress) -> Option<CustodyState> {
        self.entries.lock().get(&address).map(|entry| entry.state)
    }

    /// Buffers not yet returned
    pub fn outstanding(&self) -> usize {
        self.entries.lock().len()
    }
}
