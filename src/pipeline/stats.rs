//! Capture state machine counters

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub previews_presented: u64,
    /// Preview records released unseen because a photo was in flight
    pub previews_skipped: u64,
    pub previews_rejected: u64,
    pub photos_captured: u64,
    pub photos_failed: u64,
    /// Photo requests refused because one was in flight
    pub requests_rejected: u64,
    pub protocol_errors: u64,
    pub validation_errors: u64,
    pub releases: u64,
    pub release_failures: u64,
    /// Native events dropped after shutdown
    pub late_events: u64,
    /// Application events dropped because nobody drained the stream
    pub events_dropped: u64,
}

impl PipelineStats {
    pub fn summary(&self) -> String {
        format!(
            "PipelineStats {{ previews: {} presented, {} skipped, {} rejected, photos: {} ok, {} failed, \
             busy: {}, protocol: {}, validation: {}, releases: {} ({} failed) }}",
            self.previews_presented,
            self.previews_skipped,
            self.previews_rejected,
            self.photos_captured,
            self.photos_failed,
            self.requests_rejected,
            self.protocol_errors,
            self.validation_errors,
            self.releases,
            self.release_failures
        )
    }
}

#[derive(Debug, Default)]
pub struct AtomicPipelineStats {
    pub(crate) previews_presented: AtomicU64,
    pub(crate) previews_skipped: AtomicU64,
    pub(crate) previews_rejected: AtomicU64,
    pub(crate) photos_captured: AtomicU64,
    pub(crate) photos_failed: AtomicU64,
    pub(crate) requests_rejected: AtomicU64,
    pub(crate) protocol_errors: AtomicU64,
    pub(crate) validation_errors: AtomicU64,
    pub(crate) releases: AtomicU64,
    pub(crate) release_failures: AtomicU64,
    pub(crate) late_events: AtomicU64,
    pub(crate) events_dropped: AtomicU64,
}

impl AtomicPipelineStats {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PipelineStats {
        PipelineStats {
            previews_presented: self.previews_presented.load(Ordering::Relaxed),
            previews_skipped: self.previews_skipped.load(Ordering::Relaxed),
            previews_rejected: self.previews_rejected.load(Ordering::Relaxed),
            photos_captured: self.photos_captured.load(Ordering::Relaxed),
            photos_failed: self.photos_failed.load(Ordering::Relaxed),
            requests_rejected: self.requests_rejected.load(Ordering::Relaxed),
            protocol_errors: self.protocol_errors.load(Ordering::Relaxed),
            validation_errors: self.validation_errors.load(Ordering::Relaxed),
            releases: self.releases.load(Ordering::Relaxed),
            release_failures: self.release_failures.load(Ordering::Relaxed),
            late_events: self.late_events.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
        }
    }
}
