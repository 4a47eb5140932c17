//! Capture session counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of session counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Preview frames handed to the session
    pub previews_offered: u64,
    pub previews_published: u64,
    pub previews_throttled: u64,
    /// Dropped because the preview was paused or not started
    pub previews_paused: u64,
    /// Dropped because the event channel was full
    pub previews_channel_full: u64,
    pub preview_failures: u64,
    pub photos_requested: u64,
    pub photos_published: u64,
    pub photo_failures: u64,
    /// Consumer releases
    pub releases: u64,
    /// Buffers reclaimed by `stop` or `shutdown`
    pub force_releases: u64,
    /// Lifecycle notices that found no room in the event channel
    pub notices_dropped: u64,
}

impl SessionStats {
    pub fn summary(&self) -> String {
        format!(
            "SessionStats {{ previews: {}/{} published, throttled: {}, paused: {}, full: {}, \
             photos: {}/{} published, failures: {}, releases: {}, forced: {}, notices dropped: {} }}",
            self.previews_published,
            self.previews_offered,
            self.previews_throttled,
            self.previews_paused,
            self.previews_channel_full,
            self.photos_published,
            self.photos_requested,
            self.preview_failures + self.photo_failures,
            self.releases,
            self.force_releases,
            self.notices_dropped
        )
    }
}

#[derive(Debug, Default)]
pub struct AtomicSessionStats {
    pub(crate) previews_offered: AtomicU64,
    pub(crate) previews_published: AtomicU64,
    pub(crate) previews_throttled: AtomicU64,
    pub(crate) previews_paused: AtomicU64,
    pub(crate) previews_channel_full: AtomicU64,
    pub(crate) preview_failures: AtomicU64,
    pub(crate) photos_requested: AtomicU64,
    pub(crate) photos_published: AtomicU64,
    pub(crate) photo_failures: AtomicU64,
    pub(crate) releases: AtomicU64,
    pub(crate) force_releases: AtomicU64,
    pub(crate) notices_dropped: AtomicU64,
}

impl AtomicSessionStats {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn add(counter: &AtomicU64, count: usize) {
        counter.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SessionStats {
        SessionStats {
            previews_offered: self.previews_offered.load(Ordering::Relaxed),
            previews_published: self.previews_published.load(Ordering::Relaxed),
            previews_throttled: self.previews_throttled.load(Ordering::Relaxed),
            previews_paused: self.previews_paused.load(Ordering::Relaxed),
            previews_channel_full: self.previews_channel_full.load(Ordering::Relaxed),
            preview_failures: self.preview_failures.load(Ordering::Relaxed),
            photos_requested: self.photos_requested.load(Ordering::Relaxed),
            photos_published: self.photos_published.load(Ordering::Relaxed),
            photo_failures: self.photo_failures.load(Ordering::Relaxed),
            releases: self.releases.load(Ordering::Relaxed),
            force_releases: self.force_releases.load(Ordering::Relaxed),
            notices_dropped: self.notices_dropped.load(Ordering::Relaxed),
        }
    }
}
