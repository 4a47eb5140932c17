//! Preview frame rate limiting

use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Admits at most one frame per interval, measured on the monotonic clock.
///
/// The first frame is always admitted; rejected frames do not move the
/// baseline.
#[derive(Debug)]
pub struct FrameThrottle {
    interval: Duration,
    last_admitted: Mutex<Option<Instant>>,
}

impl FrameThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_admitted: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn admit(&self) -> bool {
        self.admit_at(Instant::now())
    }

    pub fn admit_at(&self, now: Instant) -> bool {
        let mut last = self.last_admitted.lock();
        match *last {
            Some(previous) if now.saturating_duration_since(previous) < self.interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }

    /// Forget the baseline so the next frame is admitted
    pub fn reset(&self) {
        *self.last_admitted.lock() = None;
    }
}
