//! Injectable sources of the current time.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of the current time, in milliseconds since the Unix epoch.
///
/// Every component that reads the time takes one of these explicitly, so tests
/// can substitute a [`ManualTimeSource`].
pub trait TimeSource: Send + Sync + fmt::Debug {
    /// The current timestamp in milliseconds since the Unix epoch.
    fn timestamp_millis(&self) -> u64;
}

/// Wall-clock time source backed by [`SystemTime`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn timestamp_millis(&self) -> u64 {
        // A clock set before the epoch reads as zero rather than failing.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis().min(u64::MAX as u128) as u64)
            .unwrap_or_default()
    }
}

/// A time source that only moves when told to.
///
/// Clones share the same underlying timestamp, so a test can keep one handle
/// and hand another to the component under test.
#[derive(Debug, Clone, Default)]
pub struct ManualTimeSource {
    millis: Arc<AtomicU64>,
}

impl ManualTimeSource {
    /// Create a time source fixed at `millis`.
    #[must_use]
    pub fn new(millis: u64) -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(millis)),
        }
    }

    /// Jump to an absolute timestamp.
    pub fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::Release);
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let step = by.as_millis().min(u64::MAX as u128) as u64;
        self.millis.fetch_add(step, Ordering::AcqRel);
    }
}

impl TimeSource for ManualTimeSource {
    fn timestamp_millis(&self) -> u64 {
        self.millis.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clones_share_time() {
        let clock = ManualTimeSource::new(1_000);
        let other = clock.clone();

        clock.advance(Duration::from_millis(250));
        assert_eq!(other.timestamp_millis(), 1_250);

        other.set(42);
        assert_eq!(clock.timestamp_millis(), 42);
    }

    #[test]
    fn test_system_time_is_after_2020() {
        // 2020-01-01T00:00:00Z
        assert!(SystemTimeSource.timestamp_millis() > 1_577_836_800_000);
    }
}
