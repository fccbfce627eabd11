//! Sliding-window estimation of the actual flow through a turnstile.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::clock::TimeSource;
use crate::error::TurnstileError;
use crate::rate::FlowRate;

/// Tuning for a [`TurnstileObserver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverConfig {
    ideal_size: usize,
    adaptive_min_records: usize,
    adaptive_min_span: Duration,
}

impl ObserverConfig {
    /// Default number of records kept in the window.
    pub const DEFAULT_IDEAL_SIZE: usize = 40;
    /// Default record count the adaptive estimate must exceed.
    pub const DEFAULT_ADAPTIVE_MIN_RECORDS: usize = 3;
    /// Default span the adaptive estimate must reach back past.
    pub const DEFAULT_ADAPTIVE_MIN_SPAN: Duration = Duration::from_millis(20);

    #[must_use]
    pub fn new() -> Self {
        Self {
            ideal_size: Self::DEFAULT_IDEAL_SIZE,
            adaptive_min_records: Self::DEFAULT_ADAPTIVE_MIN_RECORDS,
            adaptive_min_span: Self::DEFAULT_ADAPTIVE_MIN_SPAN,
        }
    }

    /// Set how many records the window keeps.
    ///
    /// # Panics
    ///
    /// Panics if `size` is 0.
    #[must_use]
    pub fn ideal_size(mut self, size: usize) -> Self {
        assert!(size > 0, "ideal window size must be greater than 0");
        self.ideal_size = size;
        self
    }

    /// Set the record count the adaptive estimate must walk past.
    #[must_use]
    pub fn adaptive_min_records(mut self, records: usize) -> Self {
        self.adaptive_min_records = records;
        self
    }

    /// Set how far back from now the adaptive estimate must reach.
    #[must_use]
    pub fn adaptive_min_span(mut self, span: Duration) -> Self {
        self.adaptive_min_span = span;
        self
    }

    pub fn window_size(&self) -> usize {
        self.ideal_size
    }
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// One observed (or synthesized) passage through the turnstile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventRecord {
    pub sequence_number: u64,
    /// Milliseconds since the Unix epoch.
    pub event_time: u64,
}

/// Keeps a bounded, most-recent-first window of passage events and estimates
/// flow rates from it.
///
/// Insertion and pruning happen under one lock. Rate queries copy the window
/// first, so they never see it change mid-calculation and may be slightly
/// stale under concurrent insertion.
#[derive(Debug)]
pub struct TurnstileObserver {
    clock: Arc<dyn TimeSource>,
    config: ObserverConfig,
    window: Mutex<VecDeque<EventRecord>>,
}

impl TurnstileObserver {
    pub fn new(clock: Arc<dyn TimeSource>) -> Self {
        Self::with_config(clock, ObserverConfig::default())
    }

    pub fn with_config(clock: Arc<dyn TimeSource>, config: ObserverConfig) -> Self {
        Self {
            clock,
            config,
            window: Mutex::new(VecDeque::with_capacity(config.ideal_size + 1)),
        }
    }

    pub fn config(&self) -> &ObserverConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<EventRecord>> {
        self.window.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record event `sequence_number` as happening now.
    ///
    /// If sequence numbers were skipped since the newest record, the missing
    /// ones are filled in with timestamps spread evenly between that record
    /// and now. A number at or below the newest record has already been
    /// accounted for, either directly or by such a fill, and is ignored. The
    /// window therefore holds strictly descending sequence numbers.
    ///
    /// Returns `true` if the event was recorded.
    pub fn observe(&self, sequence_number: u64) -> bool {
        let mut window = self.lock();
        let now = self.clock.timestamp_millis();

        if let Some(last) = window.front().copied() {
            if sequence_number <= last.sequence_number {
                return false;
            }

            let missing = sequence_number.saturating_sub(last.sequence_number.saturating_add(1));
            if missing > 0 {
                let elapsed = now.saturating_sub(last.event_time) as u128;
                let slots = missing as u128 + 1;
                // Anything older than one window would be pruned straight away.
                let keep = self.config.ideal_size as u64 - 1;
                let first = missing.saturating_sub(keep) + 1;

                #[cfg(feature = "tracing")]
                tracing::trace!(
                    after = last.sequence_number,
                    before = sequence_number,
                    missing,
                    "synthesizing skipped events"
                );

                for k in first..=missing {
                    let offset = (elapsed * k as u128 / slots) as u64;
                    window.push_front(EventRecord {
                        sequence_number: last.sequence_number + k,
                        event_time: last.event_time + offset,
                    });
                }
            }
        }

        window.push_front(EventRecord {
            sequence_number,
            event_time: now,
        });
        self.prune(&mut window);
        true
    }

    /// Insert a record with an explicit timestamp as the newest entry.
    pub fn record_event(&self, sequence_number: u64, event_time: u64) -> EventRecord {
        let record = EventRecord {
            sequence_number,
            event_time,
        };
        let mut window = self.lock();
        window.push_front(record);
        self.prune(&mut window);
        record
    }

    fn prune(&self, window: &mut VecDeque<EventRecord>) {
        window.truncate(self.config.ideal_size);
    }

    /// A copy of the current window, newest first.
    pub fn window(&self) -> Vec<EventRecord> {
        self.lock().iter().copied().collect()
    }

    pub fn window_len(&self) -> usize {
        self.lock().len()
    }

    /// Drop every record.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Rate of the last `window_size` events, measured up to now.
    ///
    /// The volume is the larger of `window_size` and the number of records
    /// held, spread over the time since the oldest of those records.
    pub fn rate_over_events(&self, window_size: usize) -> FlowRate {
        let window = self.window();
        let now = self.clock.timestamp_millis();
        let size = window_size.max(window.len());
        let start = window
            .iter()
            .take(size)
            .map(|record| record.event_time)
            .min()
            .unwrap_or(now);

        FlowRate::new(size as f64, span(start, now))
    }

    /// Rate of the events seen within the last `time_window`.
    ///
    /// # Panics
    ///
    /// Panics if `time_window` is zero.
    pub fn rate_over_time(&self, time_window: Duration) -> FlowRate {
        let window = self.window();
        let now = self.clock.timestamp_millis();
        let boundary = now.saturating_sub(time_window.as_millis().min(u64::MAX as u128) as u64);
        let events = window
            .iter()
            .filter(|record| record.event_time > boundary)
            .count();

        FlowRate::new(events as f64, time_window)
    }

    /// Rate over the smallest recent stretch of the window that is both long
    /// enough and populated enough to be stable.
    ///
    /// Walks back from the newest record until more than
    /// `adaptive_min_records` records have been seen and the walk has reached
    /// past `adaptive_min_span` before now, or the window runs out.
    pub fn adaptive_rate(&self) -> Result<FlowRate, TurnstileError> {
        let window = self.window();
        let latest = window
            .first()
            .ok_or(TurnstileError::NoObservations)?
            .event_time;
        let now = self.clock.timestamp_millis();

        if window.len() == 1 {
            return Ok(FlowRate::new(1.0, span(latest, now)));
        }

        let boundary = now.saturating_sub(self.config.adaptive_min_span.as_millis() as u64);
        let mut start = latest;
        let mut walked = 0usize;
        for record in &window {
            start = record.event_time;
            walked += 1;
            if walked > self.config.adaptive_min_records && start < boundary {
                break;
            }
        }

        Ok(FlowRate::new((walked - 1) as f64, span(start, latest)))
    }

    /// Emit the window at debug level, one line per record.
    #[cfg(feature = "tracing")]
    pub fn log_window(&self) {
        let window = self.window();
        tracing::debug!(events = window.len(), "observer event window");

        let mut origin = self.clock.timestamp_millis();
        for record in &window {
            tracing::debug!(
                sequence = record.sequence_number,
                time = record.event_time,
                gap_ms = origin.saturating_sub(record.event_time),
                "observed event"
            );
            origin = record.event_time;
        }
    }
}

/// Duration between two timestamps, never shorter than 1ms.
fn span(from: u64, to: u64) -> Duration {
    Duration::from_millis(to.saturating_sub(from).max(1))
}
