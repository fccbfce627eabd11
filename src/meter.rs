//! Timing policies consulted by the turnstile before admitting an event.

use async_trait::async_trait;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::sleep;

use crate::clock::TimeSource;
use crate::error::TurnstileError;

/// A pausable policy deciding how long each event should wait.
///
/// A meter starts out paused. While paused it keeps answering
/// [`delay_millis_for`](Meter::delay_millis_for) but the time that passes does
/// not count towards its schedule.
#[async_trait]
pub trait Meter: Send + Sync + fmt::Debug {
    /// Return to the initial paused state, discarding any elapsed time.
    fn reset(&self);

    /// Whether the meter is currently paused.
    fn is_paused(&self) -> bool;

    /// Start (or resume) the meter.
    ///
    /// Fails with [`TurnstileError::AlreadyRunning`] if it is running.
    fn start(&self) -> Result<(), TurnstileError>;

    /// Pause the meter.
    ///
    /// Fails with [`TurnstileError::AlreadyPaused`] if it is paused.
    fn pause(&self) -> Result<(), TurnstileError>;

    /// How many milliseconds from now the event numbered `event_count` should
    /// be held back. Zero or negative means it may proceed immediately.
    fn delay_millis_for(&self, event_count: u64) -> i64;

    /// Wait out the delay for `event_count`.
    ///
    /// Dropping the returned future abandons the wait.
    async fn delay(&self, event_count: u64) {
        let millis = self.delay_millis_for(event_count);
        if millis > 0 {
            sleep(Duration::from_millis(millis as u64)).await;
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PauseState {
    paused: bool,
    last_start: Option<u64>,
    previous_elapsed: u64,
}

impl PauseState {
    const INITIAL: Self = Self {
        paused: true,
        last_start: None,
        previous_elapsed: 0,
    };
}

/// Running-time bookkeeping shared by timing based meters.
///
/// Tracks how long the meter has been running across any number of
/// start/pause cycles. Time spent paused is never counted.
#[derive(Debug)]
pub struct PausableMeter {
    clock: Arc<dyn TimeSource>,
    state: Mutex<PauseState>,
}

impl PausableMeter {
    /// Create a paused meter with no elapsed time.
    pub fn new(clock: Arc<dyn TimeSource>) -> Self {
        Self {
            clock,
            state: Mutex::new(PauseState::INITIAL),
        }
    }

    fn state(&self) -> MutexGuard<'_, PauseState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn reset(&self) {
        *self.state() = PauseState::INITIAL;
    }

    pub fn is_paused(&self) -> bool {
        self.state().paused
    }

    pub fn start(&self) -> Result<(), TurnstileError> {
        let mut state = self.state();
        if !state.paused {
            return Err(TurnstileError::AlreadyRunning);
        }
        state.last_start = Some(self.clock.timestamp_millis());
        state.paused = false;
        Ok(())
    }

    pub fn pause(&self) -> Result<(), TurnstileError> {
        let mut state = self.state();
        if state.paused {
            return Err(TurnstileError::AlreadyPaused);
        }
        let running = self.running_millis(&state);
        state.previous_elapsed = state.previous_elapsed.saturating_add(running);
        state.last_start = None;
        state.paused = true;
        Ok(())
    }

    /// Running time accumulated before the most recent start.
    pub fn previous_elapsed(&self) -> Duration {
        Duration::from_millis(self.state().previous_elapsed)
    }

    /// Running time since the most recent start, or zero while paused.
    pub fn elapsed_since_start(&self) -> Duration {
        let state = self.state();
        Duration::from_millis(self.running_millis(&state))
    }

    /// All running time, excluding pauses.
    pub fn total_elapsed(&self) -> Duration {
        Duration::from_millis(self.total_elapsed_millis())
    }

    pub(crate) fn total_elapsed_millis(&self) -> u64 {
        let state = self.state();
        state
            .previous_elapsed
            .saturating_add(self.running_millis(&state))
    }

    fn running_millis(&self, state: &PauseState) -> u64 {
        match (state.paused, state.last_start) {
            (false, Some(started)) => self.clock.timestamp_millis().saturating_sub(started),
            _ => 0,
        }
    }
}

/// A meter that never holds anything back.
///
/// Useful for a gate that only needs blocking and observation.
#[derive(Debug)]
pub struct NoopMeter {
    pausable: PausableMeter,
}

impl NoopMeter {
    pub fn new(clock: Arc<dyn TimeSource>) -> Self {
        Self {
            pausable: PausableMeter::new(clock),
        }
    }
}

impl Default for NoopMeter {
    fn default() -> Self {
        Self::new(Arc::new(crate::clock::SystemTimeSource))
    }
}

#[async_trait]
impl Meter for NoopMeter {
    fn reset(&self) {
        self.pausable.reset();
    }

    fn is_paused(&self) -> bool {
        self.pausable.is_paused()
    }

    fn start(&self) -> Result<(), TurnstileError> {
        self.pausable.start()
    }

    fn pause(&self) -> Result<(), TurnstileError> {
        self.pausable.pause()
    }

    fn delay_millis_for(&self, _event_count: u64) -> i64 {
        0
    }
}
