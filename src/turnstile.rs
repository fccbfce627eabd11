//! The turnstile gate itself.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::builder::TurnstileBuilder;
use crate::error::TurnstileError;
use crate::gate::Gate;
use crate::meter::Meter;
use crate::observer::TurnstileObserver;

/// A shared checkpoint that paces, blocks and observes the callers passing
/// through it.
///
/// Each call to [`pass`](Self::pass) takes the next event number, waits out
/// whatever delay the [`Meter`] asks for, then waits for the hard block (if
/// any) to lift before being recorded by the [`TurnstileObserver`]. The two
/// waits are sequential and independent: a caller that has already served its
/// rate delay while the gate was blocked goes straight through on
/// [`unblock`](Self::unblock).
///
/// # Thread Safety
///
/// `Turnstile` is `Send + Sync`; share it behind an [`Arc`](std::sync::Arc)
/// and call `pass` from any number of tasks. Event numbers come from an atomic
/// counter, so concurrent callers never share one.
#[derive(Debug)]
pub struct Turnstile {
    pub(crate) meter: Box<dyn Meter>,
    pub(crate) observer: TurnstileObserver,
    pub(crate) events: AtomicU64,
    pub(crate) gate: Gate,
}

impl Turnstile {
    /// Create a new builder for configuring a turnstile.
    #[must_use]
    pub fn builder() -> TurnstileBuilder {
        TurnstileBuilder::new()
    }

    /// Zero the event counter, reset the meter and lift any block.
    ///
    /// The observer window is left as is.
    pub async fn reset(&self) {
        self.events.store(0, Ordering::Release);
        self.meter.reset();
        self.gate.open().await;

        #[cfg(feature = "tracing")]
        tracing::debug!("turnstile reset");
    }

    /// Start (or resume) the meter's clock.
    pub fn start(&self) -> Result<(), TurnstileError> {
        self.meter.start()?;

        #[cfg(feature = "tracing")]
        tracing::debug!(events = self.events_seen(), "turnstile started");
        Ok(())
    }

    /// Pause the meter's clock.
    pub fn pause(&self) -> Result<(), TurnstileError> {
        self.meter.pause()?;

        #[cfg(feature = "tracing")]
        tracing::debug!(events = self.events_seen(), "turnstile paused");
        Ok(())
    }

    /// Stop every caller at the gate until [`unblock`](Self::unblock).
    ///
    /// Waits for callers currently being admitted to finish. Blocking an
    /// already blocked turnstile does nothing.
    pub async fn block(&self) {
        let _changed = self.gate.close().await;

        #[cfg(feature = "tracing")]
        if _changed {
            tracing::debug!(events = self.events_seen(), "turnstile blocked");
        }
    }

    /// Lift the block. Unblocking an open turnstile does nothing.
    pub async fn unblock(&self) {
        let _changed = self.gate.open().await;

        #[cfg(feature = "tracing")]
        if _changed {
            tracing::debug!(events = self.events_seen(), "turnstile unblocked");
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.gate.is_closed()
    }

    /// Pass through the turnstile, returning this caller's event number.
    ///
    /// Dropping the future before it completes abandons the pass; an abandoned
    /// pass keeps its event number but is never observed.
    pub async fn pass(&self) -> u64 {
        let count = self.events.fetch_add(1, Ordering::AcqRel) + 1;

        self.meter.delay(count).await;

        let _entered = self.gate.enter().await;
        self.observer.observe(count);

        #[cfg(feature = "tracing")]
        tracing::trace!(event = count, "passed turnstile");

        count
    }

    /// Like [`pass`](Self::pass), but gives up with
    /// [`TurnstileError::Cancelled`] if `cancel` completes first.
    pub async fn pass_or_cancel<F>(&self, cancel: F) -> Result<u64, TurnstileError>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            _ = cancel => Err(TurnstileError::Cancelled),
            count = self.pass() => Ok(count),
        }
    }

    /// Events handed out so far, including those still waiting to get through.
    pub fn events_seen(&self) -> u64 {
        self.events.load(Ordering::Acquire)
    }

    pub fn observer(&self) -> &TurnstileObserver {
        &self.observer
    }

    pub fn meter(&self) -> &dyn Meter {
        self.meter.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualTimeSource;
    use crate::meter::NoopMeter;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::time::timeout;

    /// Records the calls made to it.
    #[derive(Debug, Default, Clone)]
    struct RecordingMeter {
        calls: Arc<Mutex<Vec<String>>>,
        paused: Arc<Mutex<bool>>,
    }

    impl RecordingMeter {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn log(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl Meter for RecordingMeter {
        fn reset(&self) {
            *self.paused.lock().unwrap() = true;
            self.log("reset".into());
        }

        fn is_paused(&self) -> bool {
            *self.paused.lock().unwrap()
        }

        fn start(&self) -> Result<(), TurnstileError> {
            *self.paused.lock().unwrap() = false;
            self.log("start".into());
            Ok(())
        }

        fn pause(&self) -> Result<(), TurnstileError> {
            *self.paused.lock().unwrap() = true;
            self.log("pause".into());
            Ok(())
        }

        fn delay_millis_for(&self, _event_count: u64) -> i64 {
            0
        }

        async fn delay(&self, event_count: u64) {
            self.log(format!("delay {event_count}"));
        }
    }

    #[tokio::test]
    async fn test_new_turnstile_has_seen_nothing() {
        let turnstile = Turnstile::builder().build();
        assert_eq!(turnstile.events_seen(), 0);
        assert!(!turnstile.is_blocked());
        assert!(turnstile.meter().is_paused());
    }

    #[tokio::test]
    async fn test_start_and_pause_forward_to_meter() {
        let meter = RecordingMeter::default();
        let turnstile = Turnstile::builder().meter(meter.clone()).build();

        turnstile.start().unwrap();
        turnstile.pause().unwrap();
        assert_eq!(meter.calls(), vec!["reset", "start", "pause"]);
    }

    #[tokio::test]
    async fn test_start_twice_fails() {
        let turnstile = Turnstile::builder().build();
        turnstile.start().unwrap();
        assert!(matches!(
            turnstile.start(),
            Err(TurnstileError::AlreadyRunning)
        ));
        turnstile.pause().unwrap();
        assert!(matches!(
            turnstile.pause(),
            Err(TurnstileError::AlreadyPaused)
        ));
    }

    #[tokio::test]
    async fn test_pass_delays_with_new_count() {
        let meter = RecordingMeter::default();
        let turnstile = Turnstile::builder().meter(meter.clone()).build();

        assert_eq!(turnstile.pass().await, 1);
        assert_eq!(turnstile.pass().await, 2);
        assert_eq!(meter.calls(), vec!["reset", "delay 1", "delay 2"]);
        assert_eq!(turnstile.events_seen(), 2);
        assert_eq!(turnstile.observer().window_len(), 2);
    }

    #[tokio::test]
    async fn test_block_and_unblock() {
        let turnstile = Turnstile::builder().build();
        turnstile.block().await;
        assert!(turnstile.is_blocked());
        turnstile.block().await;
        assert!(turnstile.is_blocked());

        turnstile.unblock().await;
        assert!(!turnstile.is_blocked());
        turnstile.unblock().await;
        assert!(!turnstile.is_blocked());
    }

    #[tokio::test]
    async fn test_blocked_pass_waits_but_is_counted() {
        let turnstile = Turnstile::builder().build();
        turnstile.block().await;

        let held = timeout(Duration::from_millis(50), turnstile.pass()).await;
        assert!(held.is_err(), "passed a blocked turnstile");
        // The abandoned pass kept its number but was never observed.
        assert_eq!(turnstile.events_seen(), 1);
        assert_eq!(turnstile.observer().window_len(), 0);
    }

    #[tokio::test]
    async fn test_pass_or_cancel() {
        let turnstile = Turnstile::builder().build();
        turnstile.block().await;

        let result = turnstile
            .pass_or_cancel(tokio::time::sleep(Duration::from_millis(20)))
            .await;
        assert!(matches!(result, Err(TurnstileError::Cancelled)));

        turnstile.unblock().await;
        let result = turnstile
            .pass_or_cancel(std::future::pending())
            .await;
        assert_eq!(result.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_reset_clears_count_and_block() {
        let clock = ManualTimeSource::new(1_000_000);
        let turnstile = Turnstile::builder()
            .time_source(Arc::new(clock))
            .meter(NoopMeter::default())
            .build();
        turnstile.start().unwrap();
        turnstile.pass().await;
        turnstile.block().await;

        turnstile.reset().await;
        assert_eq!(turnstile.events_seen(), 0);
        assert!(!turnstile.is_blocked());
        assert!(turnstile.meter().is_paused());
    }
}
