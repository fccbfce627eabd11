//! A meter that paces events to a target [`FlowRate`].

use async_trait::async_trait;
use std::sync::Arc;

use crate::clock::TimeSource;
use crate::error::TurnstileError;
use crate::meter::{Meter, PausableMeter};
use crate::rate::FlowRate;

/// Delays events so that, over the meter's running time, they are admitted no
/// faster than a target rate.
///
/// Event `n` is scheduled at `n * millis_per_event` milliseconds of running
/// time. Its delay is the gap between that schedule and the running time
/// already elapsed, so callers who fall behind are not made to wait and no
/// rounding error accumulates across events.
#[derive(Debug)]
pub struct RateControlledMeter {
    pausable: PausableMeter,
    rate: FlowRate,
    millis_per_event: f64,
}

impl RateControlledMeter {
    /// Create a paused meter targeting `rate`.
    ///
    /// # Panics
    ///
    /// Panics if `rate` has a zero volume.
    pub fn new(rate: FlowRate, clock: Arc<dyn TimeSource>) -> Self {
        assert!(rate.volume() > 0.0, "rate volume must be greater than 0");
        let millis_per_event = rate.duration().as_nanos() as f64 / 1_000_000.0 / rate.volume();
        Self {
            pausable: PausableMeter::new(clock),
            rate,
            millis_per_event,
        }
    }

    /// Create a paused meter from a textual rate such as `"100/s"`.
    pub fn parse(text: &str, clock: Arc<dyn TimeSource>) -> Result<Self, TurnstileError> {
        Ok(Self::new(text.parse()?, clock))
    }

    /// The target rate.
    pub fn rate(&self) -> FlowRate {
        self.rate
    }

    /// Ideal spacing between consecutive events.
    pub fn millis_per_event(&self) -> f64 {
        self.millis_per_event
    }
}

#[async_trait]
impl Meter for RateControlledMeter {
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

    fn delay_millis_for(&self, event_count: u64) -> i64 {
        let target_millis = (event_count as f64 * self.millis_per_event).round() as i64;
        let elapsed = self.pausable.total_elapsed_millis().min(i64::MAX as u64) as i64;
        target_millis.saturating_sub(elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualTimeSource, SystemTimeSource};
    use std::time::{Duration, Instant};

    fn manual(rate: &str) -> (ManualTimeSource, RateControlledMeter) {
        let clock = ManualTimeSource::new(50_000);
        let meter = RateControlledMeter::parse(rate, Arc::new(clock.clone())).unwrap();
        (clock, meter)
    }

    #[test]
    fn test_simple_rate() {
        let (_, meter) = manual("3/300ms");
        assert_eq!(meter.rate(), FlowRate::new(3.0, Duration::from_millis(300)));
        assert_eq!(meter.millis_per_event(), 100.0);
        assert_eq!(meter.delay_millis_for(1), 100);
        assert_eq!(meter.delay_millis_for(2), 200);
        assert_eq!(meter.delay_millis_for(3), 300);
    }

    #[test]
    fn test_submilli_rate() {
        let (_, meter) = manual("400/ms");
        assert_eq!(meter.delay_millis_for(100), 0);
        assert_eq!(meter.delay_millis_for(300), 1);
    }

    #[test]
    fn test_delay_shrinks_as_running_time_passes() {
        let (clock, meter) = manual("10/s");
        meter.start().unwrap();
        clock.advance(Duration::from_millis(250));

        assert_eq!(meter.delay_millis_for(5), 250);
        // Behind schedule: negative means no wait.
        assert_eq!(meter.delay_millis_for(2), -50);
    }

    #[test]
    fn test_paused_time_does_not_shorten_delay() {
        let (clock, meter) = manual("10/s");
        meter.start().unwrap();
        clock.advance(Duration::from_millis(100));
        meter.pause().unwrap();
        clock.advance(Duration::from_secs(10));

        assert_eq!(meter.delay_millis_for(4), 300);
    }

    #[test]
    fn test_parse_failure_surfaces() {
        let err = RateControlledMeter::parse("fast", Arc::new(SystemTimeSource)).unwrap_err();
        assert!(matches!(err, TurnstileError::InvalidRate(_)));
    }

    #[tokio::test]
    async fn test_paces_twenty_events() {
        let meter = RateControlledMeter::parse("5/100ms", Arc::new(SystemTimeSource)).unwrap();
        let start = Instant::now();
        meter.start().unwrap();

        for i in 1..=20 {
            meter.delay(i).await;
        }

        // Event 20 is scheduled 400ms in.
        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_millis(380) && elapsed <= Duration::from_millis(600),
            "unexpected pacing: {elapsed:?}"
        );
    }

    #[test]
    #[should_panic(expected = "rate volume must be greater than 0")]
    fn test_zero_volume_panics() {
        RateControlledMeter::new(FlowRate::new(0.0, Duration::from_secs(1)), Arc::new(SystemTimeSource));
    }
}
