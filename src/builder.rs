//! Builder API for configuring a [`Turnstile`].

use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use crate::clock::{SystemTimeSource, TimeSource};
use crate::gate::Gate;
use crate::meter::{Meter, NoopMeter};
use crate::observer::{ObserverConfig, TurnstileObserver};
use crate::rate::FlowRate;
use crate::rate_meter::RateControlledMeter;
use crate::turnstile::Turnstile;

#[derive(Debug, Default)]
enum MeterChoice {
    /// Never delay.
    #[default]
    Unmetered,
    Rate(FlowRate),
    Custom(Box<dyn Meter>),
}

/// Builder for configuring a [`Turnstile`].
///
/// # Example
///
/// ```rust
/// use turnstile_gate::{ObserverConfig, Turnstile};
/// use std::time::Duration;
///
/// let turnstile = Turnstile::builder()
///     .rate("100/s".parse().unwrap())
///     .observer(ObserverConfig::new().ideal_size(100))
///     .build();
///
/// turnstile.start().unwrap();
/// ```
#[derive(Debug)]
pub struct TurnstileBuilder {
    meter: MeterChoice,
    clock: Arc<dyn TimeSource>,
    observer: ObserverConfig,
}

impl Default for TurnstileBuilder {
    fn default() -> Self {
        Self {
            meter: MeterChoice::default(),
            clock: Arc::new(SystemTimeSource),
            observer: ObserverConfig::default(),
        }
    }
}

impl TurnstileBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pace callers to `rate` with a [`RateControlledMeter`].
    #[must_use]
    pub fn rate(mut self, rate: FlowRate) -> Self {
        self.meter = MeterChoice::Rate(rate);
        self
    }

    /// Use a custom timing policy.
    ///
    /// The meter keeps whatever time source it was built with.
    #[must_use]
    pub fn meter<M>(mut self, meter: M) -> Self
    where
        M: Meter + 'static,
    {
        self.meter = MeterChoice::Custom(Box::new(meter));
        self
    }

    /// Time source for the observer and for a meter built from [`rate`](Self::rate).
    #[must_use]
    pub fn time_source(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = clock;
        self
    }

    /// Tune the observation window.
    #[must_use]
    pub fn observer(mut self, config: ObserverConfig) -> Self {
        self.observer = config;
        self
    }

    /// Build the turnstile. It starts paused, unblocked, with no events seen.
    #[must_use]
    pub fn build(self) -> Turnstile {
        let meter: Box<dyn Meter> = match self.meter {
            MeterChoice::Unmetered => Box::new(NoopMeter::new(self.clock.clone())),
            MeterChoice::Rate(rate) => Box::new(RateControlledMeter::new(rate, self.clock.clone())),
            MeterChoice::Custom(meter) => meter,
        };
        meter.reset();

        #[cfg(feature = "tracing")]
        tracing::debug!(meter = ?meter, "building turnstile");

        Turnstile {
            meter,
            observer: TurnstileObserver::with_config(self.clock, self.observer),
            events: AtomicU64::new(0),
            gate: Gate::new(),
        }
    }
}
