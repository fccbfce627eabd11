//! A rate-controlled admission gate.
//!
//! Callers [`pass`](Turnstile::pass) through a shared [`Turnstile`]. The
//! turnstile holds each caller back long enough to keep the overall flow at a
//! configured [`FlowRate`], can be hard-blocked regardless of rate, and feeds
//! every admitted event to a [`TurnstileObserver`] that estimates the actual
//! recent flow.
//!
//! # Features
//!
//! - **Rate pacing**: Each event is scheduled on a fixed cadence of running
//!   time; late callers are not held back and errors do not accumulate
//! - **Pausable clock**: Time spent paused does not count towards the schedule
//! - **Hard block**: Stop all passage until unblocked, without repeating the
//!   rate delay already served
//! - **Observation**: Count-based, time-based and adaptive rate estimates over
//!   a bounded window that tolerates skipped event numbers
//! - **Injectable time**: Every component reads time through a [`TimeSource`]
//!
//! # Rate Syntax
//!
//! Rates are written `<volume>[multiplier]/[count]<unit>`:
//!
//! - multiplier: `U` (×1, default), `K` (×1000), `M` (×1000000), any case
//! - unit: `ms`, `s`, `m` (minutes), `h`, `d`
//!
//! `"5K/20s"` is 5000 events per 20 seconds, `"5/s"` is 5 per second.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use turnstile_gate::Turnstile;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let turnstile = Arc::new(
//!     Turnstile::builder()
//!         .rate("200/s".parse().unwrap())
//!         .build(),
//! );
//! turnstile.start().unwrap();
//!
//! let mut workers = Vec::new();
//! for _ in 0..4 {
//!     let turnstile = turnstile.clone();
//!     workers.push(tokio::spawn(async move {
//!         for _ in 0..5 {
//!             turnstile.pass().await;
//!         }
//!     }));
//! }
//! for worker in workers {
//!     worker.await.unwrap();
//! }
//!
//! assert_eq!(turnstile.events_seen(), 20);
//! let observed = turnstile.observer().adaptive_rate().unwrap();
//! println!("observed {:.1} events/s", observed.volume_per_second());
//! # }
//! ```

mod builder;
mod clock;
mod error;
mod gate;
#[cfg(feature = "middleware")]
mod middleware;
mod meter;
mod observer;
mod rate;
mod rate_meter;
mod turnstile;

// Public re-exports
pub use builder::TurnstileBuilder;
pub use clock::{ManualTimeSource, SystemTimeSource, TimeSource};
pub use error::{ParseFlowRateError, TurnstileError};
pub use meter::{Meter, NoopMeter, PausableMeter};
#[cfg(feature = "middleware")]
pub use middleware::TurnstileMiddleware;
pub use observer::{EventRecord, ObserverConfig, TurnstileObserver};
pub use rate::FlowRate;
pub use rate_meter::RateControlledMeter;
pub use turnstile::Turnstile;
