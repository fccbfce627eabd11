//! Error types for the turnstile gate.

use thiserror::Error;

/// Errors produced while parsing a textual [`FlowRate`](crate::FlowRate).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFlowRateError {
    /// The input does not match `<volume>[multiplier]/[count]<unit>`.
    #[error("could not parse a flow rate from input: {0:?}")]
    Malformed(String),
    /// The volume multiplier is not one of `U`, `K` or `M`.
    #[error("unidentified multiplier: {0:?}")]
    UnknownMultiplier(String),
    /// The time unit is not one of `ms`, `s`, `m`, `h` or `d`.
    #[error("could not parse time unit: {0:?}")]
    UnknownUnit(String),
    /// The parsed volume was zero.
    #[error("rate volume must be positive")]
    NonPositiveVolume,
    /// The number of time units was zero.
    #[error("rate time units must be positive")]
    NonPositiveUnitCount,
}

/// Errors that can occur while operating a [`Turnstile`](crate::Turnstile) or
/// one of its collaborators.
#[derive(Debug, Error)]
pub enum TurnstileError {
    /// `start()` was called on a meter that is already running.
    #[error("cannot start a turnstile that is already started")]
    AlreadyRunning,
    /// `pause()` was called on a meter that is already paused.
    #[error("cannot pause a turnstile that is already paused")]
    AlreadyPaused,
    /// An adaptive rate was requested before any event was observed.
    #[error("cannot calculate rate, no events observed")]
    NoObservations,
    /// The caller gave up while waiting to pass.
    #[error("cancelled while waiting to pass the turnstile")]
    Cancelled,
    /// A textual rate could not be parsed.
    #[error(transparent)]
    InvalidRate(#[from] ParseFlowRateError),
}
