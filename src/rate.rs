//! The [`FlowRate`] value type and its textual form.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ParseFlowRateError;

/// A volume of events per duration, e.g. `5K/20s`.
///
/// Two rates are equal when they normalize to the same number of events per
/// second, regardless of the units they were written in:
///
/// ```rust
/// use turnstile_gate::FlowRate;
///
/// let slow: FlowRate = "2/s".parse().unwrap();
/// let same: FlowRate = "7200/h".parse().unwrap();
/// assert_eq!(slow, same);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FlowRate {
    volume: f64,
    duration: Duration,
}

impl FlowRate {
    /// Create a new flow rate.
    ///
    /// # Panics
    ///
    /// Panics if:
    /// - `volume` is negative, NaN or infinite
    /// - `duration` is zero
    pub fn new(volume: f64, duration: Duration) -> Self {
        assert!(
            volume.is_finite() && volume >= 0.0,
            "volume must be a finite, non-negative number"
        );
        assert!(!duration.is_zero(), "duration must be greater than 0");
        Self { volume, duration }
    }

    /// The number of events in one [`duration`](Self::duration).
    #[inline]
    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// The period the [`volume`](Self::volume) is spread across.
    #[inline]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// The rate normalized to events per second.
    #[inline]
    pub fn volume_per_second(&self) -> f64 {
        self.volume / self.duration.as_secs_f64()
    }
}

impl PartialEq for FlowRate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FlowRate {}

impl PartialOrd for FlowRate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FlowRate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.volume_per_second()
            .total_cmp(&other.volume_per_second())
    }
}

impl fmt::Display for FlowRate {
    /// Writes the rate in the largest unit that represents the duration
    /// exactly. Whole-millisecond durations parse back to an equal rate; finer
    /// ones are written with `Debug` duration syntax, which does not parse.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.duration.subsec_nanos() % 1_000_000 != 0 {
            return write!(f, "{}/{:?}", self.volume, self.duration);
        }

        let millis = self.duration.as_millis();
        let (count, suffix) = TimeUnit::ALL
            .iter()
            .rev()
            .find(|unit| millis % unit.millis() as u128 == 0)
            .map(|unit| (millis / unit.millis() as u128, unit.suffix()))
            .unwrap_or((millis, "ms"));

        if count == 1 {
            write!(f, "{}/{}", self.volume, suffix)
        } else {
            write!(f, "{}/{}{}", self.volume, count, suffix)
        }
    }
}

impl FromStr for FlowRate {
    type Err = ParseFlowRateError;

    /// Parse `<digits>[.<digits>][U|K|M]/[<count>]<ms|s|m|h|d>`.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let malformed = || ParseFlowRateError::Malformed(text.to_string());

        let (numerator, denominator) = text.split_once('/').ok_or_else(malformed)?;

        // Numerator: a decimal number followed by optional multiplier letters.
        let letters_at = numerator
            .find(|c: char| c.is_ascii_alphabetic())
            .unwrap_or(numerator.len());
        let (number, multiplier) = numerator.split_at(letters_at);
        if !is_decimal(number) || !multiplier.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(malformed());
        }

        // Denominator: optional unit count followed by a lowercase unit.
        let unit_at = denominator
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(denominator.len());
        let (count, unit) = denominator.split_at(unit_at);
        if unit.is_empty() || !unit.chars().all(|c| c.is_ascii_lowercase()) {
            return Err(malformed());
        }

        let factor = Multiplier::parse(multiplier)?;
        let volume = number.parse::<f64>().map_err(|_| malformed())? * factor.value();
        if !volume.is_finite() {
            return Err(malformed());
        }
        let unit_count = if count.is_empty() {
            1
        } else {
            count.parse::<u64>().map_err(|_| malformed())?
        };
        let unit = TimeUnit::parse(unit)?;

        if unit_count == 0 {
            return Err(ParseFlowRateError::NonPositiveUnitCount);
        }
        if volume <= 0.0 {
            return Err(ParseFlowRateError::NonPositiveVolume);
        }

        let millis = unit.millis().checked_mul(unit_count).ok_or_else(malformed)?;
        Ok(Self {
            volume,
            duration: Duration::from_millis(millis),
        })
    }
}

fn is_decimal(text: &str) -> bool {
    let all_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    match text.split_once('.') {
        Some((whole, fraction)) => all_digits(whole) && all_digits(fraction),
        None => all_digits(text),
    }
}

/// Magnitude applied to the volume of a parsed rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Multiplier {
    Unit,
    Kilo,
    Mega,
}

impl Multiplier {
    fn parse(text: &str) -> Result<Self, ParseFlowRateError> {
        match text.to_ascii_uppercase().as_str() {
            "" | "U" => Ok(Self::Unit),
            "K" => Ok(Self::Kilo),
            "M" => Ok(Self::Mega),
            _ => Err(ParseFlowRateError::UnknownMultiplier(text.to_string())),
        }
    }

    fn value(self) -> f64 {
        match self {
            Self::Unit => 1.0,
            Self::Kilo => 1_000.0,
            Self::Mega => 1_000_000.0,
        }
    }
}

/// Time units accepted in the denominator of a parsed rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimeUnit {
    Millis,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    /// Smallest first.
    const ALL: [TimeUnit; 5] = [
        Self::Millis,
        Self::Seconds,
        Self::Minutes,
        Self::Hours,
        Self::Days,
    ];

    fn parse(text: &str) -> Result<Self, ParseFlowRateError> {
        Self::ALL
            .into_iter()
            .find(|unit| unit.suffix() == text)
            .ok_or_else(|| ParseFlowRateError::UnknownUnit(text.to_string()))
    }

    fn suffix(self) -> &'static str {
        match self {
            Self::Millis => "ms",
            Self::Seconds => "s",
            Self::Minutes => "m",
            Self::Hours => "h",
            Self::Days => "d",
        }
    }

    fn millis(self) -> u64 {
        match self {
            Self::Millis => 1,
            Self::Seconds => 1_000,
            Self::Minutes => 60_000,
            Self::Hours => 3_600_000,
            Self::Days => 86_400_000,
        }
    }
}
