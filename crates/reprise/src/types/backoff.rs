//! Backoff configuration

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Delay policy applied between attempts of a retry session
///
/// With `exponential` unset the session waits `interval` before every retry.
/// With it set, the interval is multiplied by `factor` after each delay, so
/// the i-th retry waits `interval * factor^(i-1)`. A zero interval means
/// retries follow failures immediately.
///
/// Unspecified fields fall back to the defaults:
///
/// ```rust
/// use reprise::types::BackoffConfig;
/// use std::time::Duration;
///
/// let backoff = BackoffConfig::default()
///     .with_interval(Duration::from_millis(100))
///     .with_exponential(true);
///
/// assert_eq!(backoff.factor, 2.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BackoffConfig {
    /// Delay before the first retry
    #[serde(default, rename = "interval-ms", with = "duration_ms")]
    pub interval: Duration,

    /// Grow the interval geometrically after each retry
    #[serde(default)]
    pub exponential: bool,

    /// Growth multiplier for exponential backoff
    #[serde(default = "default_factor")]
    pub factor: f64,

    /// Upper bound for the grown interval
    #[serde(
        default,
        rename = "max-interval-ms",
        with = "option_duration_ms",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_interval: Option<Duration>,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            interval: Duration::ZERO,
            exponential: false,
            factor: default_factor(),
            max_interval: None,
        }
    }
}

fn default_factor() -> f64 {
    2.0
}

impl BackoffConfig {
    /// Fixed delay between retries
    pub fn fixed(interval: Duration) -> Self {
        Self::default().with_interval(interval)
    }

    /// Exponentially growing delay between retries
    pub fn exponential(interval: Duration, factor: f64) -> Self {
        Self::default()
            .with_interval(interval)
            .with_exponential(true)
            .with_factor(factor)
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_exponential(mut self, exponential: bool) -> Self {
        self.exponential = exponential;
        self
    }

    pub fn with_factor(mut self, factor: f64) -> Self {
        self.factor = factor;
        self
    }

    pub fn with_max_interval(mut self, max_interval: Duration) -> Self {
        self.max_interval = Some(max_interval);
        self
    }

    /// Check that the factor is a positive, finite multiplier
    pub fn validate(&self) -> Result<()> {
        if !self.factor.is_finite() || self.factor <= 0.0 {
            return Err(Error::invalid_config(format!(
                "backoff factor must be a positive number, got {}",
                self.factor
            )));
        }
        if let Some(max) = self.max_interval {
            if max < self.interval {
                return Err(Error::invalid_config(format!(
                    "max interval ({}ms) is smaller than interval ({}ms)",
                    max.as_millis(),
                    self.interval.as_millis()
                )));
            }
        }
        Ok(())
    }

    /// Interval to use for the retry after one that waited `current`
    ///
    /// Fixed backoff returns `current` unchanged. An unusable factor (not
    /// positive or not finite) also leaves the interval unchanged. The cap
    /// never pulls the interval below `current`, and growth past
    /// [`Duration::MAX`] saturates there.
    pub fn next_interval(&self, current: Duration) -> Duration {
        if !self.exponential || !self.factor.is_finite() || self.factor <= 0.0 {
            return current;
        }

        let scaled = (current.as_nanos() as f64 * self.factor).round();
        let next = if scaled >= Duration::MAX.as_nanos() as f64 {
            Duration::MAX
        } else {
            let nanos = scaled as u128;
            Duration::new(
                (nanos / NANOS_PER_SEC) as u64,
                (nanos % NANOS_PER_SEC) as u32,
            )
        };

        match self.max_interval {
            Some(max) => next.min(max.max(current)),
            None => next,
        }
    }
}

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Millisecond values on the wire
///
/// Whole milliseconds are written as integers; anything finer is written as
/// a fractional millisecond count so it survives a round trip.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum Millis {
    Whole(u64),
    Fractional(f64),
}

impl Millis {
    fn from_duration(value: &Duration) -> Self {
        if value.subsec_nanos() % 1_000_000 == 0 {
            Millis::Whole(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
        } else {
            Millis::Fractional(value.as_nanos() as f64 / 1e6)
        }
    }

    fn into_duration<E: serde::de::Error>(self) -> std::result::Result<Duration, E> {
        match self {
            Millis::Whole(ms) => Ok(Duration::from_millis(ms)),
            Millis::Fractional(ms) => {
                let nanos = (ms * 1e6).round();
                if !nanos.is_finite() || nanos < 0.0 || nanos >= u64::MAX as f64 {
                    return Err(E::custom(format!("invalid millisecond value {}", ms)));
                }
                Ok(Duration::from_nanos(nanos as u64))
            }
        }
    }
}

mod duration_ms {
    use super::Millis;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        Millis::from_duration(value).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Millis::deserialize(deserializer)?.into_duration()
    }
}

mod option_duration_ms {
    use super::Millis;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&Millis::from_duration(d)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<Millis>::deserialize(deserializer)?
            .map(Millis::into_duration)
            .transpose()
    }
}
