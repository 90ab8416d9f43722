//! Retry observation and logging
//!
//! Observers are a structured alternative to raw event handlers. Attaching one
//! with [`RetrySession::observe`](super::RetrySession::observe) subscribes it
//! persistently to both the `failure` and `retry` events.

use std::fmt::Display;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Observer trait for session events
///
/// # Example
///
/// ```rust
/// use reprise::retry::RetryObserver;
/// use std::time::Duration;
///
/// struct MetricsObserver;
///
/// impl RetryObserver<std::io::Error> for MetricsObserver {
///     fn on_failure(&self, error: &std::io::Error, countdown: u32, interval: Duration) {
///         // Record failure metric
///     }
///
///     fn on_retry(&self, countdown: u32, interval: Duration) {
///         // Record retry metric
///     }
/// }
/// ```
pub trait RetryObserver<E>: Send + Sync {
    /// Called for every failed attempt
    ///
    /// # Arguments
    ///
    /// * `error` - The attempt's error
    /// * `countdown` - Attempts remaining, including the failed one. A
    ///   countdown of 1 means the failure is terminal.
    /// * `interval` - The interval in effect when the attempt failed
    fn on_failure(&self, error: &E, countdown: u32, interval: Duration);

    /// Called when a failed attempt will be retried
    ///
    /// # Arguments
    ///
    /// * `countdown` - Attempts remaining before the decrement
    /// * `interval` - The delay about to be waited
    fn on_retry(&self, countdown: u32, interval: Duration);
}

/// A no-op observer that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl<E> RetryObserver<E> for NoOpObserver {
    fn on_failure(&self, _error: &E, _countdown: u32, _interval: Duration) {}

    fn on_retry(&self, _countdown: u32, _interval: Duration) {}
}

/// An observer that logs session events using the `tracing` crate
///
/// # Log Levels
///
/// - `on_failure`: WARN, or ERROR when the failure is terminal
/// - `on_retry`: DEBUG
///
/// # Example
///
/// ```rust
/// use reprise::retry::TracingObserver;
///
/// let observer = TracingObserver::new("download");
/// assert_eq!(observer.operation(), "download");
/// ```
#[derive(Debug, Clone)]
pub struct TracingObserver {
    /// Name of the operation being retried (for log context)
    operation: String,
}

impl TracingObserver {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
        }
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new("retry")
    }
}

impl<E: Display> RetryObserver<E> for TracingObserver {
    fn on_failure(&self, error: &E, countdown: u32, interval: Duration) {
        if countdown <= 1 {
            tracing::error!(
                operation = %self.operation,
                error = %error,
                "attempt failed, no attempts left"
            );
        } else {
            tracing::warn!(
                operation = %self.operation,
                countdown = countdown,
                error = %error,
                interval_ms = interval.as_millis() as u64,
                "attempt failed"
            );
        }
    }

    fn on_retry(&self, countdown: u32, interval: Duration) {
        tracing::debug!(
            operation = %self.operation,
            countdown = countdown,
            interval_ms = interval.as_millis() as u64,
            "retrying"
        );
    }
}

/// An observer that counts session events
///
/// Useful for testing and metrics collection.
#[derive(Debug, Default)]
pub struct StatsObserver {
    failures: AtomicU32,
    retries: AtomicU32,
    terminal_failures: AtomicU32,
}

impl StatsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of failed attempts seen
    pub fn failures(&self) -> u32 {
        self.failures.load(Ordering::SeqCst)
    }

    /// Number of retry decisions seen
    pub fn retries(&self) -> u32 {
        self.retries.load(Ordering::SeqCst)
    }

    /// Number of failures that ended a session
    pub fn terminal_failures(&self) -> u32 {
        self.terminal_failures.load(Ordering::SeqCst)
    }
}

impl<E> RetryObserver<E> for StatsObserver {
    fn on_failure(&self, _error: &E, countdown: u32, _interval: Duration) {
        self.failures.fetch_add(1, Ordering::SeqCst);
        if countdown <= 1 {
            self.terminal_failures.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn on_retry(&self, _countdown: u32, _interval: Duration) {
        self.retries.fetch_add(1, Ordering::SeqCst);
    }
}

impl<E, T: RetryObserver<E> + ?Sized> RetryObserver<E> for Arc<T> {
    fn on_failure(&self, error: &E, countdown: u32, interval: Duration) {
        (**self).on_failure(error, countdown, interval)
    }

    fn on_retry(&self, countdown: u32, interval: Duration) {
        (**self).on_retry(countdown, interval)
    }
}

impl<E, T: RetryObserver<E> + ?Sized> RetryObserver<E> for Box<T> {
    fn on_failure(&self, error: &E, countdown: u32, interval: Duration) {
        (**self).on_failure(error, countdown, interval)
    }

    fn on_retry(&self, countdown: u32, interval: Duration) {
        (**self).on_retry(countdown, interval)
    }
}
