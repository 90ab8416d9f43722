//! Retry sessions with backoff and event hooks
//!
//! This module provides the retry engine: a [`RetrySession`] that re-invokes a
//! fallible async operation up to a bounded number of attempts, optionally
//! pacing retries with a fixed or exponentially growing delay, and notifies
//! subscribers of each failure and retry decision.
//!
//! # Features
//!
//! - Fixed or exponential backoff driven by [`BackoffConfig`](crate::types::BackoffConfig)
//! - `failure` and `retry` events with persistent (`on`) and single-shot
//!   (`once`) subscribers
//! - Structured observation via the [`RetryObserver`] trait, with a built-in
//!   [`TracingObserver`] for logging
//! - One-shot [`retry`] and [`retry_with_policy`] helpers
//!
//! # Example
//!
//! ```rust,no_run
//! use reprise::retry::{retry, RetryError};
//! use reprise::types::BackoffConfig;
//! use std::time::Duration;
//!
//! async fn fetch(url: &'static str) -> Result<String, std::io::Error> {
//!     Ok(url.to_string())
//! }
//!
//! async fn example() -> Result<String, RetryError<std::io::Error>> {
//!     let backoff = BackoffConfig::exponential(Duration::from_millis(100), 2.0);
//!     retry(5, fetch, "https://example.com", Some(backoff)).await
//! }
//! ```

mod error;
mod events;
mod observer;
mod session;

pub use error::RetryError;
pub use events::{EventKind, RetryEvent};
pub use observer::{NoOpObserver, RetryObserver, StatsObserver, TracingObserver};
pub use session::{retry, retry_with_policy, RetrySession};
