//! # reprise
//!
//! Bounded retries for fallible async operations:
//! - Retry sessions with an attempt budget and fixed or exponential backoff
//! - `failure` / `retry` event subscription and pluggable observers
//! - Named retry policies loaded from YAML and environment variables

pub mod config;
pub mod error;
pub mod retry;
pub mod types;

pub use config::PolicyLoader;
pub use error::{Error, Result};
pub use retry::{retry, retry_with_policy, RetryError, RetrySession};
pub use types::{BackoffConfig, RetryPoliciesConfig, RetryPolicy};
