//! Configuration types for retry sessions

mod backoff;
mod policy;

pub use backoff::BackoffConfig;
pub use policy::{RetryPoliciesConfig, RetryPolicy};
