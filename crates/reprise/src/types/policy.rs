//! Named retry policies

use super::backoff::BackoffConfig;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Attempt budget plus backoff for one kind of operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay policy between attempts
    #[serde(flatten)]
    pub backoff: BackoffConfig,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff: BackoffConfig::default(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: BackoffConfig) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts < 1 {
            return Err(Error::invalid_config("max-attempts must be at least 1"));
        }
        self.backoff.validate()
    }
}

/// Default policy plus per-operation overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryPoliciesConfig {
    /// Policy used when no operation-specific one exists
    #[serde(default)]
    pub default: RetryPolicy,

    /// Per-operation retry policies
    #[serde(default)]
    pub operations: HashMap<String, RetryPolicy>,
}

impl RetryPoliciesConfig {
    /// Policy for `operation`, or the default policy
    pub fn policy_for(&self, operation: &str) -> &RetryPolicy {
        self.operations.get(operation).unwrap_or(&self.default)
    }

    /// Overlay another config on top of this one
    ///
    /// The overlay's default wins; operation policies are merged by name.
    pub fn merge(mut self, overlay: RetryPoliciesConfig) -> Self {
        for (name, policy) in overlay.operations {
            self.operations.insert(name, policy);
        }
        self.default = overlay.default;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.default
            .validate()
            .map_err(|e| with_context("default policy", e))?;
        for (name, policy) in &self.operations {
            policy
                .validate()
                .map_err(|e| with_context(&format!("policy '{}'", name), e))?;
        }
        Ok(())
    }
}

/// Prefix an invalid-config message with where it was found
fn with_context(context: &str, err: Error) -> Error {
    match err {
        Error::InvalidConfig { message } => {
            Error::invalid_config(format!("{}: {}", context, message))
        }
        other => other,
    }
}
