//! Retry policy loading with precedence
//!
//! Loads [`RetryPoliciesConfig`] from the following sources (low to high):
//! 1. Built-in defaults
//! 2. Policy file (`reprise.yaml` / `reprise.yml`, or an explicit path)
//! 3. Environment variables (`REPRISE_*` prefix), applied to the default policy

use crate::error::{Error, Result};
use crate::types::RetryPoliciesConfig;
use camino::{Utf8Path, Utf8PathBuf};
use std::env;
use std::fs;
use std::str::FromStr;
use std::time::Duration;

/// Policy file names to search for
const CONFIG_FILE_NAMES: &[&str] = &["reprise.yaml", "reprise.yml"];

/// Environment variable names
pub const ENV_MAX_ATTEMPTS: &str = "REPRISE_MAX_ATTEMPTS";
pub const ENV_INTERVAL_MS: &str = "REPRISE_INTERVAL_MS";
pub const ENV_EXPONENTIAL: &str = "REPRISE_EXPONENTIAL";
pub const ENV_FACTOR: &str = "REPRISE_FACTOR";
pub const ENV_MAX_INTERVAL_MS: &str = "REPRISE_MAX_INTERVAL_MS";

/// Where the policy file comes from
#[derive(Debug, Clone)]
enum Source {
    /// Look for a known file name in a directory; missing is fine
    Search(Utf8PathBuf),
    /// Use exactly this file; missing is an error
    File(Utf8PathBuf),
}

/// Loader for retry policies
#[derive(Debug, Clone)]
pub struct PolicyLoader {
    source: Source,
}

impl Default for PolicyLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyLoader {
    /// Search the current directory for a policy file
    pub fn new() -> Self {
        Self::with_dir(Utf8PathBuf::from("."))
    }

    /// Search `dir` for a policy file
    pub fn with_dir(dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            source: Source::Search(dir.into()),
        }
    }

    /// Load policies from a specific file, which must exist
    pub fn with_file(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            source: Source::File(path.into()),
        }
    }

    /// Load policies with full precedence and validate the result
    pub fn load(&self) -> Result<RetryPoliciesConfig> {
        self.load_with_env(|key| env::var(key).ok())
    }

    /// Same as [`load`](Self::load) with a custom environment lookup
    pub fn load_with_env<F>(&self, lookup: F) -> Result<RetryPoliciesConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = RetryPoliciesConfig::default();

        if let Some(path) = self.resolve_path()? {
            tracing::debug!(path = %path, "loading retry policies");
            let file_config = Self::load_yaml_file(&path)?;
            config = config.merge(file_config);
        }

        let config = Self::apply_env_overrides(config, lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse policies from YAML text
    pub fn from_yaml_str(content: &str) -> Result<RetryPoliciesConfig> {
        let config: RetryPoliciesConfig = serde_yaml_ng::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn resolve_path(&self) -> Result<Option<Utf8PathBuf>> {
        match &self.source {
            Source::File(path) => {
                if path.is_file() {
                    Ok(Some(path.clone()))
                } else {
                    Err(Error::config_not_found(path.as_str()))
                }
            }
            Source::Search(dir) => Ok(CONFIG_FILE_NAMES
                .iter()
                .map(|name| dir.join(name))
                .find(|candidate| candidate.is_file())),
        }
    }

    fn load_yaml_file(path: &Utf8Path) -> Result<RetryPoliciesConfig> {
        let content = fs::read_to_string(path)?;
        serde_yaml_ng::from_str(&content)
            .map_err(|e| Error::invalid_config(format!("Failed to parse {}: {}", path, e)))
    }

    /// Apply `REPRISE_*` overrides to the default policy
    fn apply_env_overrides<F>(
        mut config: RetryPoliciesConfig,
        lookup: F,
    ) -> Result<RetryPoliciesConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let policy = &mut config.default;

        if let Some(val) = lookup(ENV_MAX_ATTEMPTS) {
            policy.max_attempts = parse_env(ENV_MAX_ATTEMPTS, &val)?;
        }

        if let Some(val) = lookup(ENV_INTERVAL_MS) {
            policy.backoff.interval = Duration::from_millis(parse_env(ENV_INTERVAL_MS, &val)?);
        }

        if let Some(val) = lookup(ENV_EXPONENTIAL) {
            policy.backoff.exponential = parse_bool(ENV_EXPONENTIAL, &val)?;
        }

        if let Some(val) = lookup(ENV_FACTOR) {
            policy.backoff.factor = parse_env(ENV_FACTOR, &val)?;
        }

        if let Some(val) = lookup(ENV_MAX_INTERVAL_MS) {
            policy.backoff.max_interval =
                Some(Duration::from_millis(parse_env(ENV_MAX_INTERVAL_MS, &val)?));
        }

        Ok(config)
    }
}

fn parse_env<T: FromStr>(key: &str, val: &str) -> Result<T> {
    val.trim()
        .parse()
        .map_err(|_| Error::invalid_config(format!("{} must be a valid number", key)))
}

fn parse_bool(key: &str, val: &str) -> Result<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::invalid_config(format!("{} must be true or false", key))),
    }
}
