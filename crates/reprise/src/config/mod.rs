//! Retry policy configuration loading

mod loader;

pub use loader::{
    PolicyLoader, ENV_EXPONENTIAL, ENV_FACTOR, ENV_INTERVAL_MS, ENV_MAX_ATTEMPTS,
    ENV_MAX_INTERVAL_MS,
};
