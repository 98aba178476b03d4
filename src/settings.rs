//! Runtime settings from the environment.

use crate::policy::cache::{DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL_SECONDS};
use crate::policy::validator::{DEFAULT_FETCH_RETRIES, DEFAULT_STEP_LIMIT};
use std::env;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorSettings {
    /// Policy file to load (`VALIDATOR_CONFIG`).
    pub config_path: Option<String>,
    pub step_limit: usize,
    pub cache_ttl_secs: u64,
    pub cache_capacity: u64,
    pub fetch_retries: u32,
}

impl ValidatorSettings {
    /// Read settings from `VALIDATOR_*` variables. Unset or unparsable
    /// values fall back to the defaults.
    pub fn from_env() -> Self {
        ValidatorSettings {
            config_path: env::var("VALIDATOR_CONFIG").ok(),
            step_limit: env::var("VALIDATOR_STEP_LIMIT")
                .unwrap_or_else(|_| DEFAULT_STEP_LIMIT.to_string())
                .parse()
                .unwrap_or(DEFAULT_STEP_LIMIT),
            cache_ttl_secs: env::var("VALIDATOR_CACHE_TTL_SECS")
                .unwrap_or_else(|_| DEFAULT_CACHE_TTL_SECONDS.to_string())
                .parse()
                .unwrap_or(DEFAULT_CACHE_TTL_SECONDS),
            cache_capacity: env::var("VALIDATOR_CACHE_CAPACITY")
                .unwrap_or_else(|_| DEFAULT_CACHE_CAPACITY.to_string())
                .parse()
                .unwrap_or(DEFAULT_CACHE_CAPACITY),
            fetch_retries: env::var("VALIDATOR_FETCH_RETRIES")
                .unwrap_or_else(|_| DEFAULT_FETCH_RETRIES.to_string())
                .parse()
                .unwrap_or(DEFAULT_FETCH_RETRIES),
        }
    }
}

impl Default for ValidatorSettings {
    fn default() -> Self {
        ValidatorSettings {
            config_path: None,
            step_limit: DEFAULT_STEP_LIMIT,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECONDS,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            fetch_retries: DEFAULT_FETCH_RETRIES,
        }
    }
}
