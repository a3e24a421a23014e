//! Client configuration.
//!
//! Defaults match the backend's development setup. `from_env` overlays any
//! `MEDPAL_*` variables present in the process environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::retry::RetryConfig;

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:5000/api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(8000);
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Root prefixed onto every path without a URL scheme.
    pub base_url: String,
    /// Cancellation timer applied to each request.
    pub timeout: Duration,
    /// Retry budget for reads.
    pub retry: RetryConfig,
    /// How long a cached read is served without refetching.
    pub stale_time: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryConfig::default(),
            stale_time: DEFAULT_STALE_TIME,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    /// Build a config from defaults overlaid with `MEDPAL_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(base) = lookup("MEDPAL_API_BASE") {
            config.base_url = base;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "MEDPAL_TIMEOUT_MS")? {
            config.timeout = Duration::from_millis(ms);
        }
        if let Some(attempts) = parse_var::<u32>(&lookup, "MEDPAL_RETRY_ATTEMPTS")? {
            config.retry.attempts = attempts;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "MEDPAL_RETRY_BASE_DELAY_MS")? {
            config.retry.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "MEDPAL_STALE_TIME_MS")? {
            config.stale_time = Duration::from_millis(ms);
        }
        Ok(config)
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::Invalid {
                var,
                reason: e.to_string(),
                value,
            }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn defaults_without_variables() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.base_url, DEFAULT_API_BASE);
        assert_eq!(config.timeout, Duration::from_millis(8000));
        assert_eq!(config.retry.attempts, 3);
        assert_eq!(config.retry.base_delay, Duration::from_millis(300));
    }

    #[test]
    fn variables_override_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("MEDPAL_API_BASE", "https://pharmacy.example/api"),
            ("MEDPAL_TIMEOUT_MS", "1500"),
            ("MEDPAL_RETRY_ATTEMPTS", "5"),
            ("MEDPAL_RETRY_BASE_DELAY_MS", "50"),
            ("MEDPAL_STALE_TIME_MS", "0"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "https://pharmacy.example/api");
        assert_eq!(config.timeout, Duration::from_millis(1500));
        assert_eq!(config.retry.attempts, 5);
        assert_eq!(config.retry.base_delay, Duration::from_millis(50));
        assert_eq!(config.stale_time, Duration::ZERO);
    }

    #[test]
    fn malformed_number_names_the_variable() {
        let err = ClientConfig::from_lookup(lookup(&[("MEDPAL_TIMEOUT_MS", "soon")])).unwrap_err();
        let ConfigError::Invalid { var, value, .. } = err;
        assert_eq!(var, "MEDPAL_TIMEOUT_MS");
        assert_eq!(value, "soon");
    }
}
