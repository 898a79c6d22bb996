//! # Publish queue configuration
//!
//! `PublishConfig` carries defaults suitable for an editorial publish queue.
//! Deployments override them in code with the `with_*` builders or from the
//! environment:
//!
//! ```bash
//! export DOGPUB__PAGE_SIZE=50
//! export DOGPUB__DISPATCH_TIMEOUT_SECS=900
//! ```

use std::str::FromStr;
use std::time::Duration;

use crate::{PublishError, PublishResult};

/// Default environment prefix for [`PublishConfig::from_env`]
pub const ENV_PREFIX: &str = "DOGPUB__";

#[derive(Debug, Clone)]
pub struct PublishConfig {
    /// Rows per queue page
    pub page_size: usize,
    /// Upper bound for caller supplied page sizes
    pub max_page_size: usize,
    /// Records returned by the consistency listing
    pub consistency_limit: usize,
    /// Capacity of the state-change broadcast channel
    pub event_capacity: usize,
    /// Entries in progress longer than this are failed by the reaper
    pub dispatch_timeout: Duration,
    /// How often the reaper scans for overdue entries
    pub reaper_interval: Duration,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            page_size: 25,
            max_page_size: 200,
            consistency_limit: 200,
            event_capacity: 1000,
            dispatch_timeout: Duration::from_secs(1800), // 30 minutes
            reaper_interval: Duration::from_secs(60),
        }
    }
}

impl PublishConfig {
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_dispatch_timeout(mut self, timeout: Duration) -> Self {
        self.dispatch_timeout = timeout;
        self
    }

    pub fn with_reaper_interval(mut self, interval: Duration) -> Self {
        self.reaper_interval = interval;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Defaults overridden by `{prefix}KEY` environment variables
    pub fn from_env(prefix: &str) -> PublishResult<Self> {
        Self::from_vars(prefix, std::env::vars())
    }

    /// Defaults overridden by matching `(key, value)` pairs
    pub fn from_vars<I>(prefix: &str, vars: I) -> PublishResult<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config = Self::default();

        for (key, value) in vars {
            let Some(stripped) = key.strip_prefix(prefix) else {
                continue;
            };
            match stripped.to_ascii_lowercase().as_str() {
                "page_size" => config.page_size = parse(&key, &value)?,
                "max_page_size" => config.max_page_size = parse(&key, &value)?,
                "consistency_limit" => config.consistency_limit = parse(&key, &value)?,
                "event_capacity" => config.event_capacity = parse(&key, &value)?,
                "dispatch_timeout_secs" => {
                    config.dispatch_timeout = Duration::from_secs(parse(&key, &value)?)
                }
                "reaper_interval_secs" => {
                    config.reaper_interval = Duration::from_secs(parse(&key, &value)?)
                }
                _ => {}
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> PublishResult<()> {
        if self.page_size == 0 || self.max_page_size == 0 {
            return Err(PublishError::Config("page sizes must be non-zero".to_string()));
        }
        if self.page_size > self.max_page_size {
            return Err(PublishError::Config(format!(
                "page_size {} exceeds max_page_size {}",
                self.page_size, self.max_page_size
            )));
        }
        if self.event_capacity == 0 {
            return Err(PublishError::Config("event_capacity must be non-zero".to_string()));
        }
        if self.reaper_interval.is_zero() {
            return Err(PublishError::Config("reaper_interval must be non-zero".to_string()));
        }
        Ok(())
    }

    pub(crate) fn dispatch_timeout_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.dispatch_timeout).unwrap_or_else(|_| chrono::Duration::days(36_500))
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> PublishResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| PublishError::Config(format!("invalid value for {key}: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_defaults() {
        let config = PublishConfig::default();
        assert_eq!(config.page_size, 25);
        assert_eq!(config.consistency_limit, 200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let config = PublishConfig::from_vars(
            ENV_PREFIX,
            vars(&[
                ("DOGPUB__PAGE_SIZE", "50"),
                ("DOGPUB__DISPATCH_TIMEOUT_SECS", "900"),
                ("OTHER__PAGE_SIZE", "7"),
            ]),
        )
        .unwrap();

        assert_eq!(config.page_size, 50);
        assert_eq!(config.dispatch_timeout, Duration::from_secs(900));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let result = PublishConfig::from_vars(ENV_PREFIX, vars(&[("DOGPUB__PAGE_SIZE", "lots")]));
        assert!(matches!(result, Err(PublishError::Config(_))));

        let result = PublishConfig::from_vars(ENV_PREFIX, vars(&[("DOGPUB__PAGE_SIZE", "500")]));
        assert!(matches!(result, Err(PublishError::Config(msg)) if msg.contains("max_page_size")));
    }
}
