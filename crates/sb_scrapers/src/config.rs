use std::time::Duration;

use sb_core::{Error, Result};

use crate::parsers::DEFAULT_BASE_URL;

pub const ENV_BASE_URL: &str = "STAATSBLAD_BASE_URL";
pub const ENV_TIMEOUT_SECS: &str = "STAATSBLAD_TIMEOUT_SECS";
pub const ENV_MAX_RETRIES: &str = "STAATSBLAD_MAX_RETRIES";

/// Retry policy for page requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry, doubled for each further one
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryConfig {
    /// Backoff before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScraperConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
    pub retry: RetryConfig,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            user_agent: format!("staatsblad-scraper/{}", env!("CARGO_PKG_VERSION")),
            retry: RetryConfig::default(),
        }
    }
}

impl ScraperConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.retry.max_retries = max_retries;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Defaults overridden by `STAATSBLAD_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(base_url) = lookup(ENV_BASE_URL) {
            url::Url::parse(&base_url)
                .map_err(|e| Error::Config(format!("{}: {}", ENV_BASE_URL, e)))?;
            config = config.with_base_url(base_url);
        }
        if let Some(timeout) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = timeout
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("{} must be a number of seconds", ENV_TIMEOUT_SECS)))?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = lookup(ENV_MAX_RETRIES) {
            config.retry.max_retries = retries
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("{} must be a whole number", ENV_MAX_RETRIES)))?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_backoff_doubles_up_to_cap() {
        let retry = RetryConfig {
            max_retries: 5,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
        };
        assert_eq!(retry.delay_for(1), Duration::from_millis(100));
        assert_eq!(retry.delay_for(2), Duration::from_millis(200));
        assert_eq!(retry.delay_for(3), Duration::from_millis(350));
    }

    #[test]
    fn test_from_env_overrides() {
        let config = ScraperConfig::from_lookup(lookup(&[
            (ENV_BASE_URL, "http://localhost:8080/"),
            (ENV_TIMEOUT_SECS, "5"),
            (ENV_MAX_RETRIES, "1"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.retry.max_retries, 1);
    }

    #[test]
    fn test_from_env_defaults_and_errors() {
        let config = ScraperConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ScraperConfig::default());

        let err = ScraperConfig::from_lookup(lookup(&[(ENV_MAX_RETRIES, "many")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        let err = ScraperConfig::from_lookup(lookup(&[(ENV_BASE_URL, "not a url")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
