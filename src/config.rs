//! Provisioner configuration
//!
//! Process-wide settings that used to be implicit constants: the API domain
//! that namespaces the finalizer, and the retry budget for API mutations.
//! A value of [`ProvisionerConfig`] is built once at startup and passed into
//! every protocol call.

use std::time::Duration;

use crate::controller::error::{Error, Result};

/// Default API domain
pub const DEFAULT_DOMAIN: &str = "objectbucket.io";

/// Default provisioner name, used as the field manager
pub const DEFAULT_PROVISIONER_NAME: &str = "bucket-provisioner";

/// How long to wait between attempts of a single create/update call
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(3);

/// How long in total to retry a call before the reconcile attempt gives up
pub const DEFAULT_RETRY_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable overriding the API domain
pub const ENV_API_DOMAIN: &str = "OBC_API_DOMAIN";
/// Environment variable overriding the provisioner name
pub const ENV_PROVISIONER_NAME: &str = "OBC_PROVISIONER_NAME";
/// Environment variable overriding the retry interval, in seconds
pub const ENV_RETRY_INTERVAL_SECS: &str = "OBC_RETRY_INTERVAL_SECS";
/// Environment variable overriding the retry timeout, in seconds
pub const ENV_RETRY_TIMEOUT_SECS: &str = "OBC_RETRY_TIMEOUT_SECS";

/// Fixed-interval polling budget
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_RETRY_INTERVAL,
            timeout: DEFAULT_RETRY_TIMEOUT,
        }
    }
}

impl RetryPolicy {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProvisionerConfig {
    /// API domain; the finalizer is `<domain>/finalizer`
    pub domain: String,
    /// Name reported as field manager and in logs
    pub provisioner_name: String,
    pub retry: RetryPolicy,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            domain: DEFAULT_DOMAIN.to_string(),
            provisioner_name: DEFAULT_PROVISIONER_NAME.to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

impl ProvisionerConfig {
    /// Build from the environment, falling back to defaults for unset
    /// variables. The result is validated.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(domain) = lookup(ENV_API_DOMAIN) {
            config.domain = domain;
        }
        if let Some(name) = lookup(ENV_PROVISIONER_NAME) {
            config.provisioner_name = name;
        }
        if let Some(raw) = lookup(ENV_RETRY_INTERVAL_SECS) {
            config.retry.interval = parse_secs(ENV_RETRY_INTERVAL_SECS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_RETRY_TIMEOUT_SECS) {
            config.retry.timeout = parse_secs(ENV_RETRY_TIMEOUT_SECS, &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    pub fn with_provisioner_name(mut self, name: impl Into<String>) -> Self {
        self.provisioner_name = name.into();
        self
    }

    pub fn with_retry(mut self, interval: Duration, timeout: Duration) -> Self {
        self.retry = RetryPolicy::new(interval, timeout);
        self
    }

    /// The finalizer token placed on every generated resource
    pub fn finalizer(&self) -> String {
        format!("{}/finalizer", self.domain)
    }

    pub fn validate(&self) -> Result<()> {
        if self.domain.trim().is_empty() {
            return Err(Error::InvalidConfig("API domain must not be empty".to_string()));
        }
        if self.provisioner_name.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "provisioner name must not be empty".to_string(),
            ));
        }
        if self.retry.interval.is_zero() {
            return Err(Error::InvalidConfig(
                "retry interval must be greater than zero".to_string(),
            ));
        }
        if self.retry.timeout < self.retry.interval {
            return Err(Error::InvalidConfig(format!(
                "retry timeout {:?} is shorter than retry interval {:?}",
                self.retry.timeout, self.retry.interval
            )));
        }
        Ok(())
    }
}

fn parse_secs(key: &str, raw: &str) -> Result<Duration> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| Error::InvalidConfig(format!("{}={:?}: {}", key, raw, e)))
}
