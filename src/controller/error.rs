//! Error types for the bucket provisioning controller

use std::time::Duration;

use thiserror::Error;

/// Error variants are named by the condition they report. `KubeError` is the
/// catch-all for API failures that are not otherwise classified and is treated
/// as transient.
#[allow(clippy::enum_variant_names)]
#[derive(Error, Debug)]
pub enum Error {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Missing object key: {0}")]
    MissingObjectKey(&'static str),

    #[error("{kind} {name} already exists")]
    AlreadyExists {
        kind: &'static str,
        name: String,
        #[source]
        source: kube::Error,
    },

    #[error("Timed out after {timeout:?} waiting for {operation}")]
    Timeout {
        operation: String,
        timeout: Duration,
        #[source]
        source: Option<Box<Error>>,
    },

    #[error("Error updating phase of {name} to {phase}: {source}")]
    PhaseUpdateFailed {
        name: String,
        phase: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Error deleting ObjectBucket {name:?}: {source}")]
    DeleteFailed {
        name: String,
        #[source]
        source: kube::Error,
    },

    #[error("Provisioner error: {0}")]
    ProvisionerError(String),
}

impl Error {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::KubeError(e) => match e {
                kube::Error::Api(api_err) => {
                    // 4xx errors (except 409 Conflict, 429 TooManyRequests) are usually not retryable
                    let code = api_err.code;
                    if (400..500).contains(&code) {
                        return code == 409 || code == 429;
                    }
                    true
                }
                _ => true,
            },
            // Someone else owns the name; requeue and look again
            Error::AlreadyExists { .. } => true,
            Error::Timeout { .. } => true,
            Error::PhaseUpdateFailed { .. } => true,
            Error::DeleteFailed { .. } => true,
            Error::ProvisionerError(_) => true,
            Error::InvalidArgument(_) => false,
            Error::InvalidConfig(_) => false,
            Error::MissingObjectKey(_) => false,
        }
    }

    /// True when the underlying API call reported 404
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::KubeError(e) => is_not_found(e),
            Error::DeleteFailed { source, .. } => is_not_found(source),
            Error::Timeout {
                source: Some(inner),
                ..
            } => inner.is_not_found(),
            Error::PhaseUpdateFailed { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

/// True for a create rejected because the name is taken.
///
/// A resourceVersion conflict is also a 409, so the reason has to be checked.
pub fn is_already_exists(e: &kube::Error) -> bool {
    matches!(e, kube::Error::Api(resp) if resp.code == 409 && resp.reason == "AlreadyExists")
}

/// True for a call against an object that does not exist
pub fn is_not_found(e: &kube::Error) -> bool {
    matches!(e, kube::Error::Api(resp) if resp.code == 404)
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Exponential backoff configuration
#[derive(Clone, Debug)]
pub struct BackoffConfig {
    /// Initial delay for first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for each subsequent retry
    pub multiplier: f64,
    /// Random jitter factor (0.0 to 1.0)
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(300),
            multiplier: 2.0,
            jitter: 0.1,
        }
    }
}

impl BackoffConfig {
    /// Calculate the backoff delay for a given retry attempt
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_delay_secs =
            self.initial_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);

        let jitter_range = base_delay_secs * self.jitter;
        let jitter = rand::random::<f64>() * jitter_range * 2.0 - jitter_range;
        let delay_with_jitter = (base_delay_secs + jitter).max(0.0);

        let capped_delay = delay_with_jitter.min(self.max_delay.as_secs_f64());

        Duration::from_secs_f64(capped_delay)
    }

    /// Get the delay for an error. Non-retryable errors wait the maximum
    /// delay so a fixed claim is eventually picked up again.
    pub fn delay_for_error(&self, error: &Error, attempt: u32) -> Duration {
        if error.is_retryable() {
            self.delay_for_attempt(attempt)
        } else {
            self.max_delay
        }
    }
}
