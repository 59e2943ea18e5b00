use std::time::Duration;

use crate::errors::TriggerError;

const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;

/// Configuration for triggering a remote workflow.
#[derive(Clone, Debug)]
pub struct TriggerConfig {
    /// Full trigger URL of the workflow (for example `https://host/api/trigger/<id>`).
    pub endpoint: String,
    /// API key sent as `X-API-Key`.
    pub api_key: String,
    /// Longest wait for the connection, and afterwards for each next chunk
    /// of the body. A run may stream for any total length.
    pub idle_timeout: Duration,
}

impl TriggerConfig {
    /// Creates a config with the default idle timeout.
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
        }
    }

    /// Builds a config from `WORKFLOW_ENDPOINT`, `WORKFLOW_API_KEY` and the
    /// optional `WORKFLOW_IDLE_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, TriggerError> {
        let config = Self::env_defaults()?;
        config.validate()?;
        Ok(config)
    }

    /// Reads the same variables as `from_env` without requiring them, so
    /// callers can layer their own overrides before validation.
    pub fn env_defaults() -> Result<Self, TriggerError> {
        let endpoint = std::env::var("WORKFLOW_ENDPOINT").unwrap_or_default();
        let api_key = std::env::var("WORKFLOW_API_KEY").unwrap_or_default();
        let mut config = Self::new(endpoint, api_key);
        if let Ok(raw) = std::env::var("WORKFLOW_IDLE_TIMEOUT_SECS") {
            let secs = raw.trim().parse::<u64>().map_err(|e| {
                TriggerError::Config(format!("invalid WORKFLOW_IDLE_TIMEOUT_SECS {raw:?}: {e}"))
            })?;
            config = config.idle_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }

    /// Overrides the endpoint.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Overrides the API key.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Overrides the idle timeout.
    pub fn idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Checks that the endpoint is an http(s) URL, the key is set and the
    /// idle timeout is non-zero.
    pub fn validate(&self) -> Result<(), TriggerError> {
        if self.endpoint.trim().is_empty() {
            return Err(TriggerError::Config(
                "missing WORKFLOW_ENDPOINT for workflow trigger".into(),
            ));
        }
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(TriggerError::Config(format!(
                "workflow endpoint must be an http(s) URL: {}",
                self.endpoint
            )));
        }
        if self.api_key.trim().is_empty() {
            return Err(TriggerError::Config(
                "missing WORKFLOW_API_KEY for workflow trigger".into(),
            ));
        }
        if self.idle_timeout.is_zero() {
            return Err(TriggerError::Config("idle timeout must be greater than 0".into()));
        }
        Ok(())
    }
}
