//! Session configuration

use report_core::{Error, Result};
use std::time::Duration;

/// Timing configuration for a [`ReportSession`](crate::ReportSession)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Delay between the end of one status tick and the start of the next
    pub poll_interval: Duration,

    /// Bound for launch, coverage and status calls
    pub request_timeout: Duration,

    /// Bound for the result fetch after a job completed
    pub result_timeout: Duration,

    /// Bound for the synchronous run-and-wait path
    pub sync_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(2000),
            request_timeout: Duration::from_secs(10),
            result_timeout: Duration::from_secs(30),
            sync_timeout: Duration::from_secs(180),
        }
    }
}

impl SessionConfig {
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }

    /// Check every duration is non-zero
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("poll_interval", self.poll_interval),
            ("request_timeout", self.request_timeout),
            ("result_timeout", self.result_timeout),
            ("sync_timeout", self.sync_timeout),
        ] {
            if value.is_zero() {
                return Err(Error::Config(format!("{name} must be greater than zero")));
            }
        }
        Ok(())
    }
}

/// Builder for [`SessionConfig`]
#[derive(Debug, Default)]
pub struct SessionConfigBuilder {
    poll_interval: Option<Duration>,
    request_timeout: Option<Duration>,
    result_timeout: Option<Duration>,
    sync_timeout: Option<Duration>,
}

impl SessionConfigBuilder {
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn result_timeout(mut self, timeout: Duration) -> Self {
        self.result_timeout = Some(timeout);
        self
    }

    pub fn sync_timeout(mut self, timeout: Duration) -> Self {
        self.sync_timeout = Some(timeout);
        self
    }

    /// Build and validate the config
    pub fn build(self) -> Result<SessionConfig> {
        let defaults = SessionConfig::default();
        let config = SessionConfig {
            poll_interval: self.poll_interval.unwrap_or(defaults.poll_interval),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            result_timeout: self.result_timeout.unwrap_or(defaults.result_timeout),
            sync_timeout: self.sync_timeout.unwrap_or(defaults.sync_timeout),
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.result_timeout, Duration::from_secs(30));
        assert_eq!(config.sync_timeout, Duration::from_secs(180));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_overrides() {
        let config = SessionConfig::builder()
            .poll_interval(Duration::from_millis(500))
            .build()
            .unwrap();
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let err = SessionConfig::builder()
            .poll_interval(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("poll_interval"));
    }
}
