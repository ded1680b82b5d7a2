//! Client configuration

use report_core::{Error, Result};
use std::time::Duration;
use url::Url;

/// Default backend address
pub const DEFAULT_API_BASE: &str = "http://localhost:18000";

/// Environment variable holding the backend address
pub const API_BASE_VAR: &str = "REPORT_API_BASE";
/// Environment variable holding the API token
pub const API_TOKEN_VAR: &str = "REPORT_API_TOKEN";

const SHORT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const LONG_TIMEOUT: Duration = Duration::from_secs(180);

/// Configuration for [`HttpReportClient`](crate::HttpReportClient)
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every endpoint path is appended to
    pub api_base: Url,

    /// Opaque token sent as `X-API-Token`; empty means "not configured"
    pub api_token: String,

    /// Bound for launch, status and coverage calls (default: 10s)
    pub short_timeout: Duration,

    /// Bound for result fetches (default: 30s)
    pub default_timeout: Duration,

    /// Bound for the synchronous run-and-wait calls (default: 180s)
    pub long_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_token: String::new(),
            short_timeout: SHORT_TIMEOUT,
            default_timeout: DEFAULT_TIMEOUT,
            long_timeout: LONG_TIMEOUT,
        }
    }
}

fn default_api_base() -> Url {
    Url::parse(DEFAULT_API_BASE).unwrap_or_else(|_| unreachable!("default API base is a valid URL"))
}

impl ClientConfig {
    /// Create a config for the given base URL and token
    pub fn new(api_base: &str, api_token: impl Into<String>) -> Result<Self> {
        Self::builder().api_base(api_base).api_token(api_token).build()
    }

    /// Start building a config
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Create config from environment variables
    ///
    /// Reads the base URL from `REPORT_API_BASE` (falling back to
    /// [`DEFAULT_API_BASE`]) and the token from `REPORT_API_TOKEN`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();
        if let Some(base) = lookup(API_BASE_VAR).filter(|value| !value.trim().is_empty()) {
            builder = builder.api_base(base);
        }
        if let Some(token) = lookup(API_TOKEN_VAR) {
            builder = builder.api_token(token);
        }
        builder.build()
    }

    /// Whether a non-blank token is configured
    pub fn has_token(&self) -> bool {
        !self.api_token.trim().is_empty()
    }
}

/// Builder for [`ClientConfig`]
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    api_base: Option<String>,
    api_token: Option<String>,
    short_timeout: Option<Duration>,
    default_timeout: Option<Duration>,
    long_timeout: Option<Duration>,
}

impl ClientConfigBuilder {
    /// Set the backend base URL
    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    /// Set the API token
    pub fn api_token(mut self, api_token: impl Into<String>) -> Self {
        self.api_token = Some(api_token.into());
        self
    }

    /// Set the short timeout (launch, status, coverage)
    pub fn short_timeout(mut self, timeout: Duration) -> Self {
        self.short_timeout = Some(timeout);
        self
    }

    /// Set the default timeout (result fetches)
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Set the long timeout (synchronous runs)
    pub fn long_timeout(mut self, timeout: Duration) -> Self {
        self.long_timeout = Some(timeout);
        self
    }

    /// Build the config
    pub fn build(self) -> Result<ClientConfig> {
        let defaults = ClientConfig::default();

        let api_base = match self.api_base {
            Some(raw) => {
                let url = Url::parse(raw.trim())
                    .map_err(|e| Error::Config(format!("Invalid API base '{raw}': {e}")))?;
                if url.cannot_be_a_base() {
                    return Err(Error::Config(format!("API base '{raw}' cannot be a base URL")));
                }
                url
            }
            None => defaults.api_base,
        };

        let config = ClientConfig {
            api_base,
            api_token: self.api_token.unwrap_or_default(),
            short_timeout: self.short_timeout.unwrap_or(defaults.short_timeout),
            default_timeout: self.default_timeout.unwrap_or(defaults.default_timeout),
            long_timeout: self.long_timeout.unwrap_or(defaults.long_timeout),
        };

        for (name, value) in [
            ("short", config.short_timeout),
            ("default", config.default_timeout),
            ("long", config.long_timeout),
        ] {
            if value.is_zero() {
                return Err(Error::Config(format!("{name} timeout must be greater than zero")));
            }
        }

        Ok(config)
    }
}
