use anyhow::{bail, Result};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://reports.exodus-privacy.eu.org/api";
pub const DEFAULT_USER_AGENT: &str = concat!("exodus-fetch/", env!("CARGO_PKG_VERSION"));

/// Runtime configuration for the network manager.
///
/// All instances must be constructed via [`ManagerConfig::builder`] or [`ManagerConfig::new`]
/// so invariants are validated before any consumer observes the values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    api_url: String,
    request_timeout: Option<Duration>,
    user_agent: String,
}

pub struct ManagerConfigParams {
    pub api_url: String,
    pub request_timeout: Option<Duration>,
    pub user_agent: String,
}

impl ManagerConfig {
    /// Returns a builder to incrementally construct and validate a configuration.
    pub fn builder() -> ManagerConfigBuilder {
        ManagerConfigBuilder::default()
    }

    /// Constructs a configuration directly from the provided values.
    pub fn new(params: ManagerConfigParams) -> Result<Self> {
        let ManagerConfigParams {
            api_url,
            request_timeout,
            user_agent,
        } = params;

        let config = Self {
            api_url: api_url.trim().trim_end_matches('/').to_owned(),
            request_timeout,
            user_agent: user_agent.trim().to_owned(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Base URL of the API, without a trailing slash.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Per-request timeout. `None` leaves the transport's own default in place.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    /// `User-Agent` header sent with every request.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Performs validation on an existing configuration instance.
    pub fn validate(&self) -> Result<()> {
        validate_url(&self.api_url)?;

        if self.user_agent.is_empty() {
            bail!("user_agent cannot be empty");
        }

        if matches!(self.request_timeout, Some(timeout) if timeout.is_zero()) {
            bail!("request_timeout must be greater than 0");
        }

        Ok(())
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            request_timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct ManagerConfigBuilder {
    api_url: Option<String>,
    request_timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl ManagerConfigBuilder {
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn build(self) -> Result<ManagerConfig> {
        ManagerConfig::new(ManagerConfigParams {
            api_url: self.api_url.unwrap_or_else(|| DEFAULT_API_URL.to_owned()),
            request_timeout: self.request_timeout,
            user_agent: self
                .user_agent
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_owned()),
        })
    }
}

fn validate_url(url: &str) -> Result<()> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        bail!("api_url must start with http:// or https://");
    }
    Ok(())
}
