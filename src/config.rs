//! Client configuration.
//!
//! Every field has a default, so an empty TOML document or an unset
//! environment yields a working configuration pointed at a local service.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};
use crate::upload::DEFAULT_MAX_UPLOAD_BYTES;

/// How often and how long the poller queries job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Delay between status queries, in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Maximum number of status queries before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_interval_ms() -> u64 {
    2_000
}

fn default_max_attempts() -> u32 {
    60
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval_ms: u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
            max_attempts,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Longest time the poller can run before timing out.
    pub fn budget(&self) -> Duration {
        self.interval() * self.max_attempts
    }

    pub fn validate(&self) -> ClientResult<()> {
        if self.interval_ms == 0 {
            return Err(ClientError::Configuration(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(ClientError::Configuration(
                "max poll attempts must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where the analysis service lives and how to talk to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL, without a trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Largest document accepted for upload, in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_upload_bytes() -> u64 {
    DEFAULT_MAX_UPLOAD_BYTES
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl ServiceConfig {
    /// Config for a service at `base_url`, other fields defaulted.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Join `path` onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn validate(&self) -> ClientResult<()> {
        let url = self.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ClientError::Configuration(format!(
                "base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(ClientError::Configuration(
                "request timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Top-level client configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub poll: PollPolicy,
}

impl ClientConfig {
    /// Parse a TOML document with `[service]` and `[poll]` tables.
    pub fn from_toml_str(input: &str) -> ClientResult<Self> {
        let config: Self = toml::from_str(input)
            .map_err(|e| ClientError::Configuration(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `LEXIGUARD_*` environment variables.
    pub fn from_env() -> ClientResult<Self> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a key lookup (environment-style names).
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ClientResult<Self> {
        if let Some(url) = lookup("LEXIGUARD_API_URL") {
            self.service.base_url = url;
        }
        if let Some(v) = lookup("LEXIGUARD_REQUEST_TIMEOUT_SECS") {
            self.service.request_timeout_secs = parse_number("LEXIGUARD_REQUEST_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("LEXIGUARD_POLL_INTERVAL_MS") {
            self.poll.interval_ms = parse_number("LEXIGUARD_POLL_INTERVAL_MS", &v)?;
        }
        if let Some(v) = lookup("LEXIGUARD_MAX_POLL_ATTEMPTS") {
            self.poll.max_attempts = parse_number("LEXIGUARD_MAX_POLL_ATTEMPTS", &v)?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> ClientResult<()> {
        self.service.validate()?;
        self.poll.validate()
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> ClientResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ClientError::Configuration(format!("{key} must be a number, got {value:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.poll.interval(), Duration::from_secs(2));
        assert_eq!(config.poll.max_attempts, 60);
        assert_eq!(config.poll.budget(), Duration::from_secs(120));
        assert_eq!(config.service.base_url, "http://localhost:8000");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml() {
        let config = ClientConfig::from_toml_str(
            r#"
            [service]
            base_url = "https://api.example.com/"

            [poll]
            max_attempts = 30
            "#,
        )
        .unwrap();

        assert_eq!(config.service.base_url, "https://api.example.com/");
        assert_eq!(config.poll.max_attempts, 30);
        assert_eq!(config.poll.interval_ms, 2_000);
        assert_eq!(
            config.service.endpoint("/job-status/abc"),
            "https://api.example.com/job-status/abc"
        );
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(ClientConfig::from_toml_str("").unwrap(), ClientConfig::default());
    }

    #[test]
    fn test_rejects_zero_policy() {
        let err = ClientConfig::from_toml_str("[poll]\ninterval_ms = 0").unwrap_err();
        assert!(matches!(err, ClientError::Configuration(_)));
        assert!(PollPolicy::new(Duration::from_secs(1), 0).validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig::default()
            .with_overrides(|key| match key {
                "LEXIGUARD_API_URL" => Some("http://10.0.0.5:9000".to_string()),
                "LEXIGUARD_MAX_POLL_ATTEMPTS" => Some("5".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.service.base_url, "http://10.0.0.5:9000");
        assert_eq!(config.poll.max_attempts, 5);

        let err = ClientConfig::default()
            .with_overrides(|key| (key == "LEXIGUARD_POLL_INTERVAL_MS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("LEXIGUARD_POLL_INTERVAL_MS"));
    }

    #[test]
    fn test_rejects_non_http_url() {
        assert!(ServiceConfig::with_base_url("ftp://x").validate().is_err());
    }
}
