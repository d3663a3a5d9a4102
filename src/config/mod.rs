//! Crawler configuration
//!
//! The configuration file is a JSON document carrying the initial filter tags,
//! the credentials passed through to the stream source, and optional sections
//! for the source connection, the retry policy and the output codec.
//!
//! ```json
//! {
//!   "tags": ["rust", "tokio"],
//!   "user": "alice",
//!   "password": "secret",
//!   "source": { "address": "127.0.0.1:7878", "idle_timeout_ms": 1000 },
//!   "retry": { "backoff_ms": 1000 },
//!   "output": { "compression_level": 6 }
//! }
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::TagSet;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or validating the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level crawler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Initial filter terms
    pub tags: Vec<String>,
    /// Account name passed through to the source
    pub user: String,
    /// Account secret passed through to the source
    pub password: String,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub output: OutputConfig,
}

impl CrawlConfig {
    /// Read and validate a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// Parse and validate a configuration document
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        let config: CrawlConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants serde cannot express
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(pos) = self.tags.iter().position(|t| t.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("tag #{} is empty", pos + 1)));
        }
        if self.source.address.trim().is_empty() {
            return Err(ConfigError::Invalid("source.address is empty".to_string()));
        }
        if self.source.idle_timeout_ms == 0 || self.source.connect_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "source timeouts must be positive".to_string(),
            ));
        }
        if self.output.compression_level > 9 {
            return Err(ConfigError::Invalid(format!(
                "output.compression_level {} is out of range 0-9",
                self.output.compression_level
            )));
        }
        if self.retry.max_attempts == Some(0) {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be positive when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Initial filter as a set (duplicates collapse)
    pub fn tag_set(&self) -> TagSet {
        self.tags.iter().cloned().collect()
    }

    /// Credentials to hand to the stream source
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.user.clone(), self.password.clone())
    }
}

/// Stream source connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// `host:port` of the stream endpoint
    pub address: String,
    /// Upper bound on establishing the connection and reading the handshake
    pub connect_timeout_ms: u64,
    /// Longest silence before the source reports an idle tick
    pub idle_timeout_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:7878".to_string(),
            connect_timeout_ms: 5_000,
            idle_timeout_ms: 1_000,
        }
    }
}

impl SourceConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
}

/// Reconnect policy of the control loop
///
/// The loop always waits `backoff_ms` before reconnecting. With
/// `max_attempts` unset (the default) it retries forever; when set, that many
/// consecutive failures without a delivered event end the run with an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub backoff_ms: u64,
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff_ms: 1_000,
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    /// Retry forever with a fixed pause
    pub fn unbounded(backoff: Duration) -> Self {
        Self {
            backoff_ms: backoff.as_millis() as u64,
            max_attempts: None,
        }
    }

    /// Give up after `max_attempts` consecutive failures
    pub fn capped(backoff: Duration, max_attempts: u32) -> Self {
        Self {
            backoff_ms: backoff.as_millis() as u64,
            max_attempts: Some(max_attempts),
        }
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    /// Whether another attempt is allowed after `failures` consecutive failures
    pub fn allows_retry(&self, failures: u32) -> bool {
        match self.max_attempts {
            Some(max) => failures < max,
            None => true,
        }
    }
}

/// Output codec settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// gzip level, 0 (store) to 9 (best)
    pub compression_level: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            compression_level: 6,
        }
    }
}

/// Opaque account credentials for the stream source
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    user: String,
    password: String,
}

impl Credentials {
    pub fn new(user: String, password: String) -> Self {
        Self { user, password }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}
