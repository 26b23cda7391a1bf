//! Redis adapter configuration.

use std::time::Duration;

/// Configuration for [`RedisAdapter`](crate::RedisAdapter).
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Connection URL, e.g. `redis://localhost:6379`.
    pub url: String,

    /// Prefix applied to every key.
    pub key_prefix: Option<String>,

    /// Connection timeout.
    pub connection_timeout: Duration,
}

impl RedisConfig {
    /// Configuration for a connection URL.
    ///
    /// # Examples
    ///
    /// ```
    /// use switchgear_redis::RedisConfig;
    ///
    /// let config = RedisConfig::new("redis://localhost:6379");
    /// assert_eq!(config.url, "redis://localhost:6379");
    /// ```
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            key_prefix: None,
            connection_timeout: Duration::from_secs(5),
        }
    }

    /// Set the key prefix.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Set the connection timeout.
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Build the final key with prefix if configured.
    pub fn build_key(&self, key: &str) -> String {
        match &self.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }
}
