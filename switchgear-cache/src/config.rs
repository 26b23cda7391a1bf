//! Cache configuration types.

use std::time::Duration;

/// Configuration for [`CachedAdapter`](crate::CachedAdapter).
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long a cached snapshot stays fresh. `None` means snapshots
    /// never expire and are only dropped by write invalidation.
    pub ttl: Option<Duration>,

    /// Whether the feature directory is cached as well.
    pub cache_features: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: None,
            cache_features: true,
        }
    }
}

impl CacheConfig {
    /// Set the snapshot TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Enable or disable caching of the feature directory.
    pub fn with_cache_features(mut self, enabled: bool) -> Self {
        self.cache_features = enabled;
        self
    }
}
