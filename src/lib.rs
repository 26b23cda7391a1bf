// Switchgear - runtime feature flags for Rust services
//
// This library provides gate-based feature toggling with deterministic
// percentage rollouts, rule expressions and pluggable storage.

// Re-export the core engine
pub use switchgear_core::*;

// Re-export optional storage backends
#[cfg(feature = "cache")]
pub use switchgear_cache;

#[cfg(feature = "redis")]
pub use switchgear_redis;

// Prelude for common imports
pub mod prelude {
    pub use switchgear_core::prelude::*;

    #[cfg(feature = "cache")]
    pub use switchgear_cache::{CacheConfig, CachedAdapter};

    #[cfg(feature = "redis")]
    pub use switchgear_redis::{RedisAdapter, RedisConfig};
}
