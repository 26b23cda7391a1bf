//! Redis storage for switchgear.
//!
//! Persists each feature as one Redis hash plus a set for the feature
//! directory, in the engine's wire encoding. Eventually consistent
//! across processes; linearizable through a single adapter handle.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use switchgear_core::prelude::*;
//! use switchgear_redis::{RedisAdapter, RedisConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), switchgear_core::FlagError> {
//!     let config = RedisConfig::new("redis://localhost:6379").with_key_prefix("flags");
//!     let adapter = RedisAdapter::new(config).await?;
//!
//!     let flags = Switchgear::new(Arc::new(adapter));
//!     flags.feature("search").enable().await?;
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod config;

pub use adapter::RedisAdapter;
pub use config::RedisConfig;
