//! Read-through caching for switchgear adapters.
//!
//! Wraps any source adapter with a local snapshot layer so hot-path
//! checks stay off the network. Reads fall through to the source on a
//! miss and populate the local layer; every write goes to the source
//! and invalidates the affected snapshot.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use switchgear_cache::{CacheConfig, CachedAdapter};
//! use switchgear_core::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> FlagResult<()> {
//! let source = Arc::new(MemoryAdapter::new());
//! let config = CacheConfig::default().with_ttl(Duration::from_secs(10));
//! let adapter = CachedAdapter::with_config(source, config);
//!
//! let flags = Switchgear::new(Arc::new(adapter));
//! flags.feature("search").enable().await?;
//! assert!(flags.enabled("search").await?);
//! # Ok(())
//! # }
//! ```

pub mod cached;
pub mod config;

pub use cached::CachedAdapter;
pub use config::CacheConfig;
