//! Read-through caching adapter.

use crate::config::CacheConfig;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use switchgear_core::{Adapter, AdapterResult, GateName, RawGateValues, WireValue};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
struct Snapshot {
    record: RawGateValues,
    cached_at: Instant,
}

#[derive(Debug, Clone)]
struct DirectorySnapshot {
    names: HashSet<String>,
    cached_at: Instant,
}

/// Read-through snapshot cache over a source adapter.
///
/// Reads are served from the local layer while fresh; misses fall
/// through to the source and populate it. Every mutation is forwarded
/// to the source first and then invalidates the affected snapshot, so
/// a handle observes its own writes immediately. Staleness across
/// handles is bounded by the configured TTL.
pub struct CachedAdapter<A: Adapter> {
    source: Arc<A>,
    snapshots: Arc<RwLock<HashMap<String, Snapshot>>>,
    directory: Arc<RwLock<Option<DirectorySnapshot>>>,
    config: CacheConfig,
}

impl<A: Adapter> CachedAdapter<A> {
    /// Cache over a source adapter with default configuration.
    pub fn new(source: Arc<A>) -> Self {
        Self::with_config(source, CacheConfig::default())
    }

    /// Cache over a source adapter with custom configuration.
    pub fn with_config(source: Arc<A>, config: CacheConfig) -> Self {
        Self {
            source,
            snapshots: Arc::new(RwLock::new(HashMap::new())),
            directory: Arc::new(RwLock::new(None)),
            config,
        }
    }

    /// The wrapped source adapter.
    pub fn source(&self) -> &Arc<A> {
        &self.source
    }

    fn fresh(&self, cached_at: Instant) -> bool {
        self.config
            .ttl
            .map(|ttl| cached_at.elapsed() <= ttl)
            .unwrap_or(true)
    }

    async fn invalidate(&self, feature: &str) {
        self.snapshots.write().await.remove(feature);
    }

    async fn invalidate_directory(&self) {
        *self.directory.write().await = None;
    }

    async fn store(&self, feature: &str, record: RawGateValues) {
        self.snapshots.write().await.insert(
            feature.to_string(),
            Snapshot {
                record,
                cached_at: Instant::now(),
            },
        );
    }
}

impl<A: Adapter> Clone for CachedAdapter<A> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            snapshots: self.snapshots.clone(),
            directory: self.directory.clone(),
            config: self.config.clone(),
        }
    }
}

#[async_trait]
impl<A: Adapter> Adapter for CachedAdapter<A> {
    async fn features(&self) -> AdapterResult<HashSet<String>> {
        if self.config.cache_features {
            if let Some(snapshot) = self.directory.read().await.as_ref() {
                if self.fresh(snapshot.cached_at) {
                    return Ok(snapshot.names.clone());
                }
            }
        }

        let names = self.source.features().await?;
        if self.config.cache_features {
            *self.directory.write().await = Some(DirectorySnapshot {
                names: names.clone(),
                cached_at: Instant::now(),
            });
        }
        Ok(names)
    }

    async fn add(&self, feature: &str) -> AdapterResult<bool> {
        let result = self.source.add(feature).await?;
        self.invalidate_directory().await;
        Ok(result)
    }

    async fn remove(&self, feature: &str) -> AdapterResult<bool> {
        let result = self.source.remove(feature).await?;
        self.invalidate(feature).await;
        self.invalidate_directory().await;
        Ok(result)
    }

    async fn clear(&self, feature: &str) -> AdapterResult<bool> {
        let result = self.source.clear(feature).await?;
        self.invalidate(feature).await;
        Ok(result)
    }

    async fn get(&self, feature: &str) -> AdapterResult<RawGateValues> {
        if let Some(snapshot) = self.snapshots.read().await.get(feature) {
            if self.fresh(snapshot.cached_at) {
                return Ok(snapshot.record.clone());
            }
        }

        debug!(target: "switchgear::cache", "snapshot miss for feature {feature}");
        let record = self.source.get(feature).await?;
        self.store(feature, record.clone()).await;
        Ok(record)
    }

    async fn get_multi(&self, features: &[&str]) -> AdapterResult<HashMap<String, RawGateValues>> {
        let mut records = HashMap::with_capacity(features.len());
        for feature in features {
            records.insert((*feature).to_string(), self.get(feature).await?);
        }
        Ok(records)
    }

    async fn get_all(&self) -> AdapterResult<HashMap<String, RawGateValues>> {
        let records = self.source.get_all().await?;
        for (feature, record) in &records {
            self.store(feature, record.clone()).await;
        }
        Ok(records)
    }

    async fn enable(
        &self,
        feature: &str,
        gate: GateName,
        value: &WireValue,
    ) -> AdapterResult<bool> {
        let result = self.source.enable(feature, gate, value).await?;
        self.invalidate(feature).await;
        Ok(result)
    }

    async fn disable(
        &self,
        feature: &str,
        gate: GateName,
        value: &WireValue,
    ) -> AdapterResult<bool> {
        let result = self.source.disable(feature, gate, value).await?;
        self.invalidate(feature).await;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use switchgear_core::MemoryAdapter;

    fn cached() -> (CachedAdapter<MemoryAdapter>, Arc<MemoryAdapter>) {
        let source = Arc::new(MemoryAdapter::new());
        (CachedAdapter::new(source.clone()), source)
    }

    #[tokio::test]
    async fn test_read_through_populates_snapshot() {
        let (adapter, source) = cached();
        source
            .enable("search", GateName::Boolean, &WireValue::Bool(true))
            .await
            .unwrap();

        // First read falls through, second is served locally.
        assert_eq!(
            adapter.get("search").await.unwrap().boolean.as_deref(),
            Some("true")
        );
        assert!(adapter.snapshots.read().await.contains_key("search"));
    }

    #[tokio::test]
    async fn test_snapshot_serves_stale_until_invalidated() {
        let (adapter, source) = cached();

        adapter.get("search").await.unwrap();

        // A foreign write through the source is invisible to the
        // snapshot layer until something invalidates it.
        source
            .enable("search", GateName::Boolean, &WireValue::Bool(true))
            .await
            .unwrap();
        assert!(adapter.get("search").await.unwrap().is_default());

        adapter.clear("search").await.unwrap();
        source
            .enable("search", GateName::Boolean, &WireValue::Bool(true))
            .await
            .unwrap();
        assert_eq!(
            adapter.get("search").await.unwrap().boolean.as_deref(),
            Some("true")
        );
    }

    #[tokio::test]
    async fn test_own_writes_visible_immediately() {
        let (adapter, _source) = cached();

        adapter.get("search").await.unwrap();
        adapter
            .enable("search", GateName::Actor, &WireValue::Member("5".to_string()))
            .await
            .unwrap();

        assert!(adapter.get("search").await.unwrap().actors.contains("5"));
    }

    #[tokio::test]
    async fn test_ttl_expiry_refreshes_snapshot() {
        let source = Arc::new(MemoryAdapter::new());
        let config = CacheConfig::default().with_ttl(Duration::from_millis(20));
        let adapter = CachedAdapter::with_config(source.clone(), config);

        adapter.get("search").await.unwrap();
        source
            .enable("search", GateName::Boolean, &WireValue::Bool(true))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(
            adapter.get("search").await.unwrap().boolean.as_deref(),
            Some("true")
        );
    }

    #[tokio::test]
    async fn test_directory_cached_and_invalidated() {
        let (adapter, source) = cached();

        adapter.add("search").await.unwrap();
        assert!(adapter.features().await.unwrap().contains("search"));

        // Foreign directory write, then our own write invalidates.
        source.add("stats").await.unwrap();
        assert!(!adapter.features().await.unwrap().contains("stats"));

        adapter.add("reports").await.unwrap();
        let names = adapter.features().await.unwrap();
        assert!(names.contains("stats"));
        assert!(names.contains("reports"));
    }

    #[tokio::test]
    async fn test_get_all_populates_snapshots() {
        let (adapter, source) = cached();
        source.add("search").await.unwrap();
        source
            .enable("search", GateName::PercentageOfTime, &WireValue::Integer(10))
            .await
            .unwrap();

        let records = adapter.get_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(adapter.snapshots.read().await.contains_key("search"));
    }

    #[tokio::test]
    async fn test_remove_invalidates_everything_for_feature() {
        let (adapter, _source) = cached();
        adapter.add("search").await.unwrap();
        adapter
            .enable("search", GateName::Boolean, &WireValue::Bool(true))
            .await
            .unwrap();
        adapter.get("search").await.unwrap();

        adapter.remove("search").await.unwrap();
        assert!(adapter.get("search").await.unwrap().is_default());
        assert!(!adapter.features().await.unwrap().contains("search"));
    }
}
