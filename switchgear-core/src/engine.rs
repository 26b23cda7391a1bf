//! Engine handle: shared adapter and instrumenter, feature accessors.

use crate::actor::Flaggable;
use crate::adapter::Adapter;
use crate::error::FlagResult;
use crate::feature::Feature;
use crate::gate_values::GateValues;
use crate::instrument::{Instrumenter, NoopInstrumenter};
use crate::memory::MemoryAdapter;
use std::collections::HashMap;
use std::sync::Arc;

/// Shared handle an application keeps for its feature flags.
///
/// Owns nothing but references: the adapter and the instrumenter are
/// shared with every [`Feature`] it hands out, so a handle is cheap to
/// clone and safe to use from any number of tasks.
///
/// # Examples
///
/// ```
/// use switchgear_core::prelude::*;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> FlagResult<()> {
/// let flags = Switchgear::memory();
///
/// flags.feature("search").enable().await?;
/// assert!(flags.enabled("search").await?);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Switchgear {
    adapter: Arc<dyn Adapter>,
    instrumenter: Arc<dyn Instrumenter>,
}

impl Switchgear {
    /// Build a handle over an adapter, with instrumentation off.
    pub fn new(adapter: Arc<dyn Adapter>) -> Self {
        Self::with_instrumenter(adapter, Arc::new(NoopInstrumenter))
    }

    /// Build a handle reporting every operation to an instrumenter.
    pub fn with_instrumenter(
        adapter: Arc<dyn Adapter>,
        instrumenter: Arc<dyn Instrumenter>,
    ) -> Self {
        Self {
            adapter,
            instrumenter,
        }
    }

    /// Handle over a fresh in-memory adapter.
    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryAdapter::new()))
    }

    /// The shared adapter.
    pub fn adapter(&self) -> Arc<dyn Adapter> {
        self.adapter.clone()
    }

    /// The feature with the given name.
    pub fn feature(&self, name: impl Into<String>) -> Feature {
        Feature::with_instrumenter(name, self.adapter.clone(), self.instrumenter.clone())
    }

    /// Whether a feature is enabled with no actor in play.
    pub async fn enabled(&self, name: &str) -> FlagResult<bool> {
        self.feature(name).enabled().await
    }

    /// Whether a feature is enabled for one actor.
    pub async fn enabled_for(&self, name: &str, actor: &dyn Flaggable) -> FlagResult<bool> {
        self.feature(name).enabled_for(actor).await
    }

    /// Register a feature in the directory.
    pub async fn add(&self, name: &str) -> FlagResult<bool> {
        self.feature(name).add().await
    }

    /// Unregister a feature and wipe its stored state.
    pub async fn remove(&self, name: &str) -> FlagResult<bool> {
        self.feature(name).remove().await
    }

    /// Whether a feature is in the directory.
    pub async fn exists(&self, name: &str) -> FlagResult<bool> {
        self.feature(name).exists().await
    }

    /// Every registered feature, sorted by name.
    pub async fn features(&self) -> FlagResult<Vec<Feature>> {
        let mut names: Vec<String> = self.adapter.features().await?.into_iter().collect();
        names.sort();
        Ok(names.into_iter().map(|name| self.feature(name)).collect())
    }

    /// Stored state for several features in one adapter read.
    pub async fn preload(&self, names: &[&str]) -> FlagResult<HashMap<String, GateValues>> {
        let records = self.adapter.get_multi(names).await?;
        Ok(records
            .into_iter()
            .map(|(name, raw)| (name, GateValues::from(raw)))
            .collect())
    }

    /// Stored state for every registered feature in one adapter read.
    pub async fn preload_all(&self) -> FlagResult<HashMap<String, GateValues>> {
        let records = self.adapter.get_all().await?;
        Ok(records
            .into_iter()
            .map(|(name, raw)| (name, GateValues::from(raw)))
            .collect())
    }
}

impl std::fmt::Debug for Switchgear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Switchgear").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Actor;
    use crate::instrument::{MemoryInstrumenter, Operation};

    #[tokio::test]
    async fn test_feature_accessor_shares_adapter() {
        let flags = Switchgear::memory();

        flags.feature("search").enable().await.unwrap();

        // A second Feature value with the same name sees the same state.
        assert!(flags.feature("search").enabled().await.unwrap());
        assert!(flags.enabled("search").await.unwrap());
    }

    #[tokio::test]
    async fn test_enabled_for_convenience() {
        let flags = Switchgear::memory();
        let actor = Actor::new("5");

        flags.feature("search").enable_actor(&actor).await.unwrap();
        assert!(flags.enabled_for("search", &actor).await.unwrap());
        assert!(!flags.enabled_for("search", &Actor::new("7")).await.unwrap());
    }

    #[tokio::test]
    async fn test_directory() {
        let flags = Switchgear::memory();
        flags.add("stats").await.unwrap();
        flags.add("search").await.unwrap();

        assert!(flags.exists("search").await.unwrap());

        let names: Vec<String> = flags
            .features()
            .await
            .unwrap()
            .iter()
            .map(|feature| feature.name().to_string())
            .collect();
        assert_eq!(names, vec!["search".to_string(), "stats".to_string()]);

        flags.remove("stats").await.unwrap();
        assert!(!flags.exists("stats").await.unwrap());
    }

    #[tokio::test]
    async fn test_preload() {
        let flags = Switchgear::memory();
        flags.feature("search").enable().await.unwrap();

        let preloaded = flags.preload(&["search", "stats"]).await.unwrap();
        assert_eq!(preloaded.len(), 2);
        assert_eq!(preloaded["search"].boolean, Some(true));
        assert!(preloaded["stats"].is_default());
    }

    #[tokio::test]
    async fn test_preload_all() {
        let flags = Switchgear::memory();
        flags.add("search").await.unwrap();
        flags.feature("search").enable().await.unwrap();

        let preloaded = flags.preload_all().await.unwrap();
        assert_eq!(preloaded.len(), 1);
        assert_eq!(preloaded["search"].boolean, Some(true));
    }

    #[tokio::test]
    async fn test_handle_shares_instrumenter() {
        let instrumenter = Arc::new(MemoryInstrumenter::new());
        let flags = Switchgear::with_instrumenter(
            Arc::new(MemoryAdapter::new()),
            instrumenter.clone(),
        );

        flags.feature("search").enable().await.unwrap();
        flags.enabled("search").await.unwrap();

        let events = instrumenter.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].operation, Operation::Enable);
        assert_eq!(events[1].operation, Operation::Enabled);
    }
}
