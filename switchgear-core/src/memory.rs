//! In-memory adapter.

use crate::adapter::{Adapter, WireValue};
use crate::error::{AdapterError, AdapterResult};
use crate::gate::GateName;
use crate::gate_values::RawGateValues;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct MemoryStore {
    features: HashSet<String>,
    records: HashMap<String, RawGateValues>,
}

/// Thread-safe in-memory adapter.
///
/// The default backend for tests and single-process deployments.
/// Clones share the same store.
#[derive(Debug, Clone, Default)]
pub struct MemoryAdapter {
    store: Arc<RwLock<MemoryStore>>,
}

impl MemoryAdapter {
    /// Create an empty adapter.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Adapter for MemoryAdapter {
    async fn features(&self) -> AdapterResult<HashSet<String>> {
        Ok(self.store.read().await.features.clone())
    }

    async fn add(&self, feature: &str) -> AdapterResult<bool> {
        self.store.write().await.features.insert(feature.to_string());
        Ok(true)
    }

    async fn remove(&self, feature: &str) -> AdapterResult<bool> {
        let mut store = self.store.write().await;
        store.features.remove(feature);
        store.records.remove(feature);
        Ok(true)
    }

    async fn clear(&self, feature: &str) -> AdapterResult<bool> {
        self.store.write().await.records.remove(feature);
        Ok(true)
    }

    async fn get(&self, feature: &str) -> AdapterResult<RawGateValues> {
        Ok(self
            .store
            .read()
            .await
            .records
            .get(feature)
            .cloned()
            .unwrap_or_else(RawGateValues::default_config))
    }

    async fn get_multi(&self, features: &[&str]) -> AdapterResult<HashMap<String, RawGateValues>> {
        let store = self.store.read().await;
        Ok(features
            .iter()
            .map(|feature| {
                let record = store
                    .records
                    .get(*feature)
                    .cloned()
                    .unwrap_or_else(RawGateValues::default_config);
                ((*feature).to_string(), record)
            })
            .collect())
    }

    async fn get_all(&self) -> AdapterResult<HashMap<String, RawGateValues>> {
        let store = self.store.read().await;
        Ok(store
            .features
            .iter()
            .map(|feature| {
                let record = store
                    .records
                    .get(feature)
                    .cloned()
                    .unwrap_or_else(RawGateValues::default_config);
                (feature.clone(), record)
            })
            .collect())
    }

    async fn enable(
        &self,
        feature: &str,
        gate: GateName,
        value: &WireValue,
    ) -> AdapterResult<bool> {
        let mut store = self.store.write().await;
        let record = store.records.entry(feature.to_string()).or_default();

        match (gate, value) {
            (GateName::Boolean, WireValue::Bool(true)) => {
                record.boolean = Some("true".to_string());
            }
            (GateName::Boolean, WireValue::Bool(false)) => {
                *record = RawGateValues::default_config();
            }
            (GateName::Actor, WireValue::Member(id)) => {
                record.actors.insert(id.clone());
            }
            (GateName::Group, WireValue::Member(name)) => {
                record.groups.insert(name.clone());
            }
            (GateName::PercentageOfActors, WireValue::Integer(percentage)) => {
                record.percentage_of_actors = Some(percentage.to_string());
            }
            (GateName::PercentageOfTime, WireValue::Integer(percentage)) => {
                record.percentage_of_time = Some(percentage.to_string());
            }
            (GateName::Expression, WireValue::Expression(wire)) => {
                record.expression = Some(wire.clone());
            }
            (gate, value) => {
                return Err(AdapterError::Backend(format!(
                    "gate {gate} cannot store {value:?}"
                )));
            }
        }
        Ok(true)
    }

    async fn disable(
        &self,
        feature: &str,
        gate: GateName,
        value: &WireValue,
    ) -> AdapterResult<bool> {
        let mut store = self.store.write().await;
        let record = store.records.entry(feature.to_string()).or_default();

        match (gate, value) {
            (GateName::Boolean, _) => {
                *record = RawGateValues::default_config();
            }
            (GateName::Actor, WireValue::Member(id)) => {
                record.actors.remove(id);
            }
            (GateName::Group, WireValue::Member(name)) => {
                record.groups.remove(name);
            }
            (GateName::PercentageOfActors, WireValue::Integer(percentage)) => {
                record.percentage_of_actors = Some(percentage.to_string());
            }
            (GateName::PercentageOfTime, WireValue::Integer(percentage)) => {
                record.percentage_of_time = Some(percentage.to_string());
            }
            (GateName::Expression, _) => {
                record.expression = None;
            }
            (gate, value) => {
                return Err(AdapterError::Backend(format!(
                    "gate {gate} cannot store {value:?}"
                )));
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_unknown_feature_is_default() {
        let adapter = MemoryAdapter::new();
        let record = adapter.get("search").await.unwrap();
        assert!(record.is_default());
    }

    #[tokio::test]
    async fn test_add_remove_features() {
        let adapter = MemoryAdapter::new();
        adapter.add("search").await.unwrap();
        adapter.add("search").await.unwrap();
        adapter.add("stats").await.unwrap();

        let features = adapter.features().await.unwrap();
        assert_eq!(features.len(), 2);
        assert!(features.contains("search"));

        adapter.remove("search").await.unwrap();
        assert!(!adapter.features().await.unwrap().contains("search"));
    }

    #[tokio::test]
    async fn test_remove_wipes_gate_values() {
        let adapter = MemoryAdapter::new();
        adapter.add("search").await.unwrap();
        adapter
            .enable("search", GateName::Boolean, &WireValue::Bool(true))
            .await
            .unwrap();

        adapter.remove("search").await.unwrap();
        assert!(adapter.get("search").await.unwrap().is_default());
    }

    #[tokio::test]
    async fn test_clear_keeps_membership() {
        let adapter = MemoryAdapter::new();
        adapter.add("search").await.unwrap();
        adapter
            .enable("search", GateName::Actor, &WireValue::Member("5".to_string()))
            .await
            .unwrap();

        adapter.clear("search").await.unwrap();
        assert!(adapter.get("search").await.unwrap().is_default());
        assert!(adapter.features().await.unwrap().contains("search"));
    }

    #[tokio::test]
    async fn test_set_gate_round_trip() {
        let adapter = MemoryAdapter::new();
        adapter
            .enable("search", GateName::Actor, &WireValue::Member("5".to_string()))
            .await
            .unwrap();
        adapter
            .enable("search", GateName::Actor, &WireValue::Member("22".to_string()))
            .await
            .unwrap();
        // Idempotent per element.
        adapter
            .enable("search", GateName::Actor, &WireValue::Member("5".to_string()))
            .await
            .unwrap();

        let record = adapter.get("search").await.unwrap();
        assert_eq!(record.actors.len(), 2);
        assert!(record.actors.contains("5"));
        assert!(record.actors.contains("22"));

        adapter
            .disable("search", GateName::Actor, &WireValue::Member("5".to_string()))
            .await
            .unwrap();
        let record = adapter.get("search").await.unwrap();
        assert!(!record.actors.contains("5"));
        assert!(record.actors.contains("22"));
    }

    #[tokio::test]
    async fn test_disable_absent_member_is_noop() {
        let adapter = MemoryAdapter::new();
        adapter
            .disable("search", GateName::Actor, &WireValue::Member("9".to_string()))
            .await
            .unwrap();
        assert!(adapter.get("search").await.unwrap().is_default());
    }

    #[tokio::test]
    async fn test_integer_gate_keeps_last_write() {
        let adapter = MemoryAdapter::new();
        adapter
            .enable("search", GateName::PercentageOfActors, &WireValue::Integer(25))
            .await
            .unwrap();
        adapter
            .enable("search", GateName::PercentageOfActors, &WireValue::Integer(50))
            .await
            .unwrap();

        let record = adapter.get("search").await.unwrap();
        assert_eq!(record.percentage_of_actors.as_deref(), Some("50"));
    }

    #[tokio::test]
    async fn test_boolean_disable_resets_record() {
        let adapter = MemoryAdapter::new();
        adapter
            .enable("search", GateName::Actor, &WireValue::Member("5".to_string()))
            .await
            .unwrap();
        adapter
            .disable("search", GateName::Boolean, &WireValue::Bool(false))
            .await
            .unwrap();

        assert!(adapter.get("search").await.unwrap().is_default());
    }

    #[tokio::test]
    async fn test_expression_replace_and_clear() {
        let adapter = MemoryAdapter::new();
        let wire = json!({ "Equal": [{ "Property": ["plan"] }, "basic"] });
        adapter
            .enable("search", GateName::Expression, &WireValue::Expression(wire.clone()))
            .await
            .unwrap();
        assert_eq!(adapter.get("search").await.unwrap().expression, Some(wire));

        adapter
            .disable("search", GateName::Expression, &WireValue::Expression(json!(null)))
            .await
            .unwrap();
        assert!(adapter.get("search").await.unwrap().expression.is_none());
    }

    #[tokio::test]
    async fn test_mismatched_wire_value_rejected() {
        let adapter = MemoryAdapter::new();
        let err = adapter
            .enable("search", GateName::Boolean, &WireValue::Integer(1))
            .await;
        assert!(matches!(err, Err(AdapterError::Backend(_))));
    }

    #[tokio::test]
    async fn test_get_multi_fills_missing_with_defaults() {
        let adapter = MemoryAdapter::new();
        adapter
            .enable("search", GateName::Boolean, &WireValue::Bool(true))
            .await
            .unwrap();

        let records = adapter.get_multi(&["search", "stats"]).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records["search"].boolean.as_deref(),
            Some("true")
        );
        assert!(records["stats"].is_default());
    }

    #[tokio::test]
    async fn test_get_all_covers_registered_features() {
        let adapter = MemoryAdapter::new();
        adapter.add("search").await.unwrap();
        adapter.add("stats").await.unwrap();
        adapter
            .enable("search", GateName::PercentageOfTime, &WireValue::Integer(10))
            .await
            .unwrap();

        let records = adapter.get_all().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records["search"].percentage_of_time.as_deref(),
            Some("10")
        );
        assert!(records["stats"].is_default());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let adapter = MemoryAdapter::new();
        let clone = adapter.clone();
        adapter.add("search").await.unwrap();
        assert!(clone.features().await.unwrap().contains("search"));
    }
}
