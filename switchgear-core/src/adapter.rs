//! Persistence seam shared by every storage backend.

use crate::error::AdapterResult;
use crate::gate::GateName;
use crate::gate_values::RawGateValues;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Wire-level value handed to adapter mutations.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    /// Target truth value for the boolean gate.
    Bool(bool),
    /// One element of a set gate: an actor id or a group name.
    Member(String),
    /// New value for an integer gate.
    Integer(u8),
    /// Replacement wire mapping for the expression gate.
    Expression(Value),
}

/// Storage backend contract.
///
/// Adapters persist per-feature gate state and the feature directory.
/// They may be eventually consistent across processes but must be
/// linearizable through a single handle, and must uphold:
///
/// - `get` after `clear` returns the default-shaped record
/// - set-gate writes are idempotent per element
/// - integer gates keep the most recent write
/// - `features` never contains duplicates
///
/// Disabling the boolean gate resets the whole feature record, pairing
/// with the kill-switch semantics of a bare disable. Disabling an
/// integer gate writes `0`, a set gate removes one element, and the
/// expression gate clears the stored rule.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Registered feature names.
    async fn features(&self) -> AdapterResult<HashSet<String>>;

    /// Register a feature name. Idempotent.
    async fn add(&self, feature: &str) -> AdapterResult<bool>;

    /// Unregister a feature and wipe its gate values.
    async fn remove(&self, feature: &str) -> AdapterResult<bool>;

    /// Reset every gate to its default; directory membership is
    /// unchanged.
    async fn clear(&self, feature: &str) -> AdapterResult<bool>;

    /// Full default-shaped record for one feature, known or not.
    async fn get(&self, feature: &str) -> AdapterResult<RawGateValues>;

    /// Records for several features at once.
    async fn get_multi(&self, features: &[&str]) -> AdapterResult<HashMap<String, RawGateValues>> {
        let mut records = HashMap::with_capacity(features.len());
        for feature in features {
            records.insert((*feature).to_string(), self.get(feature).await?);
        }
        Ok(records)
    }

    /// Records for every registered feature.
    async fn get_all(&self) -> AdapterResult<HashMap<String, RawGateValues>> {
        let names = self.features().await?;
        let mut records = HashMap::with_capacity(names.len());
        for name in names {
            let record = self.get(&name).await?;
            records.insert(name, record);
        }
        Ok(records)
    }

    /// Mutate one gate toward enabled.
    async fn enable(&self, feature: &str, gate: GateName, value: &WireValue)
        -> AdapterResult<bool>;

    /// Mutate one gate toward disabled.
    async fn disable(
        &self,
        feature: &str,
        gate: GateName,
        value: &WireValue,
    ) -> AdapterResult<bool>;
}
