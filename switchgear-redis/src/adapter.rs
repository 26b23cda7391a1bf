//! Redis adapter implementation.
//!
//! Storage layout: one hash per feature plus a set for the directory.
//!
//! | key | content |
//! |---|---|
//! | `<prefix>:features` | set of feature names |
//! | `<prefix>:feature:<name>` | hash of gate fields |
//!
//! Hash fields follow the wire encoding: `boolean` holds `"true"`,
//! `actors/<id>` and `groups/<name>` mark set members, the two
//! percentage fields hold decimal integer strings and `expression`
//! holds the rule's JSON.

use crate::config::RedisConfig;
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use std::collections::{HashMap, HashSet};
use switchgear_core::{
    Adapter, AdapterError, AdapterResult, GateName, RawGateValues, WireValue,
};
use tracing::warn;

const BOOLEAN_FIELD: &str = "boolean";
const EXPRESSION_FIELD: &str = "expression";
const PERCENTAGE_OF_TIME_FIELD: &str = "percentage_of_time";
const PERCENTAGE_OF_ACTORS_FIELD: &str = "percentage_of_actors";
const ACTOR_PREFIX: &str = "actors/";
const GROUP_PREFIX: &str = "groups/";

/// Redis storage adapter.
#[derive(Clone)]
pub struct RedisAdapter {
    connection: ConnectionManager,
    config: RedisConfig,
}

impl RedisAdapter {
    /// Connect to Redis.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use switchgear_redis::{RedisAdapter, RedisConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), switchgear_core::AdapterError> {
    ///     let config = RedisConfig::new("redis://localhost:6379");
    ///     let adapter = RedisAdapter::new(config).await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: RedisConfig) -> AdapterResult<Self> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| AdapterError::Connection(e.to_string()))?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| AdapterError::Connection(e.to_string()))?;

        Ok(Self { connection, config })
    }

    fn features_key(&self) -> String {
        self.config.build_key("features")
    }

    fn feature_key(&self, feature: &str) -> String {
        self.config.build_key(&format!("feature:{feature}"))
    }

    fn parse_record(feature: &str, fields: HashMap<String, String>) -> RawGateValues {
        let mut record = RawGateValues::default_config();
        for (field, value) in fields {
            if let Some(id) = field.strip_prefix(ACTOR_PREFIX) {
                record.actors.insert(id.to_string());
            } else if let Some(name) = field.strip_prefix(GROUP_PREFIX) {
                record.groups.insert(name.to_string());
            } else {
                match field.as_str() {
                    BOOLEAN_FIELD => record.boolean = Some(value),
                    PERCENTAGE_OF_TIME_FIELD => record.percentage_of_time = Some(value),
                    PERCENTAGE_OF_ACTORS_FIELD => record.percentage_of_actors = Some(value),
                    EXPRESSION_FIELD => match serde_json::from_str(&value) {
                        Ok(wire) => record.expression = Some(wire),
                        Err(err) => {
                            warn!(
                                target: "switchgear::redis",
                                "dropping undecodable expression for feature {feature}: {err}"
                            );
                        }
                    },
                    unknown => {
                        warn!(
                            target: "switchgear::redis",
                            "ignoring unknown field {unknown} for feature {feature}"
                        );
                    }
                }
            }
        }
        record
    }
}

fn backend_err(e: redis::RedisError) -> AdapterError {
    AdapterError::Backend(e.to_string())
}

#[async_trait]
impl Adapter for RedisAdapter {
    async fn features(&self) -> AdapterResult<HashSet<String>> {
        let mut conn = self.connection.clone();
        let names: HashSet<String> = conn
            .smembers(self.features_key())
            .await
            .map_err(backend_err)?;
        Ok(names)
    }

    async fn add(&self, feature: &str) -> AdapterResult<bool> {
        let mut conn = self.connection.clone();
        let _: () = conn
            .sadd(self.features_key(), feature)
            .await
            .map_err(backend_err)?;
        Ok(true)
    }

    async fn remove(&self, feature: &str) -> AdapterResult<bool> {
        let mut conn = self.connection.clone();
        let _: () = conn
            .srem(self.features_key(), feature)
            .await
            .map_err(backend_err)?;
        let _: () = conn
            .del(self.feature_key(feature))
            .await
            .map_err(backend_err)?;
        Ok(true)
    }

    async fn clear(&self, feature: &str) -> AdapterResult<bool> {
        let mut conn = self.connection.clone();
        let _: () = conn
            .del(self.feature_key(feature))
            .await
            .map_err(backend_err)?;
        Ok(true)
    }

    async fn get(&self, feature: &str) -> AdapterResult<RawGateValues> {
        let mut conn = self.connection.clone();
        let fields: HashMap<String, String> = conn
            .hgetall(self.feature_key(feature))
            .await
            .map_err(backend_err)?;
        Ok(Self::parse_record(feature, fields))
    }

    async fn enable(
        &self,
        feature: &str,
        gate: GateName,
        value: &WireValue,
    ) -> AdapterResult<bool> {
        let mut conn = self.connection.clone();
        let key = self.feature_key(feature);

        match (gate, value) {
            (GateName::Boolean, WireValue::Bool(true)) => {
                let _: () = conn
                    .hset(key, BOOLEAN_FIELD, "true")
                    .await
                    .map_err(backend_err)?;
            }
            (GateName::Boolean, WireValue::Bool(false)) => {
                let _: () = conn.del(key).await.map_err(backend_err)?;
            }
            (GateName::Actor, WireValue::Member(id)) => {
                let _: () = conn
                    .hset(key, format!("{ACTOR_PREFIX}{id}"), "1")
                    .await
                    .map_err(backend_err)?;
            }
            (GateName::Group, WireValue::Member(name)) => {
                let _: () = conn
                    .hset(key, format!("{GROUP_PREFIX}{name}"), "1")
                    .await
                    .map_err(backend_err)?;
            }
            (GateName::PercentageOfActors, WireValue::Integer(percentage)) => {
                let _: () = conn
                    .hset(key, PERCENTAGE_OF_ACTORS_FIELD, percentage.to_string())
                    .await
                    .map_err(backend_err)?;
            }
            (GateName::PercentageOfTime, WireValue::Integer(percentage)) => {
                let _: () = conn
                    .hset(key, PERCENTAGE_OF_TIME_FIELD, percentage.to_string())
                    .await
                    .map_err(backend_err)?;
            }
            (GateName::Expression, WireValue::Expression(wire)) => {
                let encoded = serde_json::to_string(wire)
                    .map_err(|e| AdapterError::Serialization(e.to_string()))?;
                let _: () = conn
                    .hset(key, EXPRESSION_FIELD, encoded)
                    .await
                    .map_err(backend_err)?;
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
        let mut conn = self.connection.clone();
        let key = self.feature_key(feature);

        match (gate, value) {
            (GateName::Boolean, _) => {
                let _: () = conn.del(key).await.map_err(backend_err)?;
            }
            (GateName::Actor, WireValue::Member(id)) => {
                let _: () = conn
                    .hdel(key, format!("{ACTOR_PREFIX}{id}"))
                    .await
                    .map_err(backend_err)?;
            }
            (GateName::Group, WireValue::Member(name)) => {
                let _: () = conn
                    .hdel(key, format!("{GROUP_PREFIX}{name}"))
                    .await
                    .map_err(backend_err)?;
            }
            (GateName::PercentageOfActors, WireValue::Integer(percentage)) => {
                let _: () = conn
                    .hset(key, PERCENTAGE_OF_ACTORS_FIELD, percentage.to_string())
                    .await
                    .map_err(backend_err)?;
            }
            (GateName::PercentageOfTime, WireValue::Integer(percentage)) => {
                let _: () = conn
                    .hset(key, PERCENTAGE_OF_TIME_FIELD, percentage.to_string())
                    .await
                    .map_err(backend_err)?;
            }
            (GateName::Expression, _) => {
                let _: () = conn
                    .hdel(key, EXPRESSION_FIELD)
                    .await
                    .map_err(backend_err)?;
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
