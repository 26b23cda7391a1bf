//! Feature orchestration: the evaluation walk and the mutation verbs.

use crate::actor::Flaggable;
use crate::adapter::{Adapter, WireValue};
use crate::error::{FlagError, FlagResult};
use crate::expression::Expression;
use crate::gate::{self, EvalContext, Gate, GateName};
use crate::gate_values::GateValues;
use crate::instrument::{Instrumenter, NoopInstrumenter, Operation, OperationEvent};
use crate::registry;
use crate::types::{Boolean, PercentageOfActors, PercentageOfTime, Target};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

/// Enablement classification of a feature's stored state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureState {
    /// Fully on: boolean gate true or time percentage at 100.
    On,
    /// Partially configured: some gate is set but not fully on.
    Conditional,
    /// Every gate at its default.
    Off,
}

impl FeatureState {
    /// Snake-case state name.
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureState::On => "on",
            FeatureState::Conditional => "conditional",
            FeatureState::Off => "off",
        }
    }
}

impl std::fmt::Display for FeatureState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named unit of conditional behavior controlled by the six gates.
///
/// A feature is cheap to construct and stateless beyond its name; two
/// features with the same name over the same adapter are
/// interchangeable. Checks read the stored state once and walk the
/// gates in fixed order, short-circuiting on the first open one.
///
/// # Examples
///
/// ```
/// use switchgear_core::prelude::*;
/// use std::sync::Arc;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> FlagResult<()> {
/// let adapter: Arc<dyn Adapter> = Arc::new(MemoryAdapter::new());
/// let search = Feature::new("search", adapter);
///
/// search.enable_actor(&Actor::new("5")).await?;
/// assert!(search.enabled_for(&Actor::new("5")).await?);
/// assert!(!search.enabled_for(&Actor::new("7")).await?);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Feature {
    name: String,
    adapter: Arc<dyn Adapter>,
    instrumenter: Arc<dyn Instrumenter>,
}

impl Feature {
    /// Create a feature over an adapter, with instrumentation off.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty; the name is the persistence key.
    pub fn new(name: impl Into<String>, adapter: Arc<dyn Adapter>) -> Self {
        Self::with_instrumenter(name, adapter, Arc::new(NoopInstrumenter))
    }

    /// Create a feature reporting to the given instrumenter.
    pub fn with_instrumenter(
        name: impl Into<String>,
        adapter: Arc<dyn Adapter>,
        instrumenter: Arc<dyn Instrumenter>,
    ) -> Self {
        let name = name.into();
        assert!(!name.is_empty(), "feature name must not be empty");
        Self {
            name,
            adapter,
            instrumenter,
        }
    }

    /// The feature's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    // ------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------

    /// Whether the feature is enabled with no actor in play. Only the
    /// boolean and time-percentage gates can open.
    pub async fn enabled(&self) -> FlagResult<bool> {
        self.check(&[]).await
    }

    /// Whether the feature is enabled for one actor.
    pub async fn enabled_for(&self, actor: &dyn Flaggable) -> FlagResult<bool> {
        self.check(&[actor]).await
    }

    /// Whether the feature is enabled for any of the given actors.
    pub async fn enabled_for_any(&self, actors: &[&dyn Flaggable]) -> FlagResult<bool> {
        self.check(actors).await
    }

    async fn check(&self, actors: &[&dyn Flaggable]) -> FlagResult<bool> {
        let values = self.load_values().await?;
        let result = open_for(&self.name, &values, actors);

        let mut event = OperationEvent::new(self.name.clone(), Operation::Enabled, json!(result));
        if !actors.is_empty() {
            let ids = actors
                .iter()
                .map(|actor| actor.flag_id().into_owned())
                .collect();
            event = event.with_actors(ids);
        }
        self.instrumenter.instrument(event);

        Ok(result)
    }

    // ------------------------------------------------------------------
    // Boolean gate
    // ------------------------------------------------------------------

    /// Turn the feature fully on.
    pub async fn enable(&self) -> FlagResult<bool> {
        self.write_enable(GateName::Boolean, WireValue::Bool(true), json!(true))
            .await
    }

    /// Turn the feature fully off, resetting every gate.
    pub async fn disable(&self) -> FlagResult<bool> {
        let result = self.adapter.clear(&self.name).await?;
        debug!(target: "switchgear", "disabled feature {}", self.name);
        self.instrumenter.instrument(
            OperationEvent::new(self.name.clone(), Operation::Disable, json!(result))
                .with_gate(GateName::Boolean)
                .with_thing(json!(false)),
        );
        Ok(result)
    }

    // ------------------------------------------------------------------
    // Actor gate
    // ------------------------------------------------------------------

    /// Enable the feature for one actor.
    pub async fn enable_actor(&self, actor: &dyn Flaggable) -> FlagResult<bool> {
        let id = actor.flag_id().into_owned();
        self.write_enable(GateName::Actor, WireValue::Member(id.clone()), json!(id))
            .await
    }

    /// Disable the feature for one actor. Disabling an actor that was
    /// never enabled succeeds without effect.
    pub async fn disable_actor(&self, actor: &dyn Flaggable) -> FlagResult<bool> {
        let id = actor.flag_id().into_owned();
        self.write_disable(GateName::Actor, WireValue::Member(id.clone()), json!(id))
            .await
    }

    // ------------------------------------------------------------------
    // Group gate
    // ------------------------------------------------------------------

    /// Enable the feature for a registered group.
    ///
    /// Refuses names with no registered predicate; stale persisted
    /// names are tolerated at evaluation time but new ones are not
    /// accepted here.
    pub async fn enable_group(&self, name: &str) -> FlagResult<bool> {
        self.require_group(name)?;
        self.write_enable(
            GateName::Group,
            WireValue::Member(name.to_string()),
            json!(name),
        )
        .await
    }

    /// Disable the feature for a registered group.
    pub async fn disable_group(&self, name: &str) -> FlagResult<bool> {
        self.require_group(name)?;
        self.write_disable(
            GateName::Group,
            WireValue::Member(name.to_string()),
            json!(name),
        )
        .await
    }

    fn require_group(&self, name: &str) -> FlagResult<()> {
        if registry::registered(name) {
            Ok(())
        } else {
            Err(FlagError::UnknownGroup(name.to_string()))
        }
    }

    // ------------------------------------------------------------------
    // Percentage gates
    // ------------------------------------------------------------------

    /// Roll the feature out to a deterministic percentage of actors.
    pub async fn enable_percentage_of_actors(&self, percentage: u8) -> FlagResult<bool> {
        let percentage = PercentageOfActors::new(percentage)?;
        self.write_enable(
            GateName::PercentageOfActors,
            WireValue::Integer(percentage.value()),
            json!(percentage.value()),
        )
        .await
    }

    /// Reset the actor percentage to 0.
    pub async fn disable_percentage_of_actors(&self) -> FlagResult<bool> {
        self.write_disable(GateName::PercentageOfActors, WireValue::Integer(0), json!(0))
            .await
    }

    /// Enable the feature for a percentage of checks, drawn fresh each
    /// time.
    pub async fn enable_percentage_of_time(&self, percentage: u8) -> FlagResult<bool> {
        let percentage = PercentageOfTime::new(percentage)?;
        self.write_enable(
            GateName::PercentageOfTime,
            WireValue::Integer(percentage.value()),
            json!(percentage.value()),
        )
        .await
    }

    /// Reset the time percentage to 0.
    pub async fn disable_percentage_of_time(&self) -> FlagResult<bool> {
        self.write_disable(GateName::PercentageOfTime, WireValue::Integer(0), json!(0))
            .await
    }

    // ------------------------------------------------------------------
    // Expression gate
    // ------------------------------------------------------------------

    /// Store an expression rule, replacing any current one.
    pub async fn enable_expression(&self, expression: Expression) -> FlagResult<bool> {
        let wire = expression.to_value();
        self.write_enable(
            GateName::Expression,
            WireValue::Expression(wire.clone()),
            wire,
        )
        .await
    }

    /// Clear the stored expression rule.
    pub async fn disable_expression(&self) -> FlagResult<bool> {
        self.write_disable(
            GateName::Expression,
            WireValue::Expression(Value::Null),
            Value::Null,
        )
        .await
    }

    /// Add a rule without narrowing the enabled set.
    ///
    /// Appends to a stored `Any`, wraps any other stored rule into
    /// `Any(current, e)`, or stores `e` when nothing is present.
    pub async fn add_expression(&self, expression: Expression) -> FlagResult<bool> {
        let next = match self.load_values().await?.expression {
            None => expression,
            Some(Expression::Any(mut children)) => {
                children.push(expression);
                Expression::Any(children)
            }
            Some(current) => Expression::any([current, expression]),
        };
        self.enable_expression(next).await
    }

    /// Remove one rule.
    ///
    /// Removes the first deeply-equal argument from a stored `Any`,
    /// replaces an exactly-equal single rule with the empty `Any()`
    /// (which always evaluates false), wraps any other stored rule into
    /// `Any(current)`, and does nothing when no rule is stored.
    pub async fn remove_expression(&self, expression: Expression) -> FlagResult<bool> {
        let next = match self.load_values().await?.expression {
            None => return Ok(false),
            Some(Expression::Any(mut children)) => {
                if let Some(position) = children.iter().position(|child| *child == expression) {
                    children.remove(position);
                }
                Expression::Any(children)
            }
            Some(current) if current == expression => Expression::any([]),
            Some(current) => Expression::any([current]),
        };
        self.enable_expression(next).await
    }

    // ------------------------------------------------------------------
    // Generic routing
    // ------------------------------------------------------------------

    /// Enable by runtime target kind: booleans route to the boolean
    /// gate (false meaning a full disable), actor and group references,
    /// percentages and expressions to their own gates.
    pub async fn enable_target(&self, target: Target) -> FlagResult<bool> {
        match target {
            Target::Boolean(Boolean(true)) => self.enable().await,
            Target::Boolean(Boolean(false)) => self.disable().await,
            Target::Actor(actor) => {
                let id = actor.id().to_string();
                self.write_enable(GateName::Actor, WireValue::Member(id.clone()), json!(id))
                    .await
            }
            Target::Group(group) => self.enable_group(group.name()).await,
            Target::PercentageOfActors(percentage) => {
                self.enable_percentage_of_actors(percentage.value()).await
            }
            Target::PercentageOfTime(percentage) => {
                self.enable_percentage_of_time(percentage.value()).await
            }
            Target::Expression(expression) => self.enable_expression(expression).await,
        }
    }

    /// Disable by runtime target kind.
    pub async fn disable_target(&self, target: Target) -> FlagResult<bool> {
        match target {
            Target::Boolean(_) => self.disable().await,
            Target::Actor(actor) => {
                let id = actor.id().to_string();
                self.write_disable(GateName::Actor, WireValue::Member(id.clone()), json!(id))
                    .await
            }
            Target::Group(group) => self.disable_group(group.name()).await,
            Target::PercentageOfActors(_) => self.disable_percentage_of_actors().await,
            Target::PercentageOfTime(_) => self.disable_percentage_of_time().await,
            Target::Expression(_) => self.disable_expression().await,
        }
    }

    /// The gate a mutation target routes to.
    pub fn gate_for(target: &Target) -> &'static dyn Gate {
        let name = match target {
            Target::Boolean(_) => GateName::Boolean,
            Target::Actor(_) => GateName::Actor,
            Target::Group(_) => GateName::Group,
            Target::PercentageOfActors(_) => GateName::PercentageOfActors,
            Target::PercentageOfTime(_) => GateName::PercentageOfTime,
            Target::Expression(_) => GateName::Expression,
        };
        gate::gate(name)
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// The merged typed view of the feature's stored state.
    pub async fn gate_values(&self) -> FlagResult<GateValues> {
        self.load_values().await
    }

    /// Classify the stored state.
    pub async fn state(&self) -> FlagResult<FeatureState> {
        let values = self.load_values().await?;
        let state = classify(&values);
        self.instrumenter.instrument(OperationEvent::new(
            self.name.clone(),
            Operation::State,
            json!(state.as_str()),
        ));
        Ok(state)
    }

    /// Whether the feature is fully on.
    pub async fn is_on(&self) -> FlagResult<bool> {
        Ok(self.state().await? == FeatureState::On)
    }

    /// Whether the feature is fully off.
    pub async fn is_off(&self) -> FlagResult<bool> {
        Ok(self.state().await? == FeatureState::Off)
    }

    /// Whether the feature is partially configured.
    pub async fn is_conditional(&self) -> FlagResult<bool> {
        Ok(self.state().await? == FeatureState::Conditional)
    }

    /// Gates whose stored value differs from the default.
    pub async fn enabled_gates(&self) -> FlagResult<Vec<&'static dyn Gate>> {
        let values = self.load_values().await?;
        Ok(gate::gates()
            .iter()
            .copied()
            .filter(|gate| gate.is_set(&values))
            .collect())
    }

    /// Gates still at their default.
    pub async fn disabled_gates(&self) -> FlagResult<Vec<&'static dyn Gate>> {
        let values = self.load_values().await?;
        Ok(gate::gates()
            .iter()
            .copied()
            .filter(|gate| !gate.is_set(&values))
            .collect())
    }

    /// Names of the gates whose stored value differs from the default.
    pub async fn enabled_gate_names(&self) -> FlagResult<Vec<GateName>> {
        Ok(self
            .enabled_gates()
            .await?
            .into_iter()
            .map(|gate| gate.name())
            .collect())
    }

    /// Names of the gates still at their default.
    pub async fn disabled_gate_names(&self) -> FlagResult<Vec<GateName>> {
        Ok(self
            .disabled_gates()
            .await?
            .into_iter()
            .map(|gate| gate.name())
            .collect())
    }

    // ------------------------------------------------------------------
    // Directory
    // ------------------------------------------------------------------

    /// Register the feature in the adapter's directory.
    pub async fn add(&self) -> FlagResult<bool> {
        let result = self.adapter.add(&self.name).await?;
        self.instrumenter.instrument(OperationEvent::new(
            self.name.clone(),
            Operation::Add,
            json!(result),
        ));
        Ok(result)
    }

    /// Unregister the feature and wipe its stored state.
    pub async fn remove(&self) -> FlagResult<bool> {
        let result = self.adapter.remove(&self.name).await?;
        self.instrumenter.instrument(OperationEvent::new(
            self.name.clone(),
            Operation::Remove,
            json!(result),
        ));
        Ok(result)
    }

    /// Reset every gate to its default, keeping directory membership.
    pub async fn clear(&self) -> FlagResult<bool> {
        let result = self.adapter.clear(&self.name).await?;
        self.instrumenter.instrument(OperationEvent::new(
            self.name.clone(),
            Operation::Clear,
            json!(result),
        ));
        Ok(result)
    }

    /// Whether the feature is in the adapter's directory.
    pub async fn exists(&self) -> FlagResult<bool> {
        let result = self.adapter.features().await?.contains(&self.name);
        self.instrumenter.instrument(OperationEvent::new(
            self.name.clone(),
            Operation::Exists,
            json!(result),
        ));
        Ok(result)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn load_values(&self) -> FlagResult<GateValues> {
        let raw = self.adapter.get(&self.name).await?;
        Ok(GateValues::from(raw))
    }

    async fn write_enable(
        &self,
        gate: GateName,
        value: WireValue,
        thing: Value,
    ) -> FlagResult<bool> {
        let result = self.adapter.enable(&self.name, gate, &value).await?;
        debug!(target: "switchgear", "enabled {} gate for feature {}", gate, self.name);
        self.instrumenter.instrument(
            OperationEvent::new(self.name.clone(), Operation::Enable, json!(result))
                .with_gate(gate)
                .with_thing(thing),
        );
        Ok(result)
    }

    async fn write_disable(
        &self,
        gate: GateName,
        value: WireValue,
        thing: Value,
    ) -> FlagResult<bool> {
        let result = self.adapter.disable(&self.name, gate, &value).await?;
        debug!(target: "switchgear", "disabled {} gate for feature {}", gate, self.name);
        self.instrumenter.instrument(
            OperationEvent::new(self.name.clone(), Operation::Disable, json!(result))
                .with_gate(gate)
                .with_thing(thing),
        );
        Ok(result)
    }
}

impl std::fmt::Debug for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Feature").field("name", &self.name).finish()
    }
}

/// The fixed-order short-circuit walk. Unset gates are skipped; the
/// first open gate decides. With several actors, a gate is open when it
/// opens for any of them.
fn open_for(feature_name: &str, values: &GateValues, actors: &[&dyn Flaggable]) -> bool {
    for gate in gate::gates() {
        if !gate.is_set(values) {
            continue;
        }
        if actors.is_empty() {
            let ctx = EvalContext {
                feature_name,
                values,
                actor: None,
            };
            if gate.is_open(&ctx) {
                return true;
            }
        } else {
            for actor in actors {
                let ctx = EvalContext {
                    feature_name,
                    values,
                    actor: Some(*actor),
                };
                if gate.is_open(&ctx) {
                    return true;
                }
            }
        }
    }
    false
}

fn classify(values: &GateValues) -> FeatureState {
    if values.boolean == Some(true) || values.percentage_of_time == 100 {
        FeatureState::On
    } else if values.is_default() {
        FeatureState::Off
    } else {
        FeatureState::Conditional
    }
}
