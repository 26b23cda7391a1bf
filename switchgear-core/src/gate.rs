//! The six gates and their shared contract.
//!
//! A gate is one independent dimension of enablement. Each knows how to
//! read its slice of a feature's stored state and decide for one check.
//! Evaluation walks the gates in a fixed order and short-circuits on
//! the first open gate, so a boolean kill-switch always wins and every
//! other gate is purely additive.

use crate::actor::Flaggable;
use crate::gate_values::GateValues;
use crate::registry::{self, GroupContext};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one gate kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateName {
    Boolean,
    Group,
    Actor,
    PercentageOfActors,
    PercentageOfTime,
    Expression,
}

impl GateName {
    /// Snake-case name used in storage and instrumentation payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            GateName::Boolean => "boolean",
            GateName::Group => "group",
            GateName::Actor => "actor",
            GateName::PercentageOfActors => "percentage_of_actors",
            GateName::PercentageOfTime => "percentage_of_time",
            GateName::Expression => "expression",
        }
    }
}

impl fmt::Display for GateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage shape of a gate's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    /// `"true"` or absent
    Boolean,
    /// Set of strings
    Set,
    /// Decimal integer
    Integer,
    /// Nested JSON mapping
    Json,
}

/// Per-check context handed to each gate.
pub struct EvalContext<'a> {
    /// Name of the feature being checked.
    pub feature_name: &'a str,
    /// Snapshot of the feature's stored state.
    pub values: &'a GateValues,
    /// The actor under check, if any.
    pub actor: Option<&'a dyn Flaggable>,
}

/// One dimension of enablement.
pub trait Gate: Send + Sync {
    /// The gate's identity.
    fn name(&self) -> GateName;

    /// How the gate's value is shaped in storage.
    fn data_type(&self) -> DataType;

    /// Whether the stored value differs from the gate's default.
    /// Unset gates are skipped during evaluation.
    fn is_set(&self, values: &GateValues) -> bool;

    /// Whether this gate enables the check.
    fn is_open(&self, ctx: &EvalContext<'_>) -> bool;
}

/// Gates in their fixed evaluation order.
pub fn gates() -> &'static [&'static dyn Gate] {
    static GATES: [&dyn Gate; 6] = [
        &BooleanGate,
        &GroupGate,
        &ActorGate,
        &PercentageOfActorsGate,
        &PercentageOfTimeGate,
        &ExpressionGate,
    ];
    &GATES
}

/// Look up a gate by name.
pub fn gate(name: GateName) -> &'static dyn Gate {
    match name {
        GateName::Boolean => &BooleanGate,
        GateName::Group => &GroupGate,
        GateName::Actor => &ActorGate,
        GateName::PercentageOfActors => &PercentageOfActorsGate,
        GateName::PercentageOfTime => &PercentageOfTimeGate,
        GateName::Expression => &ExpressionGate,
    }
}

/// Kill-switch gate: open iff the stored value is `"true"`.
pub struct BooleanGate;

impl Gate for BooleanGate {
    fn name(&self) -> GateName {
        GateName::Boolean
    }

    fn data_type(&self) -> DataType {
        DataType::Boolean
    }

    fn is_set(&self, values: &GateValues) -> bool {
        values.boolean.is_some()
    }

    fn is_open(&self, ctx: &EvalContext<'_>) -> bool {
        ctx.values.boolean == Some(true)
    }
}

/// Open iff some stored group name resolves in the registry and its
/// predicate accepts the actor. Unregistered names are skipped but stay
/// persisted; the operator may register them later.
pub struct GroupGate;

impl Gate for GroupGate {
    fn name(&self) -> GateName {
        GateName::Group
    }

    fn data_type(&self) -> DataType {
        DataType::Set
    }

    fn is_set(&self, values: &GateValues) -> bool {
        !values.groups.is_empty()
    }

    fn is_open(&self, ctx: &EvalContext<'_>) -> bool {
        let Some(actor) = ctx.actor else {
            return false;
        };
        let group_ctx = GroupContext {
            feature_name: ctx.feature_name,
            values: ctx.values,
        };
        ctx.values.groups.iter().any(|name| {
            registry::group(name)
                .map(|group| group.matches(actor, &group_ctx))
                .unwrap_or(false)
        })
    }
}

/// Open iff the actor's id is in the stored set.
pub struct ActorGate;

impl Gate for ActorGate {
    fn name(&self) -> GateName {
        GateName::Actor
    }

    fn data_type(&self) -> DataType {
        DataType::Set
    }

    fn is_set(&self, values: &GateValues) -> bool {
        !values.actors.is_empty()
    }

    fn is_open(&self, ctx: &EvalContext<'_>) -> bool {
        ctx.actor
            .map(|actor| ctx.values.actors.contains(actor.flag_id().as_ref()))
            .unwrap_or(false)
    }
}

/// Deterministic per-actor rollout.
///
/// The score is CRC-32 (IEEE) over the feature name concatenated with
/// the actor id, no delimiter, scaled into 0..100. The same feature,
/// actor and percentage decide identically in every process and behind
/// every adapter, and raising the percentage never turns an enabled
/// actor off.
pub struct PercentageOfActorsGate;

impl PercentageOfActorsGate {
    /// Rollout score in `[0, 100)` for one feature/actor pair.
    pub fn score(feature_name: &str, actor_id: &str) -> f64 {
        let hash = crc32fast::hash(format!("{feature_name}{actor_id}").as_bytes());
        f64::from(hash) / f64::from(u32::MAX) * 100.0
    }
}

impl Gate for PercentageOfActorsGate {
    fn name(&self) -> GateName {
        GateName::PercentageOfActors
    }

    fn data_type(&self) -> DataType {
        DataType::Integer
    }

    fn is_set(&self, values: &GateValues) -> bool {
        values.percentage_of_actors > 0
    }

    fn is_open(&self, ctx: &EvalContext<'_>) -> bool {
        let Some(actor) = ctx.actor else {
            return false;
        };
        let score = Self::score(ctx.feature_name, actor.flag_id().as_ref());
        score < f64::from(ctx.values.percentage_of_actors)
    }
}

/// Probabilistic gate: a fresh uniform draw per check, independent of
/// the actor.
pub struct PercentageOfTimeGate;

impl Gate for PercentageOfTimeGate {
    fn name(&self) -> GateName {
        GateName::PercentageOfTime
    }

    fn data_type(&self) -> DataType {
        DataType::Integer
    }

    fn is_set(&self, values: &GateValues) -> bool {
        values.percentage_of_time > 0
    }

    fn is_open(&self, ctx: &EvalContext<'_>) -> bool {
        let drawn = rand::thread_rng().gen_range(0.0..100.0);
        drawn < f64::from(ctx.values.percentage_of_time)
    }
}

/// Open iff the stored expression evaluates true over the actor's
/// properties. Rule failures never abort the check.
pub struct ExpressionGate;

impl Gate for ExpressionGate {
    fn name(&self) -> GateName {
        GateName::Expression
    }

    fn data_type(&self) -> DataType {
        DataType::Json
    }

    fn is_set(&self, values: &GateValues) -> bool {
        values.expression.is_some()
    }

    fn is_open(&self, ctx: &EvalContext<'_>) -> bool {
        let (Some(actor), Some(expression)) = (ctx.actor, ctx.values.expression.as_ref()) else {
            return false;
        };
        expression.evaluate(&actor.properties())
    }
}
