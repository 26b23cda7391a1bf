//! Canonical wrappers for mutation inputs and instrumentation payloads.
//!
//! Every mutation ultimately operates on one of these closed value
//! kinds; the [`Target`] enum is the routing input for the generic
//! enable/disable verbs.

use crate::actor::Flaggable;
use crate::error::{FlagError, FlagResult};
use crate::expression::Expression;
use serde::{Deserialize, Serialize};

/// Boolean gate input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Boolean(pub bool);

/// Reference to an actor by its stable id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorRef(String);

impl ActorRef {
    /// Wrap an actor id.
    ///
    /// # Panics
    ///
    /// Panics if `id` is empty.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        assert!(!id.is_empty(), "actor id must not be empty");
        Self(id)
    }

    /// Capture the id of any flaggable value.
    pub fn from_flaggable(actor: &dyn Flaggable) -> Self {
        Self::new(actor.flag_id().into_owned())
    }

    /// The wrapped id.
    pub fn id(&self) -> &str {
        &self.0
    }
}

/// Reference to a group by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupRef(String);

impl GroupRef {
    /// Wrap a group name.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        assert!(!name.is_empty(), "group name must not be empty");
        Self(name)
    }

    /// The wrapped name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Percentage of actors, validated into 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PercentageOfActors(u8);

impl PercentageOfActors {
    /// Validate a percentage.
    pub fn new(value: u8) -> FlagResult<Self> {
        if value > 100 {
            return Err(FlagError::InvalidPercentage(i64::from(value)));
        }
        Ok(Self(value))
    }

    /// The validated value.
    pub fn value(&self) -> u8 {
        self.0
    }
}

/// Percentage of time, validated into 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PercentageOfTime(u8);

impl PercentageOfTime {
    /// Validate a percentage.
    pub fn new(value: u8) -> FlagResult<Self> {
        if value > 100 {
            return Err(FlagError::InvalidPercentage(i64::from(value)));
        }
        Ok(Self(value))
    }

    /// The validated value.
    pub fn value(&self) -> u8 {
        self.0
    }
}

/// Closed routing input for the generic enable/disable verbs.
///
/// `true` routes to the boolean gate, `false` to a full disable; actor
/// and group references, percentages and expressions each route to
/// their own gate.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Boolean(Boolean),
    Actor(ActorRef),
    Group(GroupRef),
    PercentageOfActors(PercentageOfActors),
    PercentageOfTime(PercentageOfTime),
    Expression(Expression),
}

impl Target {
    /// Route by the id of any flaggable value.
    pub fn actor(actor: &dyn Flaggable) -> Self {
        Target::Actor(ActorRef::from_flaggable(actor))
    }
}

impl From<bool> for Target {
    fn from(value: bool) -> Self {
        Target::Boolean(Boolean(value))
    }
}

impl From<Boolean> for Target {
    fn from(value: Boolean) -> Self {
        Target::Boolean(value)
    }
}

impl From<ActorRef> for Target {
    fn from(value: ActorRef) -> Self {
        Target::Actor(value)
    }
}

impl From<GroupRef> for Target {
    fn from(value: GroupRef) -> Self {
        Target::Group(value)
    }
}

/// Bare strings route to the group gate.
impl From<&str> for Target {
    fn from(name: &str) -> Self {
        Target::Group(GroupRef::new(name))
    }
}

impl From<String> for Target {
    fn from(name: String) -> Self {
        Target::Group(GroupRef::new(name))
    }
}

impl From<PercentageOfActors> for Target {
    fn from(value: PercentageOfActors) -> Self {
        Target::PercentageOfActors(value)
    }
}

impl From<PercentageOfTime> for Target {
    fn from(value: PercentageOfTime) -> Self {
        Target::PercentageOfTime(value)
    }
}

impl From<Expression> for Target {
    fn from(value: Expression) -> Self {
        Target::Expression(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Actor;

    #[test]
    fn test_percentage_bounds() {
        assert!(PercentageOfActors::new(0).is_ok());
        assert!(PercentageOfActors::new(100).is_ok());
        assert!(matches!(
            PercentageOfActors::new(101),
            Err(FlagError::InvalidPercentage(101))
        ));
        assert!(matches!(
            PercentageOfTime::new(255),
            Err(FlagError::InvalidPercentage(255))
        ));
    }

    #[test]
    fn test_actor_ref_from_flaggable() {
        let actor = Actor::new("User;1");
        let actor_ref = ActorRef::from_flaggable(&actor);
        assert_eq!(actor_ref.id(), "User;1");
    }

    #[test]
    fn test_target_routing_conversions() {
        assert!(matches!(Target::from(true), Target::Boolean(Boolean(true))));
        assert!(matches!(
            Target::from(false),
            Target::Boolean(Boolean(false))
        ));
        assert!(matches!(Target::from("admins"), Target::Group(_)));
        assert!(matches!(
            Target::actor(&Actor::new("5")),
            Target::Actor(_)
        ));
        assert!(matches!(
            Target::from(Expression::property("plan").eq("basic")),
            Target::Expression(_)
        ));
    }

    #[test]
    #[should_panic(expected = "group name must not be empty")]
    fn test_empty_group_name_rejected() {
        let _ = GroupRef::new("");
    }
}
