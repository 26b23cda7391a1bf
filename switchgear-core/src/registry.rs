//! Process-global group registry.
//!
//! Groups are named predicates over actors, registered once at process
//! start and consulted by the group gate during evaluation. The
//! registry is safe for concurrent reads and for registration while
//! checks are in flight; an unknown name at evaluation time simply
//! never matches.

use crate::actor::Flaggable;
use crate::gate_values::GateValues;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::Arc;

/// Context handed to group predicates alongside the actor.
pub struct GroupContext<'a> {
    /// Name of the feature being checked.
    pub feature_name: &'a str,
    /// Snapshot of the feature's stored state for this check.
    pub values: &'a GateValues,
}

type Predicate = Arc<dyn Fn(&dyn Flaggable, &GroupContext<'_>) -> bool + Send + Sync>;

/// Named predicate over actors. Identity is the name.
#[derive(Clone)]
pub struct Group {
    name: String,
    predicate: Predicate,
}

impl Group {
    /// Build a group from a name and predicate.
    pub fn new<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&dyn Flaggable, &GroupContext<'_>) -> bool + Send + Sync + 'static,
    {
        let name = name.into();
        assert!(!name.is_empty(), "group name must not be empty");
        Self {
            name,
            predicate: Arc::new(predicate),
        }
    }

    /// The group's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the predicate for one actor.
    pub fn matches(&self, actor: &dyn Flaggable, ctx: &GroupContext<'_>) -> bool {
        (self.predicate)(actor, ctx)
    }
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group").field("name", &self.name).finish()
    }
}

impl PartialEq for Group {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Group {}

/// Registry of groups keyed by name.
#[derive(Debug, Default)]
pub struct GroupRegistry {
    groups: DashMap<String, Group>,
}

impl GroupRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a group, replacing any previous one with the same name.
    pub fn register<F>(&self, name: impl Into<String>, predicate: F) -> Group
    where
        F: Fn(&dyn Flaggable, &GroupContext<'_>) -> bool + Send + Sync + 'static,
    {
        let group = Group::new(name, predicate);
        self.groups.insert(group.name().to_string(), group.clone());
        group
    }

    /// Look up a group by name.
    pub fn get(&self, name: &str) -> Option<Group> {
        self.groups.get(name).map(|entry| entry.value().clone())
    }

    /// Whether a name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    /// Every registered group.
    pub fn all(&self) -> Vec<Group> {
        self.groups.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Drop every registration.
    pub fn clear(&self) {
        self.groups.clear();
    }
}

static REGISTRY: Lazy<GroupRegistry> = Lazy::new(GroupRegistry::new);

/// Register a group process-wide. Appends or replaces by name.
///
/// # Examples
///
/// ```
/// use switchgear_core::registry;
///
/// registry::register("admins", |actor, _ctx| actor.flag_id() == "42");
/// assert!(registry::registered("admins"));
/// ```
pub fn register<F>(name: impl Into<String>, predicate: F) -> Group
where
    F: Fn(&dyn Flaggable, &GroupContext<'_>) -> bool + Send + Sync + 'static,
{
    REGISTRY.register(name, predicate)
}

/// Look up a registered group.
pub fn group(name: &str) -> Option<Group> {
    REGISTRY.get(name)
}

/// Whether a group name is registered.
pub fn registered(name: &str) -> bool {
    REGISTRY.contains(name)
}

/// Every registered group.
pub fn groups() -> Vec<Group> {
    REGISTRY.all()
}

/// Drop every registration. Intended for test isolation.
pub fn unregister_all() {
    REGISTRY.clear();
}
