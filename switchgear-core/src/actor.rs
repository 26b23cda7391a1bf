//! Actors: the identity seam for per-subject rollouts.

use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashMap;

/// Property map harvested from an actor for expression rules.
pub type Properties = HashMap<String, Value>;

/// Anything carrying a stable string identifier can be flagged.
///
/// Implement this for your user, organization or device types. The id
/// must be stable across processes and restarts; percentage rollouts
/// hash it together with the feature name.
///
/// # Examples
///
/// ```
/// use switchgear_core::actor::Flaggable;
/// use std::borrow::Cow;
///
/// struct User {
///     id: u64,
/// }
///
/// impl Flaggable for User {
///     fn flag_id(&self) -> Cow<'_, str> {
///         Cow::Owned(format!("User;{}", self.id))
///     }
/// }
/// ```
pub trait Flaggable: Send + Sync {
    /// Stable identifier, unique within the application.
    fn flag_id(&self) -> Cow<'_, str>;

    /// Properties consulted by expression rules. Empty by default.
    fn properties(&self) -> Properties {
        Properties::new()
    }
}

/// Plain actor value: an id plus optional properties.
///
/// Useful when the caller has only an identifier, or in tests.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Actor {
    id: String,
    properties: Properties,
}

impl Actor {
    /// Create an actor from its identifier.
    ///
    /// # Panics
    ///
    /// Panics if `id` is empty; an empty id cannot participate in
    /// per-actor rollouts.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        assert!(!id.is_empty(), "actor id must not be empty");
        Self {
            id,
            properties: Properties::new(),
        }
    }

    /// Attach a property consulted by expression rules.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// The actor's identifier.
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Flaggable for Actor {
    fn flag_id(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.id)
    }

    fn properties(&self) -> Properties {
        self.properties.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_id() {
        let actor = Actor::new("User;1");
        assert_eq!(actor.id(), "User;1");
        assert_eq!(actor.flag_id(), "User;1");
    }

    #[test]
    #[should_panic(expected = "actor id must not be empty")]
    fn test_empty_id_rejected() {
        let _ = Actor::new("");
    }

    #[test]
    fn test_properties_default_empty() {
        let actor = Actor::new("5");
        assert!(actor.properties().is_empty());
    }

    #[test]
    fn test_with_property() {
        let actor = Actor::new("5")
            .with_property("plan", "basic")
            .with_property("age", 21);

        let props = actor.properties();
        assert_eq!(props.get("plan"), Some(&serde_json::json!("basic")));
        assert_eq!(props.get("age"), Some(&serde_json::json!(21)));
    }

    #[test]
    fn test_custom_flaggable() {
        struct Device {
            serial: String,
        }

        impl Flaggable for Device {
            fn flag_id(&self) -> Cow<'_, str> {
                Cow::Borrowed(&self.serial)
            }
        }

        let device = Device {
            serial: "abc-123".to_string(),
        };
        assert_eq!(device.flag_id(), "abc-123");
    }
}
