//! Stored gate state: the wire-shaped record and the parsed view.

use crate::expression::Expression;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

/// Per-feature record in exactly the shape adapters persist it.
///
/// Booleans and percentages travel as strings, sets as string sets and
/// the expression as its nested JSON mapping. `get` returns this record
/// default-shaped for unknown features, every gate at its default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawGateValues {
    /// `"true"` when the boolean gate is on, otherwise absent.
    pub boolean: Option<String>,
    /// Enabled actor ids.
    pub actors: HashSet<String>,
    /// Enabled group names.
    pub groups: HashSet<String>,
    /// Decimal integer string, absent meaning 0.
    pub percentage_of_time: Option<String>,
    /// Decimal integer string, absent meaning 0.
    pub percentage_of_actors: Option<String>,
    /// Expression wire mapping, absent when no rule is stored.
    pub expression: Option<Value>,
}

impl RawGateValues {
    /// The record for a feature nothing has ever written.
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Whether every gate sits at its default.
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Parsed, clamped view of one feature's stored state.
///
/// Percentages are clamped into 0..=100, sets carry no empty strings
/// and the expression is either a well-formed tree or absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GateValues {
    pub boolean: Option<bool>,
    pub actors: HashSet<String>,
    pub groups: HashSet<String>,
    pub percentage_of_time: u8,
    pub percentage_of_actors: u8,
    pub expression: Option<Expression>,
}

impl GateValues {
    /// Whether every gate sits at its default.
    pub fn is_default(&self) -> bool {
        self.boolean.is_none()
            && self.actors.is_empty()
            && self.groups.is_empty()
            && self.percentage_of_time == 0
            && self.percentage_of_actors == 0
            && self.expression.is_none()
    }
}

impl From<RawGateValues> for GateValues {
    fn from(raw: RawGateValues) -> Self {
        let expression = raw.expression.and_then(|wire| {
            Expression::from_value(&wire)
                .map_err(|err| debug!(target: "switchgear", "dropping stored expression: {err}"))
                .ok()
        });

        Self {
            boolean: raw.boolean.map(|v| v == "true"),
            actors: drop_empty(raw.actors),
            groups: drop_empty(raw.groups),
            percentage_of_time: parse_percentage(raw.percentage_of_time.as_deref()),
            percentage_of_actors: parse_percentage(raw.percentage_of_actors.as_deref()),
            expression,
        }
    }
}

fn drop_empty(set: HashSet<String>) -> HashSet<String> {
    set.into_iter().filter(|member| !member.is_empty()).collect()
}

fn parse_percentage(raw: Option<&str>) -> u8 {
    raw.and_then(|v| v.parse::<i64>().ok())
        .map(|v| v.clamp(0, 100) as u8)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_record_is_default() {
        assert!(RawGateValues::default_config().is_default());
        assert!(GateValues::from(RawGateValues::default_config()).is_default());
    }

    #[test]
    fn test_boolean_parsing() {
        let raw = RawGateValues {
            boolean: Some("true".to_string()),
            ..Default::default()
        };
        assert_eq!(GateValues::from(raw).boolean, Some(true));

        let raw = RawGateValues {
            boolean: Some("false".to_string()),
            ..Default::default()
        };
        assert_eq!(GateValues::from(raw).boolean, Some(false));

        assert_eq!(GateValues::from(RawGateValues::default()).boolean, None);
    }

    #[test]
    fn test_percentages_clamped() {
        let raw = RawGateValues {
            percentage_of_actors: Some("250".to_string()),
            percentage_of_time: Some("-5".to_string()),
            ..Default::default()
        };
        let values = GateValues::from(raw);
        assert_eq!(values.percentage_of_actors, 100);
        assert_eq!(values.percentage_of_time, 0);
    }

    #[test]
    fn test_unparseable_percentage_defaults_to_zero() {
        let raw = RawGateValues {
            percentage_of_actors: Some("lots".to_string()),
            ..Default::default()
        };
        assert_eq!(GateValues::from(raw).percentage_of_actors, 0);
    }

    #[test]
    fn test_empty_members_dropped() {
        let raw = RawGateValues {
            actors: ["5".to_string(), String::new()].into_iter().collect(),
            ..Default::default()
        };
        let values = GateValues::from(raw);
        assert_eq!(values.actors.len(), 1);
        assert!(values.actors.contains("5"));
    }

    #[test]
    fn test_malformed_expression_dropped() {
        let raw = RawGateValues {
            expression: Some(json!({ "Frobnicate": [] })),
            ..Default::default()
        };
        let values = GateValues::from(raw);
        assert!(values.expression.is_none());
        // A dropped rule alone leaves the parsed view at defaults.
        assert!(values.is_default());
    }

    #[test]
    fn test_well_formed_expression_kept() {
        let rule = crate::expression::Expression::property("plan").eq("basic");
        let raw = RawGateValues {
            expression: Some(rule.to_value()),
            ..Default::default()
        };
        assert_eq!(GateValues::from(raw).expression, Some(rule));
    }
}
