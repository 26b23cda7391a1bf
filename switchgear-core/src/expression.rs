//! Boolean expression trees for rule-based gating.
//!
//! An expression is an immutable tree of operators evaluated against an
//! actor's property map. Evaluation is pure: no I/O, no storage access,
//! and a malformed or mismatched subtree produces nothing rather than
//! failing the surrounding feature check.
//!
//! # Wire format
//!
//! Operator nodes serialize as a single-key JSON mapping with the
//! operator name and an argument list; scalar leaves serialize as
//! themselves:
//!
//! ```json
//! {"Equal": [{"Property": ["plan"]}, "basic"]}
//! ```
//!
//! # Examples
//!
//! ```
//! use switchgear_core::expression::Expression;
//!
//! let rule = Expression::any([
//!     Expression::property("plan").eq("basic"),
//!     Expression::property("age").gte(21),
//! ]);
//!
//! let mut props = std::collections::HashMap::new();
//! props.insert("plan".to_string(), serde_json::json!("basic"));
//! props.insert("age".to_string(), serde_json::json!(17));
//! assert!(rule.evaluate(&props));
//! ```

use crate::actor::Properties;
use crate::error::{FlagError, FlagResult};
use rand::Rng;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};
use std::cmp::Ordering;

/// Immutable decision tree over actor properties.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Scalar leaf: string, number or bool.
    Value(Value),
    /// Reads a named property at evaluation time.
    Property(String),
    /// Loose equality; numbers compare numerically.
    Equal(Box<Expression>, Box<Expression>),
    NotEqual(Box<Expression>, Box<Expression>),
    GreaterThan(Box<Expression>, Box<Expression>),
    GreaterThanOrEqualTo(Box<Expression>, Box<Expression>),
    LessThan(Box<Expression>, Box<Expression>),
    LessThanOrEqualTo(Box<Expression>, Box<Expression>),
    /// True iff any child is true. Empty is false.
    Any(Vec<Expression>),
    /// True iff all children are true. Empty is true.
    All(Vec<Expression>),
    /// Coerce the argument to a number.
    Number(Box<Expression>),
    /// Coerce the argument to a string.
    String(Box<Expression>),
    /// Coerce the argument to its truthiness.
    Boolean(Box<Expression>),
    /// Uniform random integer below the argument.
    Random(Box<Expression>),
    /// Current Unix timestamp in seconds.
    Now,
    /// Parse an RFC 3339 string into a Unix timestamp.
    Time(Box<Expression>),
}

impl Expression {
    /// Scalar leaf.
    pub fn value(value: impl Into<Value>) -> Self {
        Expression::Value(value.into())
    }

    /// Property accessor leaf.
    pub fn property(name: impl Into<std::string::String>) -> Self {
        Expression::Property(name.into())
    }

    /// `self == other`.
    pub fn eq(self, other: impl Into<Expression>) -> Self {
        Expression::Equal(Box::new(self), Box::new(other.into()))
    }

    /// `self != other`.
    pub fn ne(self, other: impl Into<Expression>) -> Self {
        Expression::NotEqual(Box::new(self), Box::new(other.into()))
    }

    /// `self > other`.
    pub fn gt(self, other: impl Into<Expression>) -> Self {
        Expression::GreaterThan(Box::new(self), Box::new(other.into()))
    }

    /// `self >= other`.
    pub fn gte(self, other: impl Into<Expression>) -> Self {
        Expression::GreaterThanOrEqualTo(Box::new(self), Box::new(other.into()))
    }

    /// `self < other`.
    pub fn lt(self, other: impl Into<Expression>) -> Self {
        Expression::LessThan(Box::new(self), Box::new(other.into()))
    }

    /// `self <= other`.
    pub fn lte(self, other: impl Into<Expression>) -> Self {
        Expression::LessThanOrEqualTo(Box::new(self), Box::new(other.into()))
    }

    /// Disjunction over children.
    pub fn any(children: impl IntoIterator<Item = Expression>) -> Self {
        Expression::Any(children.into_iter().collect())
    }

    /// Conjunction over children.
    pub fn all(children: impl IntoIterator<Item = Expression>) -> Self {
        Expression::All(children.into_iter().collect())
    }

    /// Numeric coercion of `self`.
    pub fn number(self) -> Self {
        Expression::Number(Box::new(self))
    }

    /// String coercion of `self`.
    pub fn string(self) -> Self {
        Expression::String(Box::new(self))
    }

    /// Truthiness coercion of `self`.
    pub fn boolean(self) -> Self {
        Expression::Boolean(Box::new(self))
    }

    /// Uniform random integer in `[0, max)`.
    pub fn random(max: impl Into<Expression>) -> Self {
        Expression::Random(Box::new(max.into()))
    }

    /// Current Unix timestamp generator.
    pub fn now() -> Self {
        Expression::Now
    }

    /// Timestamp parser for RFC 3339 strings.
    pub fn time(value: impl Into<Expression>) -> Self {
        Expression::Time(Box::new(value.into()))
    }

    /// Evaluate to a boolean. Missing properties, type mismatches and
    /// malformed subtrees all come out false.
    pub fn evaluate(&self, properties: &Properties) -> bool {
        truthy(self.eval(properties).as_ref())
    }

    fn eval(&self, properties: &Properties) -> Option<Value> {
        match self {
            Expression::Value(value) => Some(value.clone()),
            Expression::Property(name) => properties.get(name).cloned(),
            Expression::Equal(lhs, rhs) => {
                let (a, b) = (lhs.eval(properties)?, rhs.eval(properties)?);
                Some(Value::Bool(loose_eq(&a, &b)))
            }
            Expression::NotEqual(lhs, rhs) => {
                let (a, b) = (lhs.eval(properties)?, rhs.eval(properties)?);
                Some(Value::Bool(!loose_eq(&a, &b)))
            }
            Expression::GreaterThan(lhs, rhs) => {
                ordered(lhs, rhs, properties, |o| o == Ordering::Greater)
            }
            Expression::GreaterThanOrEqualTo(lhs, rhs) => {
                ordered(lhs, rhs, properties, |o| o != Ordering::Less)
            }
            Expression::LessThan(lhs, rhs) => {
                ordered(lhs, rhs, properties, |o| o == Ordering::Less)
            }
            Expression::LessThanOrEqualTo(lhs, rhs) => {
                ordered(lhs, rhs, properties, |o| o != Ordering::Greater)
            }
            Expression::Any(children) => {
                Some(Value::Bool(children.iter().any(|c| c.evaluate(properties))))
            }
            Expression::All(children) => {
                Some(Value::Bool(children.iter().all(|c| c.evaluate(properties))))
            }
            Expression::Number(inner) => inner.eval(properties).and_then(|v| to_number(&v)),
            Expression::String(inner) => inner.eval(properties).map(|v| to_string_value(&v)),
            Expression::Boolean(inner) => {
                Some(Value::Bool(truthy(inner.eval(properties).as_ref())))
            }
            Expression::Random(max) => {
                let max = max.eval(properties).and_then(|v| as_f64(&v))?;
                if max <= 0.0 {
                    return None;
                }
                let drawn = rand::thread_rng().gen_range(0.0..max).floor() as i64;
                Some(json!(drawn))
            }
            Expression::Now => Some(json!(chrono::Utc::now().timestamp())),
            Expression::Time(inner) => {
                let raw = inner.eval(properties)?;
                let text = raw.as_str()?;
                let parsed = chrono::DateTime::parse_from_rfc3339(text).ok()?;
                Some(json!(parsed.timestamp()))
            }
        }
    }

    /// Serialize into the single-key-mapping wire form.
    pub fn to_value(&self) -> Value {
        match self {
            Expression::Value(value) => value.clone(),
            Expression::Property(name) => json!({ "Property": [name] }),
            Expression::Equal(a, b) => json!({ "Equal": [a.to_value(), b.to_value()] }),
            Expression::NotEqual(a, b) => json!({ "NotEqual": [a.to_value(), b.to_value()] }),
            Expression::GreaterThan(a, b) => {
                json!({ "GreaterThan": [a.to_value(), b.to_value()] })
            }
            Expression::GreaterThanOrEqualTo(a, b) => {
                json!({ "GreaterThanOrEqualTo": [a.to_value(), b.to_value()] })
            }
            Expression::LessThan(a, b) => json!({ "LessThan": [a.to_value(), b.to_value()] }),
            Expression::LessThanOrEqualTo(a, b) => {
                json!({ "LessThanOrEqualTo": [a.to_value(), b.to_value()] })
            }
            Expression::Any(children) => {
                json!({ "Any": children.iter().map(Expression::to_value).collect::<Vec<_>>() })
            }
            Expression::All(children) => {
                json!({ "All": children.iter().map(Expression::to_value).collect::<Vec<_>>() })
            }
            Expression::Number(inner) => json!({ "Number": [inner.to_value()] }),
            Expression::String(inner) => json!({ "String": [inner.to_value()] }),
            Expression::Boolean(inner) => json!({ "Boolean": [inner.to_value()] }),
            Expression::Random(max) => json!({ "Random": [max.to_value()] }),
            Expression::Now => json!({ "Now": [] }),
            Expression::Time(inner) => json!({ "Time": [inner.to_value()] }),
        }
    }

    /// Parse the wire form. Unknown operators, non-scalar leaves and
    /// malformed argument lists are rejected.
    pub fn from_value(value: &Value) -> FlagResult<Self> {
        match value {
            Value::String(_) | Value::Number(_) | Value::Bool(_) => {
                Ok(Expression::Value(value.clone()))
            }
            Value::Object(map) => {
                let mut entries = map.iter();
                match (entries.next(), entries.next()) {
                    (Some((op, args)), None) => {
                        let args = args.as_array().ok_or_else(|| {
                            FlagError::InvalidExpression(format!(
                                "arguments for {op} must be an array"
                            ))
                        })?;
                        Self::from_op(op, args)
                    }
                    _ => Err(FlagError::InvalidExpression(
                        "operator mapping must have exactly one key".to_string(),
                    )),
                }
            }
            other => Err(FlagError::InvalidExpression(format!(
                "expected scalar or single-key operator mapping, got {other}"
            ))),
        }
    }

    fn from_op(op: &str, args: &[Value]) -> FlagResult<Self> {
        match op {
            "Property" => {
                let name = unary(op, args)?.as_str().ok_or_else(|| {
                    FlagError::InvalidExpression("Property takes a string name".to_string())
                })?;
                Ok(Expression::Property(name.to_string()))
            }
            "Equal" => binary(op, args).map(|(a, b)| Expression::Equal(a, b)),
            "NotEqual" => binary(op, args).map(|(a, b)| Expression::NotEqual(a, b)),
            "GreaterThan" => binary(op, args).map(|(a, b)| Expression::GreaterThan(a, b)),
            "GreaterThanOrEqualTo" => {
                binary(op, args).map(|(a, b)| Expression::GreaterThanOrEqualTo(a, b))
            }
            "LessThan" => binary(op, args).map(|(a, b)| Expression::LessThan(a, b)),
            "LessThanOrEqualTo" => {
                binary(op, args).map(|(a, b)| Expression::LessThanOrEqualTo(a, b))
            }
            "Any" => Ok(Expression::Any(variadic(args)?)),
            "All" => Ok(Expression::All(variadic(args)?)),
            "Number" => unary(op, args)
                .and_then(Expression::from_value)
                .map(|e| Expression::Number(Box::new(e))),
            "String" => unary(op, args)
                .and_then(Expression::from_value)
                .map(|e| Expression::String(Box::new(e))),
            "Boolean" => unary(op, args)
                .and_then(Expression::from_value)
                .map(|e| Expression::Boolean(Box::new(e))),
            "Random" => unary(op, args)
                .and_then(Expression::from_value)
                .map(|e| Expression::Random(Box::new(e))),
            "Now" => {
                if args.is_empty() {
                    Ok(Expression::Now)
                } else {
                    Err(FlagError::InvalidExpression(
                        "Now takes no arguments".to_string(),
                    ))
                }
            }
            "Time" => unary(op, args)
                .and_then(Expression::from_value)
                .map(|e| Expression::Time(Box::new(e))),
            other => Err(FlagError::InvalidExpression(format!(
                "unknown operator: {other}"
            ))),
        }
    }
}

fn unary<'a>(op: &str, args: &'a [Value]) -> FlagResult<&'a Value> {
    match args {
        [arg] => Ok(arg),
        _ => Err(FlagError::InvalidExpression(format!(
            "{op} takes exactly one argument, got {}",
            args.len()
        ))),
    }
}

fn binary(op: &str, args: &[Value]) -> FlagResult<(Box<Expression>, Box<Expression>)> {
    match args {
        [lhs, rhs] => Ok((
            Box::new(Expression::from_value(lhs)?),
            Box::new(Expression::from_value(rhs)?),
        )),
        _ => Err(FlagError::InvalidExpression(format!(
            "{op} takes exactly two arguments, got {}",
            args.len()
        ))),
    }
}

fn variadic(args: &[Value]) -> FlagResult<Vec<Expression>> {
    args.iter().map(Expression::from_value).collect()
}

fn ordered(
    lhs: &Expression,
    rhs: &Expression,
    properties: &Properties,
    pred: fn(Ordering) -> bool,
) -> Option<Value> {
    let (a, b) = (lhs.eval(properties)?, rhs.eval(properties)?);
    compare(&a, &b).map(|ordering| Value::Bool(pred(ordering)))
}

/// Numbers compare numerically, strings lexicographically. Anything
/// else has no ordering and the comparison yields nothing.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (as_f64(a), as_f64(b)) {
        x.partial_cmp(&y)
    } else if let (Some(x), Some(y)) = (a.as_str(), b.as_str()) {
        Some(x.cmp(y))
    } else {
        None
    }
}

fn loose_eq(a: &Value, b: &Value) -> bool {
    match (as_f64(a), as_f64(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    value.as_number().and_then(serde_json::Number::as_f64)
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(_)) => true,
    }
}

fn to_number(value: &Value) -> Option<Value> {
    match value {
        Value::Number(_) => Some(value.clone()),
        Value::String(s) => s.parse::<f64>().ok().map(|f| json!(f)),
        Value::Bool(b) => Some(json!(if *b { 1 } else { 0 })),
        _ => None,
    }
}

fn to_string_value(value: &Value) -> Value {
    match value {
        Value::String(_) => value.clone(),
        Value::Number(n) => json!(n.to_string()),
        Value::Bool(b) => json!(b.to_string()),
        other => json!(other.to_string()),
    }
}

impl From<&str> for Expression {
    fn from(value: &str) -> Self {
        Expression::Value(json!(value))
    }
}

impl From<std::string::String> for Expression {
    fn from(value: std::string::String) -> Self {
        Expression::Value(json!(value))
    }
}

impl From<i64> for Expression {
    fn from(value: i64) -> Self {
        Expression::Value(json!(value))
    }
}

impl From<f64> for Expression {
    fn from(value: f64) -> Self {
        Expression::Value(json!(value))
    }
}

impl From<bool> for Expression {
    fn from(value: bool) -> Self {
        Expression::Value(json!(value))
    }
}

impl Serialize for Expression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Expression {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Expression::from_value(&value).map_err(D::Error::custom)
    }
}
