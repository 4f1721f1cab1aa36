use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, FixedOffset, SecondsFormat};

use crate::error::DilemmaError;

use super::expr::CompareOp;

/// Absolute tolerance for float equality. `0.1 + 0.2 == 0.3` must hold.
pub(crate) const EPSILON: f64 = 1e-10;

/// Runtime value produced by evaluating an expression or resolving a path.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A 64-bit signed integer.
    Int(i64),
    /// A 64-bit floating-point number.
    Float(f64),
    /// A boolean value.
    Bool(bool),
    /// A UTF-8 string.
    String(String),
    /// An ordered sequence of values.
    List(Vec<Value>),
    /// A string-keyed map; key order is not significant.
    Map(BTreeMap<String, Value>),
    /// An instant with a fixed UTC offset.
    Timestamp(DateTime<FixedOffset>),
    /// JSON `null`: a key that is present but holds nothing.
    Null,
}

impl Value {
    /// Human-readable type name used in error payloads.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Bool(_) => "boolean",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Timestamp(_) => "timestamp",
            Value::Null => "null",
        }
    }

    /// Truthiness for logical operators: non-zero numbers and non-empty
    /// strings/collections are truthy; `Null` and `false` are not.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Int(v) => *v != 0,
            Value::Float(v) => *v != 0.0,
            Value::Bool(v) => *v,
            Value::String(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(entries) => !entries.is_empty(),
            Value::Timestamp(_) => true,
            Value::Null => false,
        }
    }

    #[must_use]
    pub(crate) fn as_f64(&self) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Equality across values. Total: values of unrelated types are unequal,
    /// never an error. Numeric comparisons involving a float are tolerant to
    /// [`EPSILON`]; lists compare element-wise in order; maps compare by key
    /// set and values regardless of order.
    #[must_use]
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(_), Value::Int(_) | Value::Float(_))
            | (Value::Int(_), Value::Float(_)) => {
                // both sides numeric here, as_f64 cannot fail
                let (a, b) = (self.as_f64().unwrap_or(0.0), other.as_f64().unwrap_or(0.0));
                (a - b).abs() < EPSILON
            }
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).is_some_and(|other_v| v.loose_eq(other_v)))
            }
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            (Value::Null, Value::Null) => true,
            _ => false,
        }
    }

    /// Apply a comparison operator. Equality is total; ordering requires both
    /// operands to be numeric and raises `TypeMismatchError` otherwise.
    pub fn compare(&self, op: CompareOp, other: &Value) -> Result<bool, DilemmaError> {
        match op {
            CompareOp::Eq => Ok(self.loose_eq(other)),
            CompareOp::Neq => Ok(!self.loose_eq(other)),
            CompareOp::Gt | CompareOp::Gte | CompareOp::Lt | CompareOp::Lte => {
                if !self.is_numeric() || !other.is_numeric() {
                    return Err(DilemmaError::TypeMismatch {
                        op: op.to_string(),
                        left: self.type_name(),
                        right: other.type_name(),
                    });
                }
                let a = self.as_f64().unwrap_or(0.0);
                let b = other.as_f64().unwrap_or(0.0);
                Ok(match op {
                    CompareOp::Gt => a > b,
                    CompareOp::Gte => a >= b,
                    CompareOp::Lt => a < b,
                    CompareOp::Lte => a <= b,
                    CompareOp::Eq | CompareOp::Neq => unreachable!(),
                })
            }
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Value::Timestamp(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::String(s) => write!(f, "\"{s}\""),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "\"{k}\": {v}")?;
                }
                write!(f, "}}")
            }
            Value::Timestamp(dt) => {
                write!(f, "{}", dt.to_rfc3339_opts(SecondsFormat::Secs, false))
            }
            Value::Null => write!(f, "null"),
        }
    }
}
