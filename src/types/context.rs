use serde_json::{Map, Number};

use crate::error::DilemmaError;

use super::Value;

/// Reserved marker key used to carry timestamps through the JSON snapshot.
/// `{"__datetime__": "<RFC 3339>"}` round-trips to [`Value::Timestamp`].
pub(crate) const DATETIME_KEY: &str = "__datetime__";

/// The variable environment for one evaluation: an immutable, JSON-compatible
/// snapshot. Built once, queried read-only by the path resolver, and safely
/// shareable across concurrent evaluations.
///
/// Nested values can be set with dot-separated paths:
///
/// ```
/// use dilemma::{evaluate, Context, Value};
///
/// let ctx = Context::new().set("user.age", 25_i64);
/// assert_eq!(evaluate("user.age >= 18", &ctx).unwrap(), Value::Bool(true));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Context {
    root: Map<String, serde_json::Value>,
}

impl Context {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value at a dot-separated path, creating intermediate maps as
    /// needed. Timestamps are stored as the reserved marker object.
    #[must_use]
    pub fn set(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.insert(path, value.into());
        self
    }

    /// Insert a value at a dot-separated path (mutable reference version).
    pub fn insert(&mut self, path: &str, value: Value) {
        let segments: Vec<&str> = path.split('.').collect();
        insert_recursive(&mut self.root, &segments, value_to_json(&value));
    }

    /// Build a context from a JSON object string.
    ///
    /// # Errors
    ///
    /// Returns [`DilemmaError::Evaluation`] if the string is not valid JSON
    /// or its top level is not an object.
    pub fn from_json(json: &str) -> Result<Self, DilemmaError> {
        let parsed: serde_json::Value =
            serde_json::from_str(json).map_err(|e| DilemmaError::Evaluation {
                expression: String::new(),
                cause: "InvalidContext".to_owned(),
                detail: format!("invalid JSON context: {e}"),
            })?;
        match parsed {
            serde_json::Value::Object(root) => Ok(Self { root }),
            other => Err(DilemmaError::Evaluation {
                expression: String::new(),
                cause: "InvalidContext".to_owned(),
                detail: format!(
                    "context must be a JSON object, got {}",
                    json_type_name(&other)
                ),
            }),
        }
    }

    /// The snapshot queried by the path resolver.
    pub(crate) fn root(&self) -> &Map<String, serde_json::Value> {
        &self.root
    }
}

impl From<Map<String, serde_json::Value>> for Context {
    fn from(root: Map<String, serde_json::Value>) -> Self {
        Self { root }
    }
}

pub(crate) fn json_type_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "list",
        serde_json::Value::Object(_) => "map",
    }
}

fn insert_recursive(
    map: &mut Map<String, serde_json::Value>,
    segments: &[&str],
    value: serde_json::Value,
) {
    match segments {
        [] => {}
        [last] => {
            map.insert((*last).to_owned(), value);
        }
        [first, rest @ ..] => {
            let entry = map
                .entry((*first).to_owned())
                .or_insert_with(|| serde_json::Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = serde_json::Value::Object(Map::new());
            }
            if let serde_json::Value::Object(nested) = entry {
                insert_recursive(nested, rest, value);
            }
        }
    }
}

/// Encode a [`Value`] into the snapshot representation.
pub(crate) fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Int(v) => serde_json::Value::Number((*v).into()),
        Value::Float(v) => Number::from_f64(*v)
            .map_or(serde_json::Value::Null, serde_json::Value::Number),
        Value::Bool(v) => serde_json::Value::Bool(*v),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::List(items) => {
            serde_json::Value::Array(items.iter().map(value_to_json).collect())
        }
        Value::Map(entries) => serde_json::Value::Object(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect(),
        ),
        Value::Timestamp(dt) => {
            let mut marker = Map::new();
            marker.insert(
                DATETIME_KEY.to_owned(),
                serde_json::Value::String(dt.to_rfc3339()),
            );
            serde_json::Value::Object(marker)
        }
        Value::Null => serde_json::Value::Null,
    }
}
