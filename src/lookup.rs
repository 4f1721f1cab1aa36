//! Variable path resolution against a [`Context`].
//!
//! Two path dialects are supported and never mixed: dotted (`user.name`)
//! and slash-style (`/users/0/name`, leading slash optional). Slash-style
//! segments made of digits index into lists. The possessive form
//! (`user's name`) is sugar for a dotted step.

use std::collections::BTreeMap;

use crate::dates::ensure_datetime;
use crate::error::DilemmaError;
use crate::types::{json_type_name, Context, Value, DATETIME_KEY};

/// Split a raw path token into lookup segments, validating the dialect.
pub(crate) fn split_segments(path: &str) -> Result<Vec<String>, DilemmaError> {
    if path.contains('[') {
        return Err(variable_error(
            path,
            format!("Bracket notation is not supported in path '{path}'"),
        ));
    }
    let normalized = path.replace("'s ", ".");
    if normalized.contains('/') {
        let trimmed = normalized.strip_prefix('/').unwrap_or(&normalized);
        if trimmed.contains('.') {
            return Err(variable_error(
                path,
                format!("Dotted segments are not allowed in slash-style path '{path}'"),
            ));
        }
        Ok(trimmed.split('/').map(str::to_owned).collect())
    } else {
        Ok(normalized.split('.').map(str::to_owned).collect())
    }
}

/// Resolve a path to its value, converting the JSON leaf into a [`Value`].
pub(crate) fn resolve(path: &str, ctx: &Context) -> Result<Value, DilemmaError> {
    let segments = split_segments(path)?;
    let first = &segments[0];
    let mut current = ctx.root().get(first).ok_or_else(|| {
        let reason = if segments.len() == 1 {
            format!("Variable '{first}' is not defined")
        } else {
            format!("Variable '{first}' is not defined (resolving '{path}')")
        };
        variable_error(path, reason)
    })?;
    for segment in &segments[1..] {
        current = descend(current, segment, path)?;
    }
    json_to_value(current, path)
}

fn descend<'a>(
    current: &'a serde_json::Value,
    segment: &str,
    path: &str,
) -> Result<&'a serde_json::Value, DilemmaError> {
    match current {
        serde_json::Value::Object(map) => map.get(segment).ok_or_else(|| {
            variable_error(
                path,
                format!("Key '{segment}' not found while resolving '{path}'"),
            )
        }),
        serde_json::Value::Array(items) => {
            let index: usize = segment.parse().map_err(|_| {
                variable_error(
                    path,
                    format!("List index '{segment}' is not a number in '{path}'"),
                )
            })?;
            items.get(index).ok_or_else(|| {
                variable_error(
                    path,
                    format!(
                        "Index {index} is out of bounds for list of length {} in '{path}'",
                        items.len()
                    ),
                )
            })
        }
        other => Err(variable_error(
            path,
            format!(
                "Cannot descend into {} value at segment '{segment}' in '{path}'",
                json_type_name(other)
            ),
        )),
    }
}

/// Convert a resolved JSON node into a runtime value. Single-key objects
/// shaped `{"__datetime__": "..."}` become timestamps.
pub(crate) fn json_to_value(json: &serde_json::Value, path: &str) -> Result<Value, DilemmaError> {
    match json {
        serde_json::Value::Null => Ok(Value::Null),
        serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Int(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Value::Float(f))
            } else {
                Err(variable_error(
                    path,
                    format!("Number at '{path}' cannot be represented"),
                ))
            }
        }
        serde_json::Value::String(s) => Ok(Value::String(s.clone())),
        serde_json::Value::Array(items) => items
            .iter()
            .map(|item| json_to_value(item, path))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        serde_json::Value::Object(map) => {
            if map.len() == 1 {
                if let Some(serde_json::Value::String(raw)) = map.get(DATETIME_KEY) {
                    let dt = ensure_datetime(&Value::String(raw.clone()))?;
                    return Ok(Value::Timestamp(dt));
                }
            }
            map.iter()
                .map(|(k, v)| Ok((k.clone(), json_to_value(v, path)?)))
                .collect::<Result<BTreeMap<_, _>, DilemmaError>>()
                .map(Value::Map)
        }
    }
}

fn variable_error(path: &str, reason: String) -> DilemmaError {
    DilemmaError::Variable {
        path: path.to_owned(),
        reason,
    }
}
