//! Tree-walking evaluation of parsed expressions against a [`Context`].

use chrono::{DateTime, FixedOffset};
use std::collections::HashMap;

use crate::compiled::{apply_steps, Step};
use crate::dates::{ensure_datetime, now, unit_duration};
use crate::error::DilemmaError;
use crate::lookup;
use crate::parse;
use crate::types::{Context, Expr, Value};

/// Parse and evaluate an expression in one call.
///
/// This is the convenience entry point; callers evaluating the same
/// expression repeatedly should use [`compile`](crate::compile) instead.
pub fn evaluate(expression: &str, ctx: &Context) -> Result<Value, DilemmaError> {
    let expr = parse::parse(expression)?;
    match Evaluator::new(ctx).eval(&expr) {
        Ok(value) => Ok(value),
        Err(err) => {
            tracing::debug!(expression, error = %err, "evaluation failed");
            Err(err.with_expression(expression))
        }
    }
}

/// Walks an [`Expr`] tree against one context, optionally consulting
/// shape-compiled getters before the general path resolver.
pub(crate) struct Evaluator<'a> {
    ctx: &'a Context,
    getters: Option<&'a HashMap<String, Vec<Step>>>,
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(ctx: &'a Context) -> Self {
        Self { ctx, getters: None }
    }

    pub(crate) fn with_getters(
        ctx: &'a Context,
        getters: &'a HashMap<String, Vec<Step>>,
    ) -> Self {
        Self {
            ctx,
            getters: Some(getters),
        }
    }

    pub(crate) fn eval(&self, expr: &Expr) -> Result<Value, DilemmaError> {
        match expr {
            Expr::Int(v) => Ok(Value::Int(*v)),
            Expr::Float(v) => Ok(Value::Float(*v)),
            Expr::Bool(v) => Ok(Value::Bool(*v)),
            Expr::Str(s) => Ok(Value::String(s.clone())),
            Expr::Variable(path) => self.lookup(path),

            Expr::Neg(inner) => match self.eval(inner)? {
                Value::Int(v) => v
                    .checked_neg()
                    .map(Value::Int)
                    .ok_or_else(|| overflow("-")),
                Value::Float(v) => Ok(Value::Float(-v)),
                other => Err(DilemmaError::Evaluation {
                    expression: String::new(),
                    cause: "TypeError".to_owned(),
                    detail: format!("unary '-' is not supported for {}", other.type_name()),
                }),
            },

            Expr::Add(l, r) => self.arith(l, r, "+", i64::checked_add, |a, b| a + b),
            Expr::Sub(l, r) => self.arith(l, r, "-", i64::checked_sub, |a, b| a - b),
            Expr::Mul(l, r) => self.arith(l, r, "*", i64::checked_mul, |a, b| a * b),
            Expr::Div(l, r) => self.divide(l, r),

            Expr::Compare { op, left, right } => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                l.compare(*op, &r).map(Value::Bool)
            }

            // Both operands evaluate eagerly, so an error on either side
            // surfaces even when the other side decides the result.
            Expr::And(l, r) => {
                let left = self.eval(l)?.is_truthy();
                let right = self.eval(r)?.is_truthy();
                Ok(Value::Bool(left && right))
            }
            Expr::Or(l, r) => {
                let left = self.eval(l)?.is_truthy();
                let right = self.eval(r)?.is_truthy();
                Ok(Value::Bool(left || right))
            }

            Expr::In(item, container) => {
                let item = self.eval(item)?;
                let container = self.eval(container)?;
                contains(&container, &item, "in", "right").map(Value::Bool)
            }
            Expr::Contains(container, item) => {
                let container = self.eval(container)?;
                let item = self.eval(item)?;
                contains(&container, &item, "contains", "left").map(Value::Bool)
            }

            Expr::IsPast(e) => Ok(Value::Bool(self.datetime(e)? < now())),
            Expr::IsFuture(e) => Ok(Value::Bool(self.datetime(e)? > now())),
            Expr::IsToday(e) => {
                let dt = self.datetime(e)?;
                let today = now().with_timezone(dt.offset()).date_naive();
                Ok(Value::Bool(dt.date_naive() == today))
            }
            Expr::Within { date, amount, unit } => {
                let dt = self.datetime(date)?;
                let delta = now().signed_duration_since(dt).abs();
                Ok(Value::Bool(delta <= unit_duration(*amount, *unit)))
            }
            Expr::OlderThan { date, amount, unit } => {
                let dt = self.datetime(date)?;
                let age = now().signed_duration_since(dt);
                Ok(Value::Bool(age > unit_duration(*amount, *unit)))
            }
            Expr::Before(l, r) => Ok(Value::Bool(self.datetime(l)? < self.datetime(r)?)),
            Expr::After(l, r) => Ok(Value::Bool(self.datetime(l)? > self.datetime(r)?)),
            Expr::SameDayAs(l, r) => {
                let a = self.datetime(l)?;
                let b = self.datetime(r)?;
                Ok(Value::Bool(a.date_naive() == b.date_naive()))
            }
        }
    }

    fn lookup(&self, path: &str) -> Result<Value, DilemmaError> {
        if let Some(getters) = self.getters {
            if let Some(steps) = getters.get(path) {
                if let Some(json) = apply_steps(steps, self.ctx) {
                    return lookup::json_to_value(json, path);
                }
                tracing::debug!(path, "compiled getter missed, using full resolver");
            }
        }
        lookup::resolve(path, self.ctx)
    }

    fn datetime(&self, expr: &Expr) -> Result<DateTime<FixedOffset>, DilemmaError> {
        ensure_datetime(&self.eval(expr)?)
    }

    fn arith(
        &self,
        left: &Expr,
        right: &Expr,
        op: &str,
        int_op: fn(i64, i64) -> Option<i64>,
        float_op: fn(f64, f64) -> f64,
    ) -> Result<Value, DilemmaError> {
        let l = self.eval(left)?;
        let r = self.eval(right)?;
        match (&l, &r) {
            (Value::Int(a), Value::Int(b)) => {
                int_op(*a, *b).map(Value::Int).ok_or_else(|| overflow(op))
            }
            _ => match (l.as_f64(), r.as_f64()) {
                (Some(a), Some(b)) => Ok(Value::Float(float_op(a, b))),
                _ => Err(DilemmaError::TypeMismatch {
                    op: op.to_owned(),
                    left: l.type_name(),
                    right: r.type_name(),
                }),
            },
        }
    }

    /// Division is always true division; integer operands produce a float.
    fn divide(&self, left: &Expr, right: &Expr) -> Result<Value, DilemmaError> {
        let l = self.eval(left)?;
        let r = self.eval(right)?;
        let (a, b) = match (l.as_f64(), r.as_f64()) {
            (Some(a), Some(b)) => (a, b),
            _ => {
                return Err(DilemmaError::TypeMismatch {
                    op: "/".to_owned(),
                    left: l.type_name(),
                    right: r.type_name(),
                })
            }
        };
        if b == 0.0 {
            return Err(DilemmaError::ZeroDivision);
        }
        Ok(Value::Float(a / b))
    }
}

fn contains(
    container: &Value,
    item: &Value,
    op: &'static str,
    side: &'static str,
) -> Result<bool, DilemmaError> {
    match container {
        Value::List(items) => Ok(items.iter().any(|v| v.loose_eq(item))),
        Value::Map(map) => match item {
            Value::String(key) => Ok(map.contains_key(key)),
            _ => Ok(false),
        },
        Value::String(s) => match item {
            Value::String(needle) => Ok(s.contains(needle.as_str())),
            other => Err(DilemmaError::TypeMismatch {
                op: op.to_owned(),
                left: other.type_name(),
                right: "string",
            }),
        },
        _ => Err(DilemmaError::Container { side, op }),
    }
}

fn overflow(op: &str) -> DilemmaError {
    DilemmaError::Evaluation {
        expression: String::new(),
        cause: "IntegerOverflow".to_owned(),
        detail: format!("'{op}' result exceeds 64-bit integer range"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn empty() -> Context {
        Context::new()
    }

    fn eval_str(expr: &str) -> Value {
        evaluate(expr, &empty()).unwrap()
    }

    #[test]
    fn arithmetic_precedence() {
        assert_eq!(eval_str("2 + 3 * 4"), Value::Int(14));
        assert_eq!(eval_str("(2 + 3) * 4"), Value::Int(20));
        assert_eq!(eval_str("10 - 5 - 3"), Value::Int(2));
    }

    #[test]
    fn division_is_true_division() {
        assert_eq!(eval_str("7 / 2"), Value::Float(3.5));
        assert_eq!(eval_str("10 / 2"), Value::Float(5.0));
    }

    #[test]
    fn division_by_zero() {
        assert!(matches!(
            evaluate("1 / 0", &empty()).unwrap_err(),
            DilemmaError::ZeroDivision
        ));
        assert!(matches!(
            evaluate("1 / 0.0", &empty()).unwrap_err(),
            DilemmaError::ZeroDivision
        ));
    }

    #[test]
    fn mixed_numeric_arithmetic_promotes() {
        assert_eq!(eval_str("1 + 0.5"), Value::Float(1.5));
        assert_eq!(eval_str("2 * 1.5"), Value::Float(3.0));
    }

    #[test]
    fn integer_overflow_is_an_error() {
        let err = evaluate(&format!("{} + 1", i64::MAX), &empty()).unwrap_err();
        assert!(matches!(err, DilemmaError::Evaluation { .. }));
        assert!(err.to_string().contains("IntegerOverflow"));
    }

    #[test]
    fn string_arithmetic_is_a_type_mismatch() {
        let err = evaluate("'a' + 1", &empty()).unwrap_err();
        match err {
            DilemmaError::TypeMismatch { op, left, right } => {
                assert_eq!(op, "+");
                assert_eq!(left, "string");
                assert_eq!(right, "integer");
            }
            other => panic!("expected TypeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn float_equality_uses_epsilon() {
        assert_eq!(eval_str("0.1 + 0.2 == 0.3"), Value::Bool(true));
    }

    #[test]
    fn comparisons() {
        assert_eq!(eval_str("3 > 2"), Value::Bool(true));
        assert_eq!(eval_str("3 <= 2"), Value::Bool(false));
        assert_eq!(eval_str("2 == 2.0"), Value::Bool(true));
        assert_eq!(eval_str("'a' != 'b'"), Value::Bool(true));
    }

    #[test]
    fn equality_across_types_is_false_not_an_error() {
        assert_eq!(eval_str("1 == 'one'"), Value::Bool(false));
        assert_eq!(eval_str("true != 'true'"), Value::Bool(true));
    }

    #[test]
    fn ordering_non_numeric_is_an_error() {
        assert!(matches!(
            evaluate("'a' < 'b'", &empty()).unwrap_err(),
            DilemmaError::TypeMismatch { .. }
        ));
    }

    #[test]
    fn logical_operators_evaluate_both_sides() {
        // A decided left side does not suppress errors on the right.
        assert!(matches!(
            evaluate("false and 1 / 0", &empty()).unwrap_err(),
            DilemmaError::ZeroDivision
        ));
        assert!(matches!(
            evaluate("true or missing", &empty()).unwrap_err(),
            DilemmaError::Variable { .. }
        ));
        assert!(matches!(
            evaluate("false and missing", &empty()).unwrap_err(),
            DilemmaError::Variable { .. }
        ));
    }

    #[test]
    fn logical_operators_coerce_truthiness() {
        assert_eq!(eval_str("1 and 'x'"), Value::Bool(true));
        assert_eq!(eval_str("0 or ''"), Value::Bool(false));
    }

    #[test]
    fn undefined_variable_error() {
        let err = evaluate("missing > 1", &empty()).unwrap_err();
        assert_eq!(err.to_string(), "Variable 'missing' is not defined");
    }

    fn list_ctx() -> Context {
        Context::from_json(
            r#"{"roles": ["admin", "dev"], "name": "alice",
                "limits": {"daily": 5}, "nested": [[1, 2], [3]]}"#,
        )
        .unwrap()
    }

    #[test]
    fn in_operator_on_lists() {
        let ctx = list_ctx();
        assert_eq!(
            evaluate("'admin' in roles", &ctx).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            evaluate("'root' in roles", &ctx).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn contains_operator_mirrors_in() {
        let ctx = list_ctx();
        assert_eq!(
            evaluate("roles contains 'dev'", &ctx).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn in_on_maps_checks_keys() {
        let ctx = list_ctx();
        assert_eq!(
            evaluate("'daily' in limits", &ctx).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            evaluate("'weekly' in limits", &ctx).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn in_on_strings_is_substring() {
        let ctx = list_ctx();
        assert_eq!(
            evaluate("'lic' in name", &ctx).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            evaluate("name contains 'ali'", &ctx).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn in_with_scalar_container_errors_on_right() {
        let err = evaluate("1 in 2", &empty()).unwrap_err();
        match err {
            DilemmaError::Container { side, op } => {
                assert_eq!(side, "right");
                assert_eq!(op, "in");
            }
            other => panic!("expected Container, got {other:?}"),
        }
    }

    #[test]
    fn contains_with_scalar_container_errors_on_left() {
        let err = evaluate("2 contains 1", &empty()).unwrap_err();
        match err {
            DilemmaError::Container { side, op } => {
                assert_eq!(side, "left");
                assert_eq!(op, "contains");
            }
            other => panic!("expected Container, got {other:?}"),
        }
    }

    #[test]
    fn list_membership_uses_loose_equality() {
        let ctx = Context::from_json(r#"{"xs": [1, 2.0, 3]}"#).unwrap();
        assert_eq!(evaluate("2 in xs", &ctx).unwrap(), Value::Bool(true));
    }

    fn dated_ctx() -> Context {
        let yesterday = (Utc::now() - Duration::days(1)).to_rfc3339();
        let tomorrow = (Utc::now() + Duration::days(1)).to_rfc3339();
        Context::new()
            .set("yesterday", yesterday.as_str())
            .set("tomorrow", tomorrow.as_str())
    }

    #[test]
    fn is_past_and_is_future() {
        let ctx = dated_ctx();
        assert_eq!(
            evaluate("yesterday is past", &ctx).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            evaluate("yesterday is future", &ctx).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(
            evaluate("tomorrow is future", &ctx).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn is_today_on_current_timestamp() {
        let ctx = Context::new().set("now", Utc::now().to_rfc3339().as_str());
        assert_eq!(evaluate("now is today", &ctx).unwrap(), Value::Bool(true));
    }

    #[test]
    fn within_window() {
        let ctx = dated_ctx();
        assert_eq!(
            evaluate("yesterday within 2 days", &ctx).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            evaluate("yesterday within 2 hours", &ctx).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn older_than_threshold() {
        let ctx = dated_ctx();
        assert_eq!(
            evaluate("yesterday older than 2 hours", &ctx).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            evaluate("yesterday older than 2 days", &ctx).unwrap(),
            Value::Bool(false)
        );
        // A future timestamp has negative age.
        assert_eq!(
            evaluate("tomorrow older than 1 minute", &ctx).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn before_after_same_day() {
        let ctx = dated_ctx();
        assert_eq!(
            evaluate("yesterday before tomorrow", &ctx).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            evaluate("tomorrow after yesterday", &ctx).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            evaluate("yesterday same_day_as tomorrow", &ctx).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(
            evaluate("yesterday same_day_as yesterday", &ctx).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn epoch_seconds_are_dates() {
        let ctx = Context::new().set("epoch", 0i64);
        assert_eq!(evaluate("epoch is past", &ctx).unwrap(), Value::Bool(true));
    }

    #[test]
    fn date_predicate_on_non_date_errors() {
        let err = evaluate("true is past", &empty()).unwrap_err();
        assert!(matches!(err, DilemmaError::DateTime { .. }));
    }

    #[test]
    fn unary_minus() {
        assert_eq!(eval_str("-5"), Value::Int(-5));
        assert_eq!(eval_str("--5"), Value::Int(5));
        assert_eq!(eval_str("-2.5"), Value::Float(-2.5));
    }

    #[test]
    fn evaluation_error_carries_expression_text() {
        let err = evaluate(&format!("{} * 2", i64::MAX), &empty()).unwrap_err();
        assert!(err.to_string().contains(&i64::MAX.to_string()));
    }
}
