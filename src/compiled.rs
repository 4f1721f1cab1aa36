//! Reusable compiled expressions and shape-specialized path getters.
//!
//! [`compile`] parses once so repeated evaluations skip the parser.
//! [`CompiledExpression::with_sample`] goes further: it walks a sample
//! context and records, per variable path, the exact key/index steps that
//! reach the value. Contexts with the same shape then resolve paths without
//! re-splitting or re-validating them; contexts with a different shape fall
//! back to the general resolver, so results never differ.

use std::collections::{BTreeSet, HashMap};

use crate::error::DilemmaError;
use crate::evaluate::Evaluator;
use crate::lookup;
use crate::parse;
use crate::types::{Context, Expr, Value};

/// One move through the context tree: an object key or a list index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Step {
    Key(String),
    Index(usize),
}

/// Follow pre-compiled steps through a context. `None` means the context
/// does not match the shape the steps were compiled for.
pub(crate) fn apply_steps<'a>(
    steps: &[Step],
    ctx: &'a Context,
) -> Option<&'a serde_json::Value> {
    let mut iter = steps.iter();
    let mut current = match iter.next()? {
        Step::Key(key) => ctx.root().get(key)?,
        Step::Index(_) => return None,
    };
    for step in iter {
        current = match (step, current) {
            (Step::Key(key), serde_json::Value::Object(map)) => map.get(key)?,
            (Step::Index(i), serde_json::Value::Array(items)) => items.get(*i)?,
            _ => return None,
        };
    }
    Some(current)
}

/// An expression parsed once and reusable across contexts.
#[derive(Debug, Clone)]
pub struct CompiledExpression {
    expr: Expr,
    source: String,
    getters: HashMap<String, Vec<Step>>,
}

/// Parse an expression for repeated evaluation.
pub fn compile(expression: &str) -> Result<CompiledExpression, DilemmaError> {
    let expr = parse::parse(expression)?;
    Ok(CompiledExpression {
        expr,
        source: expression.to_owned(),
        getters: HashMap::new(),
    })
}

/// Compile an expression and, when a sample context is given, specialize its
/// variable lookups to that context's shape.
pub fn create_optimized_evaluator(
    expression: &str,
    sample: Option<&Context>,
) -> Result<CompiledExpression, DilemmaError> {
    let compiled = compile(expression)?;
    Ok(match sample {
        Some(sample) => compiled.with_sample(sample),
        None => compiled,
    })
}

impl CompiledExpression {
    /// Evaluate against a context, using specialized getters when present.
    pub fn evaluate(&self, ctx: &Context) -> Result<Value, DilemmaError> {
        let evaluator = if self.getters.is_empty() {
            Evaluator::new(ctx)
        } else {
            Evaluator::with_getters(ctx, &self.getters)
        };
        evaluator
            .eval(&self.expr)
            .map_err(|err| err.with_expression(&self.source))
    }

    /// Specialize variable lookups to the shape of `sample`. Paths the
    /// sample cannot resolve are left to the general resolver.
    #[must_use]
    pub fn with_sample(mut self, sample: &Context) -> Self {
        for path in self.variable_paths() {
            if let Some(steps) = compile_getter(&path, sample) {
                self.getters.insert(path, steps);
            }
        }
        self
    }

    /// Every variable path referenced by the expression.
    pub fn variable_paths(&self) -> BTreeSet<String> {
        let mut paths = BTreeSet::new();
        collect_paths(&self.expr, &mut paths);
        paths
    }
}

fn compile_getter(path: &str, sample: &Context) -> Option<Vec<Step>> {
    let segments = lookup::split_segments(path).ok()?;
    let mut steps = Vec::with_capacity(segments.len());
    let (first, rest) = segments.split_first()?;
    let mut current = sample.root().get(first)?;
    steps.push(Step::Key(first.clone()));
    for segment in rest {
        match current {
            serde_json::Value::Object(map) => {
                current = map.get(segment)?;
                steps.push(Step::Key(segment.clone()));
            }
            serde_json::Value::Array(items) => {
                let index: usize = segment.parse().ok()?;
                current = items.get(index)?;
                steps.push(Step::Index(index));
            }
            _ => return None,
        }
    }
    Some(steps)
}

fn collect_paths(expr: &Expr, out: &mut BTreeSet<String>) {
    match expr {
        Expr::Int(_) | Expr::Float(_) | Expr::Bool(_) | Expr::Str(_) => {}
        Expr::Variable(path) => {
            out.insert(path.clone());
        }
        Expr::Neg(e)
        | Expr::IsPast(e)
        | Expr::IsFuture(e)
        | Expr::IsToday(e)
        | Expr::Within { date: e, .. }
        | Expr::OlderThan { date: e, .. } => collect_paths(e, out),
        Expr::Add(l, r)
        | Expr::Sub(l, r)
        | Expr::Mul(l, r)
        | Expr::Div(l, r)
        | Expr::And(l, r)
        | Expr::Or(l, r)
        | Expr::In(l, r)
        | Expr::Contains(l, r)
        | Expr::Before(l, r)
        | Expr::After(l, r)
        | Expr::SameDayAs(l, r)
        | Expr::Compare {
            left: l, right: r, ..
        } => {
            collect_paths(l, out);
            collect_paths(r, out);
        }
    }
}
