//! Expression parsing: a recursive-descent grammar over [`winnow`]
//! combinators, producing the [`Expr`] tree consumed by the evaluator.

mod error;
mod grammar;

pub use error::{SyntaxError, SyntaxErrorKind};

use winnow::Parser;

use crate::types::Expr;

/// Parenthesis nesting beyond this depth is rejected up front rather than
/// risking parser stack exhaustion.
const MAX_NESTING_DEPTH: usize = 128;

/// Parse an expression string into an [`Expr`] tree.
///
/// The whole input must be consumed; trailing tokens are a syntax error.
pub(crate) fn parse(input: &str) -> Result<Expr, SyntaxError> {
    check_nesting(input)?;
    grammar::expression
        .parse(input)
        .map_err(|err| SyntaxError::from_parse_failure(input, err.offset(), err.inner()))
}

/// Scan for parenthesis depth, ignoring parentheses inside string literals.
fn check_nesting(input: &str) -> Result<(), SyntaxError> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in input.chars() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' => {
                depth += 1;
                if depth > MAX_NESTING_DEPTH {
                    return Err(SyntaxError::nesting_too_deep(MAX_NESTING_DEPTH));
                }
            }
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    Ok(())
}
