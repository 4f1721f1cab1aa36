use thiserror::Error;

use crate::parse::SyntaxError;

/// Unified error taxonomy for parsing, resolution, and evaluation.
///
/// Every variant carries a structured payload and a stable
/// [`template_key()`](DilemmaError::template_key) so callers can reword
/// messages (see [`MessageTemplates`](crate::MessageTemplates)) without
/// touching matching logic.
#[derive(Debug, Error)]
pub enum DilemmaError {
    /// Malformed source text; carries position, context, and suggestions.
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    /// A variable path could not be resolved against the context.
    #[error("{reason}")]
    Variable { path: String, reason: String },

    /// An operator received operands of an unsupported type.
    #[error("'{op}' operator not supported between {left} and {right}")]
    TypeMismatch {
        op: String,
        left: &'static str,
        right: &'static str,
    },

    /// Division by integer or float zero.
    #[error("Division by zero")]
    ZeroDivision,

    /// Unparseable or unsupported date representation, or a malformed
    /// date-predicate operand.
    #[error("{detail}")]
    DateTime { detail: String },

    /// Containment requested on a non-container operand. `side` names the
    /// offending operand position ("left" or "right").
    #[error("'{side}' operand of '{op}' must be a collection (string, list, or map)")]
    Container {
        side: &'static str,
        op: &'static str,
    },

    /// Catch-all wrapping any other internal failure with the expression
    /// text and the innermost cause.
    #[error("Error evaluating expression: {expression} - Caused by: {cause}: {detail}")]
    Evaluation {
        expression: String,
        cause: String,
        detail: String,
    },
}

impl DilemmaError {
    /// Symbolic identifier of this error's message template.
    #[must_use]
    pub fn template_key(&self) -> &'static str {
        match self {
            DilemmaError::Syntax(err) => err.template_key(),
            DilemmaError::Variable { .. } => "variable_error",
            DilemmaError::TypeMismatch { .. } => "type_mismatch",
            DilemmaError::ZeroDivision => "zero_division",
            DilemmaError::DateTime { .. } => "datetime_error",
            DilemmaError::Container { .. } => "container_error",
            DilemmaError::Evaluation { .. } => "evaluation_error",
        }
    }

    /// Attach the source expression to an [`Evaluation`](Self::Evaluation)
    /// error raised below the entry point, where the text is not in scope.
    pub(crate) fn with_expression(self, text: &str) -> Self {
        match self {
            DilemmaError::Evaluation {
                expression,
                cause,
                detail,
            } if expression.is_empty() => DilemmaError::Evaluation {
                expression: text.to_owned(),
                cause,
                detail,
            },
            other => other,
        }
    }
}
