//! Caller-overridable error message templates.
//!
//! Every [`DilemmaError`] carries a stable
//! [`template_key`](DilemmaError::template_key); rendering looks the key up
//! in a template table and substitutes `{placeholder}` fields from the
//! error's payload. Hosts can replace any template, for localization or
//! house style, without touching error-handling logic.

use std::collections::HashMap;

use crate::error::DilemmaError;

/// Template table mapping error template keys to message patterns.
#[derive(Debug, Clone)]
pub struct MessageTemplates {
    templates: HashMap<String, String>,
}

impl Default for MessageTemplates {
    fn default() -> Self {
        let mut templates = HashMap::new();
        for (key, pattern) in [
            (
                "unexpected_token",
                "{description} at line {line}, column {column}",
            ),
            (
                "unexpected_character",
                "{description} at line {line}, column {column}",
            ),
            (
                "unexpected_eof",
                "{description} at line {line}, column {column}",
            ),
            ("variable_error", "{reason}"),
            (
                "type_mismatch",
                "'{op}' operator not supported between {left} and {right}",
            ),
            ("zero_division", "Division by zero"),
            ("datetime_error", "{detail}"),
            (
                "container_error",
                "'{side}' operand of '{op}' must be a collection (string, list, or map)",
            ),
            (
                "evaluation_error",
                "Error evaluating expression: {expression} - Caused by: {cause}: {detail}",
            ),
        ] {
            templates.insert(key.to_owned(), pattern.to_owned());
        }
        Self { templates }
    }
}

impl MessageTemplates {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the template for one key. Unknown keys are accepted so hosts
    /// can pre-register templates for future error kinds.
    pub fn set(&mut self, key: impl Into<String>, pattern: impl Into<String>) {
        self.templates.insert(key.into(), pattern.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.templates.get(key).map(String::as_str)
    }

    /// Render an error through its template. Falls back to the error's
    /// `Display` output when no template is registered for its key.
    #[must_use]
    pub fn render(&self, err: &DilemmaError) -> String {
        let Some(pattern) = self.templates.get(err.template_key()) else {
            return err.to_string();
        };
        let mut out = pattern.clone();
        for (name, value) in placeholders(err) {
            out = out.replace(&format!("{{{name}}}"), &value);
        }
        out
    }
}

fn placeholders(err: &DilemmaError) -> Vec<(&'static str, String)> {
    match err {
        DilemmaError::Syntax(e) => vec![
            ("description", e.description().to_owned()),
            ("line", e.line().to_string()),
            ("column", e.column().to_string()),
            ("context", e.context_window().to_owned()),
            ("expected", e.expected().join(", ")),
        ],
        DilemmaError::Variable { path, reason } => vec![
            ("path", path.clone()),
            ("reason", reason.clone()),
        ],
        DilemmaError::TypeMismatch { op, left, right } => vec![
            ("op", op.clone()),
            ("left", (*left).to_owned()),
            ("right", (*right).to_owned()),
        ],
        DilemmaError::ZeroDivision => Vec::new(),
        DilemmaError::DateTime { detail } => vec![("detail", detail.clone())],
        DilemmaError::Container { side, op } => vec![
            ("side", (*side).to_owned()),
            ("op", (*op).to_owned()),
        ],
        DilemmaError::Evaluation {
            expression,
            cause,
            detail,
        } => vec![
            ("expression", expression.clone()),
            ("cause", cause.clone()),
            ("detail", detail.clone()),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::evaluate;
    use crate::types::Context;

    #[test]
    fn default_rendering_matches_display() {
        let templates = MessageTemplates::default();
        let err = evaluate("1 / 0", &Context::new()).unwrap_err();
        assert_eq!(templates.render(&err), err.to_string());
    }

    #[test]
    fn variable_error_renders_reason() {
        let templates = MessageTemplates::default();
        let err = evaluate("missing", &Context::new()).unwrap_err();
        assert_eq!(templates.render(&err), "Variable 'missing' is not defined");
    }

    #[test]
    fn overridden_template_wins() {
        let mut templates = MessageTemplates::default();
        templates.set("zero_division", "cannot divide by zero, sorry");
        let err = evaluate("5 / 0", &Context::new()).unwrap_err();
        assert_eq!(templates.render(&err), "cannot divide by zero, sorry");
    }

    #[test]
    fn override_can_use_payload_placeholders() {
        let mut templates = MessageTemplates::default();
        templates.set("type_mismatch", "bad operands for {op}: {left} vs {right}");
        let err = evaluate("'a' + 1", &Context::new()).unwrap_err();
        assert_eq!(
            templates.render(&err),
            "bad operands for +: string vs integer"
        );
    }

    #[test]
    fn syntax_errors_expose_position_placeholders() {
        let mut templates = MessageTemplates::default();
        templates.set("unexpected_eof", "incomplete at {line}:{column}");
        let err = evaluate("1 +", &Context::new()).unwrap_err();
        assert_eq!(templates.render(&err), "incomplete at 1:4");
    }
}
