use std::fmt;

use winnow::error::{ContextError, StrContext};

/// Which lexical situation produced a [`SyntaxError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    /// A recognized token appeared where the grammar does not allow it.
    UnexpectedToken,
    /// A character outside the language's alphabet.
    UnexpectedCharacter,
    /// Input ended while the grammar still expected tokens.
    UnexpectedEof,
}

/// A structured parse failure: kind, 1-based position, a rendered context
/// window with a caret, the terminals acceptable at the failure point, and
/// targeted suggestions.
#[derive(Debug, Clone)]
pub struct SyntaxError {
    kind: SyntaxErrorKind,
    line: usize,
    column: usize,
    description: String,
    context: String,
    expected: Vec<String>,
    suggestions: Vec<String>,
}

/// Characters that can legitimately appear somewhere in an expression.
fn in_alphabet(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || c.is_ascii_whitespace()
        || matches!(
            c,
            '_' | '.' | '/' | '\'' | '"' | '\\' | '+' | '-' | '*' | '(' | ')' | '<' | '>' | '='
                | '!'
        )
}

const RESERVED_KEYWORDS: &[&str] = &["or", "and", "true", "false"];

impl SyntaxError {
    /// Build a structured error from a failed full-input winnow parse.
    pub(crate) fn from_parse_failure(input: &str, offset: usize, inner: &ContextError) -> Self {
        let offset = offset.min(input.len());
        let (line, column) = position_of(input, offset);

        let expected: Vec<String> = inner
            .context()
            .filter_map(|c| match c {
                StrContext::Expected(value) => Some(value.to_string()),
                _ => None,
            })
            .collect();

        let rest = &input[offset..];
        let (kind, description) = if rest.trim().is_empty() {
            (
                SyntaxErrorKind::UnexpectedEof,
                "unexpected end of input".to_owned(),
            )
        } else {
            let ch = rest.chars().next().unwrap_or(' ');
            if in_alphabet(ch) {
                let token: String = rest
                    .chars()
                    .take_while(|c| !c.is_ascii_whitespace())
                    .take(16)
                    .collect();
                (
                    SyntaxErrorKind::UnexpectedToken,
                    format!("unexpected token '{token}'"),
                )
            } else {
                (
                    SyntaxErrorKind::UnexpectedCharacter,
                    format!("unexpected character '{ch}'"),
                )
            }
        };

        let mut suggestions = Vec::new();
        let word: String = rest
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        if RESERVED_KEYWORDS.contains(&word.as_str()) {
            suggestions.push(format!(
                "'{word}' is a reserved keyword - quote it if you meant it as data"
            ));
        }

        Self {
            kind,
            line,
            column,
            description,
            context: context_window(input, line, column),
            expected,
            suggestions,
        }
    }

    /// Failure mode for pathologically nested input; fails closed before the
    /// recursive descent can overflow the stack.
    pub(crate) fn nesting_too_deep(limit: usize) -> Self {
        Self {
            kind: SyntaxErrorKind::UnexpectedToken,
            line: 1,
            column: 1,
            description: format!("expression nesting exceeds {limit} levels"),
            context: String::new(),
            expected: Vec::new(),
            suggestions: vec!["flatten the expression or split it into parts".to_owned()],
        }
    }

    #[must_use]
    pub fn kind(&self) -> SyntaxErrorKind {
        self.kind
    }

    /// Human-readable summary of what went wrong, without position info.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// 1-based line of the failure.
    #[must_use]
    pub fn line(&self) -> usize {
        self.line
    }

    /// 1-based column of the failure.
    #[must_use]
    pub fn column(&self) -> usize {
        self.column
    }

    /// The offending source line with a caret under the failure column.
    #[must_use]
    pub fn context_window(&self) -> &str {
        &self.context
    }

    /// Descriptions of the terminals that would have been acceptable here.
    #[must_use]
    pub fn expected(&self) -> &[String] {
        &self.expected
    }

    /// Targeted hints, e.g. the reserved-keyword warning.
    #[must_use]
    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    /// Symbolic message-template identifier for this error.
    #[must_use]
    pub fn template_key(&self) -> &'static str {
        match self.kind {
            SyntaxErrorKind::UnexpectedToken => "unexpected_token",
            SyntaxErrorKind::UnexpectedCharacter => "unexpected_character",
            SyntaxErrorKind::UnexpectedEof => "unexpected_eof",
        }
    }
}

fn position_of(input: &str, offset: usize) -> (usize, usize) {
    let before = &input[..offset];
    let line = before.matches('\n').count() + 1;
    let column = offset - before.rfind('\n').map_or(0, |i| i + 1) + 1;
    (line, column)
}

fn context_window(input: &str, line: usize, column: usize) -> String {
    let line_text = input.lines().nth(line - 1).unwrap_or("");
    let caret_pad = " ".repeat(column.saturating_sub(1));
    format!("{line_text}\n{caret_pad}^")
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at line {}, column {}",
            self.description, self.line, self.column
        )?;
        if !self.expected.is_empty() {
            write!(f, " (expected {})", self.expected.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for SyntaxError {}
