use std::fmt;

/// Comparison operators at the (non-associative) comparison precedence level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// Time units accepted by the `within` and `older than` predicates.
///
/// Month and year are fixed-length approximations (30 and 365 days). This is
/// deliberate and part of the language contract: `d within 1 month` means
/// "within 2,592,000 seconds", not calendar arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl TimeUnit {
    /// Length of one unit in seconds.
    #[must_use]
    pub fn seconds(self) -> i64 {
        match self {
            TimeUnit::Minute => 60,
            TimeUnit::Hour => 3_600,
            TimeUnit::Day => 86_400,
            TimeUnit::Week => 7 * 86_400,
            TimeUnit::Month => 30 * 86_400,
            TimeUnit::Year => 365 * 86_400,
        }
    }
}

/// Parsed expression tree. One variant per grammar rule, so the evaluator's
/// exhaustive match statically covers every construct the parser can produce.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    /// A variable path token, dotted (`a.b.c`) or REST-style (`/a/b/0`),
    /// resolved against the context at evaluation time.
    Variable(String),
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    /// `item in container`
    In(Box<Expr>, Box<Expr>),
    /// `container contains item`
    Contains(Box<Expr>, Box<Expr>),
    IsPast(Box<Expr>),
    IsFuture(Box<Expr>),
    IsToday(Box<Expr>),
    Within {
        date: Box<Expr>,
        amount: i64,
        unit: TimeUnit,
    },
    OlderThan {
        date: Box<Expr>,
        amount: i64,
        unit: TimeUnit,
    },
    Before(Box<Expr>, Box<Expr>),
    After(Box<Expr>, Box<Expr>),
    SameDayAs(Box<Expr>, Box<Expr>),
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::Eq => write!(f, "=="),
            CompareOp::Neq => write!(f, "!="),
            CompareOp::Gt => write!(f, ">"),
            CompareOp::Gte => write!(f, ">="),
            CompareOp::Lt => write!(f, "<"),
            CompareOp::Lte => write!(f, "<="),
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeUnit::Minute => write!(f, "minute"),
            TimeUnit::Hour => write!(f, "hour"),
            TimeUnit::Day => write!(f, "day"),
            TimeUnit::Week => write!(f, "week"),
            TimeUnit::Month => write!(f, "month"),
            TimeUnit::Year => write!(f, "year"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Int(v) => write!(f, "{v}"),
            Expr::Float(v) => write!(f, "{v}"),
            Expr::Bool(v) => write!(f, "{v}"),
            Expr::Str(s) => write!(f, "'{s}'"),
            Expr::Variable(path) => write!(f, "{path}"),
            Expr::Neg(inner) => write!(f, "(-{inner})"),
            Expr::Add(a, b) => write!(f, "({a} + {b})"),
            Expr::Sub(a, b) => write!(f, "({a} - {b})"),
            Expr::Mul(a, b) => write!(f, "({a} * {b})"),
            Expr::Div(a, b) => write!(f, "({a} / {b})"),
            Expr::Compare { op, left, right } => write!(f, "({left} {op} {right})"),
            Expr::And(a, b) => write!(f, "({a} and {b})"),
            Expr::Or(a, b) => write!(f, "({a} or {b})"),
            Expr::In(item, container) => write!(f, "({item} in {container})"),
            Expr::Contains(container, item) => write!(f, "({container} contains {item})"),
            Expr::IsPast(d) => write!(f, "({d} is past)"),
            Expr::IsFuture(d) => write!(f, "({d} is future)"),
            Expr::IsToday(d) => write!(f, "({d} is today)"),
            Expr::Within { date, amount, unit } => write!(f, "({date} within {amount} {unit}s)"),
            Expr::OlderThan { date, amount, unit } => {
                write!(f, "({date} older than {amount} {unit}s)")
            }
            Expr::Before(a, b) => write!(f, "({a} before {b})"),
            Expr::After(a, b) => write!(f, "({a} after {b})"),
            Expr::SameDayAs(a, b) => write!(f, "({a} same_day_as {b})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_seconds() {
        assert_eq!(TimeUnit::Minute.seconds(), 60);
        assert_eq!(TimeUnit::Hour.seconds(), 3600);
        assert_eq!(TimeUnit::Day.seconds(), 86400);
        assert_eq!(TimeUnit::Week.seconds(), 604_800);
        assert_eq!(TimeUnit::Month.seconds(), 2_592_000);
        assert_eq!(TimeUnit::Year.seconds(), 31_536_000);
    }

    #[test]
    fn display_arithmetic() {
        let expr = Expr::Add(
            Box::new(Expr::Int(2)),
            Box::new(Expr::Mul(Box::new(Expr::Int(3)), Box::new(Expr::Int(4)))),
        );
        assert_eq!(expr.to_string(), "(2 + (3 * 4))");
    }

    #[test]
    fn display_date_predicate() {
        let expr = Expr::Within {
            date: Box::new(Expr::Variable("d".to_owned())),
            amount: 2,
            unit: TimeUnit::Day,
        };
        assert_eq!(expr.to_string(), "(d within 2 days)");
    }

    #[test]
    fn display_compare_ops() {
        let ops = [
            (CompareOp::Eq, "=="),
            (CompareOp::Neq, "!="),
            (CompareOp::Gt, ">"),
            (CompareOp::Gte, ">="),
            (CompareOp::Lt, "<"),
            (CompareOp::Lte, "<="),
        ];
        for (op, sym) in ops {
            assert_eq!(op.to_string(), sym);
        }
    }
}
