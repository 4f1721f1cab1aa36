use winnow::ascii::dec_int;
use winnow::combinator::{alt, cut_err, delimited, not, opt, preceded, repeat, terminated};
use winnow::error::{ContextError, ErrMode, ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{any, one_of, take_while};

use crate::types::{CompareOp, Expr, TimeUnit};

// -- Whitespace & identifiers -----------------------------------------------

fn ws(input: &mut &str) -> ModalResult<()> {
    take_while(0.., |c: char| c.is_ascii_whitespace())
        .void()
        .parse_next(input)
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn ident<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        take_while(1.., |c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., is_ident_char),
    )
        .take()
        .parse_next(input)
}

/// Match a keyword with a word boundary, so `or` never matches inside `orbit`.
fn kw<'i>(word: &'static str) -> impl Parser<&'i str, &'i str, ErrMode<ContextError>> {
    terminated(word, not(one_of(is_ident_char)))
}

// -- Literals ---------------------------------------------------------------

fn string_literal(input: &mut &str) -> ModalResult<String> {
    let quote = one_of(['\'', '"']).parse_next(input)?;
    let mut s = String::new();
    loop {
        let ch = any.parse_next(input)?;
        match ch {
            c if c == quote => return Ok(s),
            '\\' => {
                let esc = any.parse_next(input)?;
                match esc {
                    'n' => s.push('\n'),
                    't' => s.push('\t'),
                    'r' => s.push('\r'),
                    '\\' => s.push('\\'),
                    '\'' => s.push('\''),
                    '"' => s.push('"'),
                    other => {
                        s.push('\\');
                        s.push(other);
                    }
                }
            }
            c => s.push(c),
        }
    }
}

fn exponent<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        one_of(['e', 'E']),
        opt(one_of(['+', '-'])),
        take_while(1.., |c: char| c.is_ascii_digit()),
    )
        .take()
        .parse_next(input)
}

/// Floats require a decimal point or an exponent; plain digits are integers.
fn float_literal(input: &mut &str) -> ModalResult<f64> {
    alt((
        (
            take_while(1.., |c: char| c.is_ascii_digit()),
            '.',
            take_while(1.., |c: char| c.is_ascii_digit()),
            opt(exponent),
        )
            .take(),
        (take_while(1.., |c: char| c.is_ascii_digit()), exponent).take(),
    ))
    .try_map(str::parse::<f64>)
    .parse_next(input)
}

fn bool_literal(input: &mut &str) -> ModalResult<bool> {
    alt((
        kw("true").value(true),
        kw("True").value(true),
        kw("false").value(false),
        kw("False").value(false),
    ))
    .parse_next(input)
}

// -- Variable paths ---------------------------------------------------------

const RESERVED: &[&str] = &["or", "and", "true", "false", "True", "False"];

fn path_segment<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    take_while(1.., is_ident_char).parse_next(input)
}

/// An identifier-led path token: dotted (`a.b.c`), REST-style (`/a/b/0`,
/// leading slash optional), or possessive sugar (`user's name`). Reserved
/// keywords are excluded so `and`/`or` always parse as operators.
fn variable(input: &mut &str) -> ModalResult<Expr> {
    let path = (
        opt('/'),
        ident,
        repeat::<_, _, (), _, _>(
            0..,
            alt((
                ('/', path_segment).void(),
                ('.', ident).void(),
                ("'s ", ident).void(),
            )),
        ),
    )
        .take()
        .parse_next(input)?;

    let lead = path.trim_start_matches('/');
    let first = lead.split(['/', '.']).next().unwrap_or(lead);
    if RESERVED.contains(&first) {
        return Err(ErrMode::from_input(input));
    }
    Ok(Expr::Variable(path.to_owned()))
}

// -- Expressions ------------------------------------------------------------
// Precedence, low to high: or, and, comparison (single, non-associative),
// additive, multiplicative, unary minus, primary.

fn primary(input: &mut &str) -> ModalResult<Expr> {
    ws.parse_next(input)?;
    alt((
        delimited('(', expr, (ws, ')')),
        string_literal.map(Expr::Str),
        bool_literal.map(Expr::Bool),
        float_literal.map(Expr::Float),
        dec_int::<_, i64, _>.map(Expr::Int),
        variable,
    ))
    .context(StrContext::Expected(StrContextValue::Description(
        "expression",
    )))
    .parse_next(input)
}

fn unary(input: &mut &str) -> ModalResult<Expr> {
    ws.parse_next(input)?;
    // Iterative so a run of minus signs cannot recurse.
    let signs: Vec<char> = repeat(0.., terminated('-', ws)).parse_next(input)?;
    let mut e = primary(input)?;
    for _ in signs {
        e = Expr::Neg(Box::new(e));
    }
    Ok(e)
}

fn product(input: &mut &str) -> ModalResult<Expr> {
    let first = unary(input)?;
    let rest: Vec<(char, Expr)> = repeat(
        0..,
        (preceded(ws, one_of(['*', '/'])), cut_err(unary)),
    )
    .parse_next(input)?;
    Ok(rest.into_iter().fold(first, |acc, (op, rhs)| match op {
        '*' => Expr::Mul(Box::new(acc), Box::new(rhs)),
        _ => Expr::Div(Box::new(acc), Box::new(rhs)),
    }))
}

fn sum(input: &mut &str) -> ModalResult<Expr> {
    let first = product(input)?;
    let rest: Vec<(char, Expr)> = repeat(
        0..,
        (preceded(ws, one_of(['+', '-'])), cut_err(product)),
    )
    .parse_next(input)?;
    Ok(rest.into_iter().fold(first, |acc, (op, rhs)| match op {
        '+' => Expr::Add(Box::new(acc), Box::new(rhs)),
        _ => Expr::Sub(Box::new(acc), Box::new(rhs)),
    }))
}

/// Predicate amounts are bare digit runs; a signed amount is a syntax error.
fn amount(input: &mut &str) -> ModalResult<i64> {
    take_while(1.., |c: char| c.is_ascii_digit())
        .try_map(str::parse::<i64>)
        .context(StrContext::Expected(StrContextValue::Description(
            "amount",
        )))
        .parse_next(input)
}

fn time_unit(input: &mut &str) -> ModalResult<TimeUnit> {
    alt((
        kw("minutes").value(TimeUnit::Minute),
        kw("minute").value(TimeUnit::Minute),
        kw("hours").value(TimeUnit::Hour),
        kw("hour").value(TimeUnit::Hour),
        kw("days").value(TimeUnit::Day),
        kw("day").value(TimeUnit::Day),
        kw("weeks").value(TimeUnit::Week),
        kw("week").value(TimeUnit::Week),
        kw("months").value(TimeUnit::Month),
        kw("month").value(TimeUnit::Month),
        kw("years").value(TimeUnit::Year),
        kw("year").value(TimeUnit::Year),
    ))
    .context(StrContext::Expected(StrContextValue::Description(
        "time unit",
    )))
    .parse_next(input)
}

#[derive(Clone)]
enum ComparisonTail {
    Cmp(CompareOp, Expr),
    In(Expr),
    Contains(Expr),
    IsPast,
    IsFuture,
    IsToday,
    Within(i64, TimeUnit),
    OlderThan(i64, TimeUnit),
    Before(Expr),
    After(Expr),
    SameDayAs(Expr),
}

fn compare_op(input: &mut &str) -> ModalResult<CompareOp> {
    alt((
        "==".value(CompareOp::Eq),
        "!=".value(CompareOp::Neq),
        "<=".value(CompareOp::Lte),
        ">=".value(CompareOp::Gte),
        "<".value(CompareOp::Lt),
        ">".value(CompareOp::Gt),
    ))
    .parse_next(input)
}

fn comparison_tail(input: &mut &str) -> ModalResult<ComparisonTail> {
    alt((
        (compare_op, cut_err(sum)).map(|(op, rhs)| ComparisonTail::Cmp(op, rhs)),
        preceded(kw("in"), cut_err(sum)).map(ComparisonTail::In),
        preceded(kw("contains"), cut_err(sum)).map(ComparisonTail::Contains),
        preceded(
            (kw("is"), ws),
            cut_err(alt((
                kw("past").value(ComparisonTail::IsPast),
                kw("future").value(ComparisonTail::IsFuture),
                kw("today").value(ComparisonTail::IsToday),
            )))
            .context(StrContext::Expected(StrContextValue::Description(
                "past, future, or today",
            ))),
        ),
        preceded(
            kw("within"),
            cut_err((preceded(ws, amount), preceded(ws, time_unit))),
        )
        .map(|(n, unit)| ComparisonTail::Within(n, unit)),
        preceded(
            (kw("older"), ws),
            cut_err((
                kw("than"),
                preceded(ws, amount),
                preceded(ws, time_unit),
            ))
            .context(StrContext::Expected(StrContextValue::Description(
                "than <amount> <unit>",
            ))),
        )
        .map(|(_, n, unit)| ComparisonTail::OlderThan(n, unit)),
        preceded(kw("before"), cut_err(sum)).map(ComparisonTail::Before),
        preceded(kw("after"), cut_err(sum)).map(ComparisonTail::After),
        preceded(kw("same_day_as"), cut_err(sum)).map(ComparisonTail::SameDayAs),
    ))
    .parse_next(input)
}

/// Comparison level: a single, non-associative operator between two sums,
/// or a bare sum.
fn comparison(input: &mut &str) -> ModalResult<Expr> {
    let left = sum(input)?;
    match opt(preceded(ws, comparison_tail)).parse_next(input)? {
        None => Ok(left),
        Some(tail) => {
            let left = Box::new(left);
            Ok(match tail {
                ComparisonTail::Cmp(op, rhs) => Expr::Compare {
                    op,
                    left,
                    right: Box::new(rhs),
                },
                ComparisonTail::In(container) => Expr::In(left, Box::new(container)),
                ComparisonTail::Contains(item) => Expr::Contains(left, Box::new(item)),
                ComparisonTail::IsPast => Expr::IsPast(left),
                ComparisonTail::IsFuture => Expr::IsFuture(left),
                ComparisonTail::IsToday => Expr::IsToday(left),
                ComparisonTail::Within(amount, unit) => Expr::Within {
                    date: left,
                    amount,
                    unit,
                },
                ComparisonTail::OlderThan(amount, unit) => Expr::OlderThan {
                    date: left,
                    amount,
                    unit,
                },
                ComparisonTail::Before(rhs) => Expr::Before(left, Box::new(rhs)),
                ComparisonTail::After(rhs) => Expr::After(left, Box::new(rhs)),
                ComparisonTail::SameDayAs(rhs) => Expr::SameDayAs(left, Box::new(rhs)),
            })
        }
    }
}

fn and_expr(input: &mut &str) -> ModalResult<Expr> {
    let first = comparison(input)?;
    let rest: Vec<Expr> =
        repeat(0.., preceded((ws, kw("and")), cut_err(comparison))).parse_next(input)?;
    Ok(rest
        .into_iter()
        .fold(first, |acc, r| Expr::And(Box::new(acc), Box::new(r))))
}

fn or_expr(input: &mut &str) -> ModalResult<Expr> {
    let first = and_expr(input)?;
    let rest: Vec<Expr> =
        repeat(0.., preceded((ws, kw("or")), cut_err(and_expr))).parse_next(input)?;
    Ok(rest
        .into_iter()
        .fold(first, |acc, r| Expr::Or(Box::new(acc), Box::new(r))))
}

fn expr(input: &mut &str) -> ModalResult<Expr> {
    ws.parse_next(input)?;
    or_expr(input)
}

// -- Top-level parser -------------------------------------------------------

pub(crate) fn expression(input: &mut &str) -> ModalResult<Expr> {
    let e = expr(input)?;
    ws.parse_next(input)?;
    Ok(e)
}
