//! Command-line expression evaluator.
//!
//! Evaluates a single expression against an optional JSON context and
//! prints the result, e.g.:
//!
//! ```text
//! dilemma "user.age >= 18" --context '{"user": {"age": 21}}'
//! ```

use std::process::exit;

use clap::Parser;
use dilemma::{evaluate, Context, MessageTemplates};

/// Evaluate a dilemma expression.
#[derive(Debug, Parser)]
#[command(name = "dilemma")]
#[command(about = "Evaluate a dilemma expression against a JSON context", long_about = None)]
#[command(version)]
struct Cli {
    /// The expression to evaluate
    expression: String,

    /// JSON object supplying variable values
    #[arg(short, long, default_value = "{}")]
    context: String,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .with_writer(std::io::stderr)
        .init();

    let templates = MessageTemplates::default();

    let ctx = match Context::from_json(&cli.context) {
        Ok(ctx) => ctx,
        Err(err) => {
            eprintln!("{}", templates.render(&err));
            exit(1);
        }
    };

    match evaluate(&cli.expression, &ctx) {
        Ok(value) => println!("{value}"),
        Err(err) => {
            eprintln!("{}", templates.render(&err));
            exit(1);
        }
    }
}
