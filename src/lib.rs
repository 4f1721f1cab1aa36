mod compiled;
mod dates;
mod error;
mod evaluate;
mod lookup;
mod messages;
mod parse;
mod types;

pub use compiled::{CompiledExpression, compile, create_optimized_evaluator};
pub use error::DilemmaError;
pub use evaluate::evaluate;
pub use messages::MessageTemplates;
pub use parse::{SyntaxError, SyntaxErrorKind};
pub use types::{CompareOp, Context, Expr, TimeUnit, Value};
