mod context;
mod expr;
mod value;

pub use context::Context;
pub(crate) use context::{json_type_name, DATETIME_KEY};
pub use expr::{CompareOp, Expr, TimeUnit};
pub use value::Value;
