//! Filter handling for translated graph patterns.
//!
//! Filters are normalised to conjunctive form, pushed into the SQL of each
//! node relation where the node makers allow it, and evaluated on the
//! produced bindings otherwise.

pub mod cnf;
pub mod filter_eval;
pub mod filter_expr;
pub mod filter_pushdown;

pub use cnf::{conjuncts, to_cnf};
pub use filter_eval::{evaluate, evaluate_all};
pub use filter_expr::{ArithmeticOp, CompareOp, FilterExpr};
pub use filter_pushdown::{push_down, PushedFilter};
