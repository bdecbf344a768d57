//! Expression algebra over relational columns and its compilation to
//! vendor-specific SQL.

pub mod compiler;
pub mod sql_fragment;
pub mod tree;

pub use compiler::SqlContext;
pub use sql_fragment::{SqlFragment, SqlPart};
pub use tree::{BinaryOperator, Constant, Expression};
