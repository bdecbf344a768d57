//! Running generated SQL and turning rows into bindings.

pub mod binding_iterator;
pub mod clickhouse;
pub mod connection;
pub mod diagnostics;
mod errors;
pub mod registry;
pub mod result_row;
pub mod sql_iterator;

pub use binding_iterator::BindingIterator;
pub use clickhouse::ClickHouseConnection;
pub use connection::{DatabaseConnection, RawRow, RowCursor, StatementCanceller, VendorHooks};
pub use diagnostics::{DiagnosticSink, LogSink};
pub use errors::{DatabaseError, ExecutionError};
pub use registry::ConnectionRegistry;
pub use result_row::ResultRow;
pub use sql_iterator::{CancelHandle, IteratorState, SqlIterator};
