use thiserror::Error;

use crate::sql_generator::SqlGeneratorError;

/// Failures reported by a database connection or cursor.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Statement failed: {0}")]
    Statement(String),

    #[error("Fetching a row failed: {0}")]
    Fetch(String),

    #[error("Closing the cursor failed: {0}")]
    Close(String),

    #[error("Statement was interrupted")]
    Interrupted,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExecutionError {
    #[error("Database error for SQL '{sql}': {source}")]
    Database {
        sql: String,
        #[source]
        source: DatabaseError,
    },

    #[error("Query was cancelled: {sql}")]
    Cancelled { sql: String },

    #[error("No connection registered for database '{0}'")]
    UnknownDatabase(String),

    #[error("Row has {actual} value(s) but the statement selects {expected} column(s): {sql}")]
    ColumnCount {
        sql: String,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    SqlGenerator(#[from] SqlGeneratorError),
}

impl ExecutionError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExecutionError::Cancelled { .. })
    }
}
