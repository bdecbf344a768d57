use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RelationalError {
    #[error("Invalid relation name '{0}' (expected table or schema.table)")]
    InvalidRelationName(String),

    #[error("Invalid attribute '{0}' (expected table.column or schema.table.column)")]
    InvalidAttribute(String),

    #[error("Invalid alias declaration '{0}' (expected 'table AS alias')")]
    InvalidAlias(String),

    #[error("Alias '{alias}' is declared for both '{first}' and '{second}'")]
    ConflictingAlias {
        alias: String,
        first: String,
        second: String,
    },

    #[error("Join sides have different lengths ({left} vs {right} attributes)")]
    JoinArityMismatch { left: usize, right: usize },

    #[error("Join side mixes columns of several tables: {0}")]
    MixedJoinTables(String),

    #[error("Join must name at least one column pair")]
    EmptyJoin,

    #[error("Cannot combine relations from different databases '{first}' and '{second}'")]
    DifferentDatabases { first: String, second: String },
}
