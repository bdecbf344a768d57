use thiserror::Error;

use crate::relational::RelationalError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum QueryPlannerError {
    #[error("Pattern joins bridges from different databases ('{first}' and '{second}'); this is not supported")]
    CrossDatabaseJoin { first: String, second: String },

    #[error("Pattern expands to {count} candidate combinations, more than the allowed {max}. Make the pattern more specific.")]
    TooManyCombinations { count: usize, max: usize },

    #[error("Relational error: {0}")]
    Relational(RelationalError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl From<RelationalError> for QueryPlannerError {
    fn from(err: RelationalError) -> Self {
        match err {
            RelationalError::DifferentDatabases { first, second } => {
                QueryPlannerError::CrossDatabaseJoin { first, second }
            }
            other => QueryPlannerError::Relational(other),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("Unable to parse {context} at: '{rest}'")]
    Syntax { context: &'static str, rest: String },

    #[error("Unexpected input after {context}: '{rest}'")]
    TrailingInput { context: &'static str, rest: String },

    #[error("Undeclared prefix '{0}:'")]
    UnknownPrefix(String),
}
