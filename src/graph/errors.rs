use thiserror::Error;

use crate::execution::ExecutionError;
use crate::query_planner::{ParseError, QueryPlannerError};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GraphError {
    #[error("Graph is read-only; '{operation}' is not supported")]
    ReadOnly { operation: &'static str },

    #[error(transparent)]
    Planner(#[from] QueryPlannerError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

impl GraphError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, GraphError::Execution(e) if e.is_cancelled())
    }
}
