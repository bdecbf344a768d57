use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SqlGeneratorError {
    #[error("Cannot build a statement for a relation with no rows")]
    EmptyRelation,

    #[error("A single-row relation without tables has no statement")]
    TrivialRelation,
}
