use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum NodeMakerError {
    #[error("Pattern '{0}' has an unterminated @@ placeholder")]
    UnbalancedPattern(String),

    #[error("Invalid pattern '{0}': {1}")]
    InvalidPattern(String, String),

    #[error("Unknown column function '{0}' (expected urlencode, urlify or encode)")]
    UnknownColumnFunction(String),

    #[error("Invalid regular expression '{0}': {1}")]
    InvalidRegex(String, String),

    #[error("Translation table '{table}' maps '{value}' more than once")]
    AmbiguousTranslation { table: String, value: String },
}
