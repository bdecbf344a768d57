use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use regex::Regex;

use super::errors::NodeMakerError;

/// A compiled regular expression compared by its source text.
#[derive(Debug, Clone)]
pub struct ValueRegex(Regex);

impl ValueRegex {
    pub fn new(pattern: &str) -> Result<Self, NodeMakerError> {
        Regex::new(pattern)
            .map(ValueRegex)
            .map_err(|e| NodeMakerError::InvalidRegex(pattern.to_string(), e.to_string()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.0.is_match(value)
    }
}

impl PartialEq for ValueRegex {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for ValueRegex {}

impl Hash for ValueRegex {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl PartialOrd for ValueRegex {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ValueRegex {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

/// Restriction on the values a node maker can produce.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueConstraint {
    MaxLength(usize),
    Contains(String),
    Regex(ValueRegex),
}

impl ValueConstraint {
    pub fn matches(&self, value: &str) -> bool {
        match self {
            ValueConstraint::MaxLength(max) => value.chars().count() <= *max,
            ValueConstraint::Contains(needle) => value.contains(needle.as_str()),
            ValueConstraint::Regex(regex) => regex.is_match(value),
        }
    }
}

impl fmt::Display for ValueConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueConstraint::MaxLength(n) => write!(f, "maxLength({})", n),
            ValueConstraint::Contains(s) => write!(f, "contains('{}')", s),
            ValueConstraint::Regex(r) => write!(f, "regex('{}')", r.as_str()),
        }
    }
}
