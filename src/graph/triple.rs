use std::fmt;

use crate::node_maker::Node;
use crate::query_planner::{PatternTerm, TriplePattern};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Triple {
    pub subject: Node,
    pub predicate: Node,
    pub object: Node,
}

impl Triple {
    pub fn new(subject: Node, predicate: Node, object: Node) -> Self {
        Triple {
            subject,
            predicate,
            object,
        }
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}

/// A triple with optional terms; `None` matches anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TripleMatch {
    pub subject: Option<Node>,
    pub predicate: Option<Node>,
    pub object: Option<Node>,
}

impl TripleMatch {
    pub const SUBJECT: &'static str = "s";
    pub const PREDICATE: &'static str = "p";
    pub const OBJECT: &'static str = "o";

    pub fn new(subject: Option<Node>, predicate: Option<Node>, object: Option<Node>) -> Self {
        TripleMatch {
            subject,
            predicate,
            object,
        }
    }

    pub fn any() -> Self {
        Self::default()
    }

    /// The one-triple pattern with `?s`, `?p` and `?o` for open terms.
    pub fn to_pattern(&self) -> TriplePattern {
        let term = |node: &Option<Node>, variable: &str| match node {
            Some(node) => PatternTerm::Node(node.clone()),
            None => PatternTerm::variable(variable),
        };
        TriplePattern::new(
            term(&self.subject, Self::SUBJECT),
            term(&self.predicate, Self::PREDICATE),
            term(&self.object, Self::OBJECT),
        )
    }

    pub fn matches(&self, triple: &Triple) -> bool {
        let accepts = |wanted: &Option<Node>, actual: &Node| wanted.as_ref().is_none_or(|w| w == actual);
        accepts(&self.subject, &triple.subject)
            && accepts(&self.predicate, &triple.predicate)
            && accepts(&self.object, &triple.object)
    }
}

impl From<&Triple> for TripleMatch {
    fn from(triple: &Triple) -> Self {
        TripleMatch::new(
            Some(triple.subject.clone()),
            Some(triple.predicate.clone()),
            Some(triple.object.clone()),
        )
    }
}

impl fmt::Display for TripleMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_pattern())
    }
}
