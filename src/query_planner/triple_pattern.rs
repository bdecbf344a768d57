use std::fmt;

use crate::node_maker::Node;

/// One slot of a triple pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PatternTerm {
    Variable(String),
    Node(Node),
}

impl PatternTerm {
    pub fn variable(name: impl Into<String>) -> Self {
        PatternTerm::Variable(name.into())
    }

    pub fn as_variable(&self) -> Option<&str> {
        match self {
            PatternTerm::Variable(name) => Some(name),
            PatternTerm::Node(_) => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            PatternTerm::Node(node) => Some(node),
            PatternTerm::Variable(_) => None,
        }
    }

    pub fn is_bound(&self) -> bool {
        matches!(self, PatternTerm::Node(_))
    }
}

impl From<Node> for PatternTerm {
    fn from(node: Node) -> Self {
        PatternTerm::Node(node)
    }
}

impl fmt::Display for PatternTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternTerm::Variable(name) => write!(f, "?{}", name),
            PatternTerm::Node(node) => write!(f, "{}", node),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Position {
    Subject,
    Predicate,
    Object,
}

impl Position {
    pub const ALL: [Position; 3] = [Position::Subject, Position::Predicate, Position::Object];
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Position::Subject => "subject",
            Position::Predicate => "predicate",
            Position::Object => "object",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriplePattern {
    pub subject: PatternTerm,
    pub predicate: PatternTerm,
    pub object: PatternTerm,
}

impl TriplePattern {
    pub fn new(subject: PatternTerm, predicate: PatternTerm, object: PatternTerm) -> Self {
        TriplePattern {
            subject,
            predicate,
            object,
        }
    }

    pub fn term(&self, position: Position) -> &PatternTerm {
        match position {
            Position::Subject => &self.subject,
            Position::Predicate => &self.predicate,
            Position::Object => &self.object,
        }
    }

    /// Variable names in subject, predicate, object order, repeats included.
    pub fn variables(&self) -> impl Iterator<Item = (Position, &str)> {
        Position::ALL
            .into_iter()
            .filter_map(move |p| self.term(p).as_variable().map(|v| (p, v)))
    }
}

impl fmt::Display for TriplePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}
