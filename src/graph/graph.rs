use super::errors::GraphError;
use super::triple::{Triple, TripleMatch};

/// A source of triples.
///
/// Implementations are shared between threads; `find` and `contains` may
/// block on database I/O.
#[cfg_attr(test, mockall::automock)]
pub trait Graph: Send + Sync {
    /// Every triple matching `pattern`.
    fn find(&self, pattern: &TripleMatch) -> Result<Vec<Triple>, GraphError>;

    /// Whether at least one triple matches `pattern`.
    fn contains(&self, pattern: &TripleMatch) -> Result<bool, GraphError>;

    fn add(&self, triple: &Triple) -> Result<(), GraphError>;

    fn delete(&self, triple: &Triple) -> Result<(), GraphError>;
}
