//! Read-only graphs over mapped relational data.

pub mod caching_graph;
mod errors;
#[allow(clippy::module_inception)]
pub mod graph;
pub mod mapped_graph;
pub mod triple;

pub use caching_graph::{CacheMetrics, CachingGraph};
pub use errors::GraphError;
pub use graph::Graph;
pub use mapped_graph::MappedGraph;
pub use triple::{Triple, TripleMatch};
