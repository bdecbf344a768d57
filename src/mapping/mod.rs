//! Declarative mapping of relational tables to triples.
//!
//! A YAML document names the databases, optional translation tables and
//! the bridges; [`Mapping`] compiles it into the [`TripleRelation`]s the
//! translator works with.
//!
//! [`TripleRelation`]: crate::query_planner::TripleRelation

pub mod compiler;
pub mod document;
mod errors;

pub use compiler::Mapping;
pub use document::{
    BridgeDefinition, DatabaseDefinition, JoinDefinition, MappingDocument, NodeMakerDefinition,
    NodeMakerSpec, OuterSide, TermType,
};
pub use errors::MappingError;
