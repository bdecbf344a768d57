//! Graph pattern translation.
//!
//! A basic graph pattern is matched against the bridges of a mapping: every
//! triple picks the bridges that can produce it, each combination of picks
//! is joined into one relation, and the variables shared between triples
//! become join conditions. The result is a list of [`NodeRelation`]s whose
//! union answers the pattern.

pub mod compatible_relation_group;
mod errors;
pub mod graph_pattern_translator;
pub mod node_relation;
pub mod optimizer;
pub mod parser;
pub mod triple_pattern;
pub mod triple_relation;
pub mod uri_maker_rule;
pub mod variable_constraints;

pub use compatible_relation_group::CompatibleRelationGroup;
pub use errors::{ParseError, QueryPlannerError};
pub use graph_pattern_translator::GraphPatternTranslator;
pub use node_relation::{Binding, NodeRelation};
pub use parser::{parse_filter, parse_patterns, parse_query, ParsedQuery, Prefixes};
pub use triple_pattern::{PatternTerm, Position, TriplePattern};
pub use triple_relation::TripleRelation;
pub use uri_maker_rule::{UriMakerKind, UriMakerRule};
pub use variable_constraints::{join_condition, JoinOutcome, VariableConstraints};
