//! Codecs between database values and graph terms.
//!
//! A [`ValueMaker`] turns a result row into a string and a string back into
//! a condition on rows. A [`NodeMaker`] adds the term kind on top, turning
//! those strings into URIs, blank nodes or literals.

pub mod blank_node_id;
pub mod description;
pub mod errors;
pub mod node;
#[allow(clippy::module_inception)]
pub mod node_maker;
pub mod node_type;
pub mod pattern;
pub mod translation_table;
pub mod value_constraint;
pub mod value_maker;

pub use blank_node_id::BlankNodeId;
pub use description::{NodeDescription, ValueDescription, ValueShape};
pub use errors::NodeMakerError;
pub use node::{Literal, Node};
pub use node_maker::{NodeMaker, TypedNodeMaker};
pub use node_type::NodeType;
pub use pattern::{ColumnFunction, Pattern};
pub use translation_table::TranslationTable;
pub use value_constraint::{ValueConstraint, ValueRegex};
pub use value_maker::{RowValues, ValueDecorator, ValueMaker};
