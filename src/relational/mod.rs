//! Relational algebra core: qualified names, aliases, joins and the
//! immutable [`Relation`] value the translator builds SQL from.

pub mod alias_map;
pub mod attribute;
pub mod column_renamer;
pub mod database;
pub mod errors;
pub mod join;
pub mod projection;
pub mod relation;
pub mod relation_builder;

pub use alias_map::AliasMap;
pub use attribute::{Attribute, RelationName};
pub use column_renamer::{ColumnRenamer, ColumnRenamerMap, IdentityRenamer};
pub use database::DatabaseHandle;
pub use errors::RelationalError;
pub use join::{Join, JoinDirection};
pub use projection::{OrderSpec, ProjectionSpec};
pub use relation::{Relation, RelationData};
pub use relation_builder::RelationBuilder;
