use std::collections::BTreeSet;

use super::alias_map::AliasMap;
use super::attribute::{Attribute, RelationName};
use super::column_renamer::ColumnRenamer;
use super::database::DatabaseHandle;
use super::errors::RelationalError;
use super::join::Join;
use super::projection::{OrderSpec, ProjectionSpec};
use super::relation_builder::RelationBuilder;
use crate::expression::Expression;

static NO_ALIASES: AliasMap = AliasMap::empty();
static NO_JOINS: BTreeSet<Join> = BTreeSet::new();
static NO_PROJECTIONS: BTreeSet<ProjectionSpec> = BTreeSet::new();
static TRUE_CONDITION: Expression = Expression::True;
static FALSE_CONDITION: Expression = Expression::False;

/// A set of rows described relationally.
///
/// `Empty` has no rows and never reaches the database. `True` has exactly
/// one row with no columns; it is the result of translating an empty
/// pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Relation {
    Empty,
    True,
    Rows(RelationData),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationData {
    pub(crate) database: DatabaseHandle,
    pub(crate) aliases: AliasMap,
    pub(crate) condition: Expression,
    /// Carried through every operation but never rendered.
    pub(crate) soft_condition: Expression,
    pub(crate) joins: BTreeSet<Join>,
    pub(crate) projections: BTreeSet<ProjectionSpec>,
    pub(crate) unique: bool,
    pub(crate) order: Vec<OrderSpec>,
    pub(crate) limit: Option<u64>,
    pub(crate) limit_inverse: Option<u64>,
}

impl Relation {
    /// An unconstrained relation over `database`, to be filled in through
    /// a [`RelationBuilder`].
    pub fn builder(database: DatabaseHandle) -> RelationBuilder {
        RelationBuilder::new(database)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Relation::Empty)
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Relation::True)
    }

    pub fn data(&self) -> Option<&RelationData> {
        match self {
            Relation::Rows(data) => Some(data),
            _ => None,
        }
    }

    pub fn database(&self) -> Option<&DatabaseHandle> {
        self.data().map(|d| &d.database)
    }

    pub fn aliases(&self) -> &AliasMap {
        self.data().map(|d| &d.aliases).unwrap_or(&NO_ALIASES)
    }

    pub fn condition(&self) -> &Expression {
        match self {
            Relation::Empty => &FALSE_CONDITION,
            Relation::True => &TRUE_CONDITION,
            Relation::Rows(d) => &d.condition,
        }
    }

    pub fn soft_condition(&self) -> &Expression {
        self.data().map(|d| &d.soft_condition).unwrap_or(&TRUE_CONDITION)
    }

    pub fn joins(&self) -> &BTreeSet<Join> {
        self.data().map(|d| &d.joins).unwrap_or(&NO_JOINS)
    }

    pub fn projections(&self) -> &BTreeSet<ProjectionSpec> {
        self.data().map(|d| &d.projections).unwrap_or(&NO_PROJECTIONS)
    }

    pub fn is_unique(&self) -> bool {
        self.data().map(|d| d.unique).unwrap_or(true)
    }

    pub fn order(&self) -> &[OrderSpec] {
        self.data().map(|d| d.order.as_slice()).unwrap_or(&[])
    }

    pub fn limit(&self) -> Option<u64> {
        self.data().and_then(|d| d.limit)
    }

    pub fn limit_inverse(&self) -> Option<u64> {
        self.data().and_then(|d| d.limit_inverse)
    }

    /// Conjoins `expression` to the condition.
    pub fn select(&self, expression: &Expression) -> Relation {
        if expression.is_false() {
            return Relation::Empty;
        }
        if expression.is_true() {
            return self.clone();
        }
        match self {
            Relation::Empty => Relation::Empty,
            // A one-row relation has no columns to constrain
            Relation::True => Relation::True,
            Relation::Rows(_) => {
                let mut builder = RelationBuilder::from_relation(self);
                builder.add_condition(expression.clone());
                builder.freeze()
            }
        }
    }

    /// Keeps only the projections also present in `projections`.
    pub fn project(&self, projections: &BTreeSet<ProjectionSpec>) -> Relation {
        match self {
            Relation::Rows(data) => {
                let mut data = data.clone();
                data.projections = data.projections.intersection(projections).cloned().collect();
                Relation::Rows(data)
            }
            other => other.clone(),
        }
    }

    pub fn rename_columns(&self, renamer: &dyn ColumnRenamer) -> Relation {
        match self {
            Relation::Rows(data) => Relation::Rows(RelationData {
                database: data.database.clone(),
                aliases: renamer.apply_to_alias_map(&data.aliases),
                condition: data.condition.rename(renamer),
                soft_condition: data.soft_condition.rename(renamer),
                joins: data.joins.iter().map(|j| j.rename(renamer)).collect(),
                projections: data.projections.iter().map(|p| p.rename(renamer)).collect(),
                unique: data.unique,
                order: data.order.iter().map(|o| o.rename(renamer)).collect(),
                limit: data.limit,
                limit_inverse: data.limit_inverse,
            }),
            other => other.clone(),
        }
    }

    /// Every table name the relation refers to, aliases included.
    pub fn tables(&self) -> BTreeSet<RelationName> {
        let mut tables: BTreeSet<RelationName> =
            self.aliases().iter().map(|(alias, _)| alias.clone()).collect();
        for join in self.joins() {
            tables.insert(join.table1().clone());
            tables.insert(join.table2().clone());
        }
        tables.extend(
            self.referenced_attributes()
                .into_iter()
                .map(|a| a.relation_name().clone()),
        );
        tables
    }

    fn referenced_attributes(&self) -> BTreeSet<Attribute> {
        let mut attributes = self.condition().attributes();
        for projection in self.projections() {
            attributes.extend(projection.required_attributes());
        }
        for order in self.order() {
            attributes.extend(order.expression.attributes());
        }
        attributes
    }

    /// Combines relations over disjoint tables of one database into their
    /// cross product, restricted by all of their conditions and joins.
    pub fn join_all(relations: &[Relation]) -> Result<Relation, RelationalError> {
        if relations.iter().any(Relation::is_empty) {
            return Ok(Relation::Empty);
        }
        let mut parts = relations.iter().filter_map(Relation::data);
        let first = match parts.next() {
            Some(first) => first,
            None => return Ok(Relation::True),
        };

        let mut builder = RelationBuilder::from_data(first.clone());
        for data in parts {
            if data.database != first.database {
                return Err(RelationalError::DifferentDatabases {
                    first: first.database.name().to_string(),
                    second: data.database.name().to_string(),
                });
            }
            builder.add_aliases(&data.aliases)?;
            builder.add_condition(data.condition.clone());
            builder.add_soft_condition(data.soft_condition.clone());
            builder.add_joins(data.joins.iter().cloned());
            builder.add_projections(data.projections.iter().cloned());
            builder.add_order(data.order.iter().cloned());
            builder.restrict_unique(data.unique);
            builder.restrict_limit(data.limit);
            builder.restrict_limit_inverse(data.limit_inverse);
        }
        Ok(builder.freeze())
    }
}
