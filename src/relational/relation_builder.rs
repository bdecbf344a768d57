use std::collections::BTreeSet;

use super::alias_map::AliasMap;
use super::column_renamer::ColumnRenamer;
use super::database::DatabaseHandle;
use super::errors::RelationalError;
use super::join::Join;
use super::projection::{OrderSpec, ProjectionSpec};
use super::relation::{Relation, RelationData};
use crate::expression::Expression;

/// Mutable accumulator for a [`Relation`] under construction.
///
/// Node makers push their constraints into a builder while a triple is
/// being matched; [`RelationBuilder::freeze`] turns the result back into an
/// immutable relation.
#[derive(Debug, Clone)]
pub struct RelationBuilder {
    base: Option<RelationData>,
    conditions: Vec<Expression>,
    soft_conditions: Vec<Expression>,
}

impl RelationBuilder {
    pub fn new(database: DatabaseHandle) -> Self {
        Self::from_data(RelationData {
            database,
            aliases: AliasMap::empty(),
            condition: Expression::True,
            soft_condition: Expression::True,
            joins: BTreeSet::new(),
            projections: BTreeSet::new(),
            unique: false,
            order: Vec::new(),
            limit: None,
            limit_inverse: None,
        })
    }

    pub(crate) fn from_data(data: RelationData) -> Self {
        RelationBuilder {
            base: Some(data),
            conditions: Vec::new(),
            soft_conditions: Vec::new(),
        }
    }

    /// Starts from an existing relation. `Empty` stays empty whatever is
    /// added; `True` has no database and only accepts conditions.
    pub fn from_relation(relation: &Relation) -> Self {
        match relation {
            Relation::Rows(data) => Self::from_data(data.clone()),
            Relation::Empty => RelationBuilder {
                base: None,
                conditions: vec![Expression::False],
                soft_conditions: Vec::new(),
            },
            Relation::True => RelationBuilder {
                base: None,
                conditions: Vec::new(),
                soft_conditions: Vec::new(),
            },
        }
    }

    pub fn add_condition(&mut self, condition: Expression) {
        if !condition.is_true() {
            self.conditions.push(condition);
        }
    }

    pub fn add_soft_condition(&mut self, condition: Expression) {
        if !condition.is_true() {
            self.soft_conditions.push(condition);
        }
    }

    pub fn is_known_empty(&self) -> bool {
        self.conditions.iter().any(Expression::is_false)
    }

    pub fn add_aliases(&mut self, aliases: &AliasMap) -> Result<(), RelationalError> {
        if let Some(base) = &mut self.base {
            base.aliases = base.aliases.union(aliases)?;
        }
        Ok(())
    }

    pub fn add_join(&mut self, join: Join) {
        if let Some(base) = &mut self.base {
            base.joins.insert(join);
        }
    }

    pub fn add_joins(&mut self, joins: impl IntoIterator<Item = Join>) {
        for join in joins {
            self.add_join(join);
        }
    }

    pub fn add_projection(&mut self, projection: ProjectionSpec) {
        if let Some(base) = &mut self.base {
            base.projections.insert(projection);
        }
    }

    pub fn add_projections(&mut self, projections: impl IntoIterator<Item = ProjectionSpec>) {
        for projection in projections {
            self.add_projection(projection);
        }
    }

    pub fn set_projections(&mut self, projections: BTreeSet<ProjectionSpec>) {
        if let Some(base) = &mut self.base {
            base.projections = projections;
        }
    }

    pub fn add_order(&mut self, order: impl IntoIterator<Item = OrderSpec>) {
        if let Some(base) = &mut self.base {
            base.order.extend(order);
        }
    }

    pub fn set_unique(&mut self, unique: bool) {
        if let Some(base) = &mut self.base {
            base.unique = unique;
        }
    }

    /// A combination of relations is only unique if all parts are.
    pub fn restrict_unique(&mut self, unique: bool) {
        if let Some(base) = &mut self.base {
            base.unique &= unique;
        }
    }

    pub fn restrict_limit(&mut self, limit: Option<u64>) {
        if let Some(base) = &mut self.base {
            base.limit = min_limit(base.limit, limit);
        }
    }

    pub fn restrict_limit_inverse(&mut self, limit: Option<u64>) {
        if let Some(base) = &mut self.base {
            base.limit_inverse = min_limit(base.limit_inverse, limit);
        }
    }

    pub fn swap_limits(&mut self) {
        if let Some(base) = &mut self.base {
            std::mem::swap(&mut base.limit, &mut base.limit_inverse);
        }
    }

    pub fn rename(&mut self, renamer: &dyn ColumnRenamer) {
        self.conditions = self.conditions.iter().map(|c| c.rename(renamer)).collect();
        self.soft_conditions = self.soft_conditions.iter().map(|c| c.rename(renamer)).collect();
        if let Some(base) = &self.base {
            if let Relation::Rows(renamed) = Relation::Rows(base.clone()).rename_columns(renamer) {
                self.base = Some(renamed);
            }
        }
    }

    pub fn freeze(self) -> Relation {
        let RelationBuilder {
            base,
            conditions,
            soft_conditions,
        } = self;

        match base {
            None => {
                if Expression::and(conditions).is_false() {
                    Relation::Empty
                } else {
                    Relation::True
                }
            }
            Some(mut data) => {
                let condition =
                    Expression::and(std::iter::once(data.condition).chain(conditions));
                if condition.is_false() {
                    return Relation::Empty;
                }
                data.condition = condition;
                data.soft_condition =
                    Expression::and(std::iter::once(data.soft_condition).chain(soft_conditions));
                Relation::Rows(data)
            }
        }
    }
}

fn min_limit(a: Option<u64>, b: Option<u64>) -> Option<u64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, None) => a,
        (None, b) => b,
    }
}
