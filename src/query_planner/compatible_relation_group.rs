use std::collections::BTreeSet;

use super::node_relation::NodeRelation;
use crate::expression::Expression;
use crate::relational::{ProjectionSpec, Relation, RelationData};

/// Node relations answered by one SQL statement.
///
/// Members share everything but their projections and the `IS NOT NULL`
/// guards on them; the statement selects the union of what the members
/// need and keeps the guards they all have.
#[derive(Debug, Clone, PartialEq)]
pub struct CompatibleRelationGroup {
    members: Vec<NodeRelation>,
    projections: BTreeSet<ProjectionSpec>,
    guards: BTreeSet<Expression>,
}

impl CompatibleRelationGroup {
    fn new(first: NodeRelation) -> Self {
        CompatibleRelationGroup {
            projections: first.relation().projections().clone(),
            guards: split_guards(first.relation().condition()).0,
            members: vec![first],
        }
    }

    /// Partitions `relations` into groups. With `merge` off every relation
    /// gets a group of its own.
    pub fn group(relations: Vec<NodeRelation>, merge: bool) -> Vec<CompatibleRelationGroup> {
        let mut groups: Vec<CompatibleRelationGroup> = Vec::new();
        for relation in relations {
            if relation.relation().is_empty() {
                continue;
            }
            if merge {
                if let Some(group) = groups.iter_mut().find(|g| g.is_compatible(relation.relation())) {
                    group.add(relation);
                    continue;
                }
            }
            groups.push(CompatibleRelationGroup::new(relation));
        }
        log::trace!("Grouped node relations into {} statement(s)", groups.len());
        groups
    }

    pub fn is_compatible(&self, other: &Relation) -> bool {
        let (Some(mine), Some(theirs)) = (self.first_relation().data(), other.data()) else {
            return false;
        };
        if !same_base(mine, theirs) {
            return false;
        }
        let (my_guards, my_condition) = split_guards(&mine.condition);
        let (their_guards, their_condition) = split_guards(&theirs.condition);
        if my_condition != their_condition {
            return false;
        }
        // A dropped guard lets NULL rows through, which a limit would count
        if my_guards != their_guards
            && !(mine.unique && mine.limit.is_none() && mine.limit_inverse.is_none())
        {
            return false;
        }
        // Without uniqueness, extra columns would change the number of rows
        mine.unique || mine.projections == theirs.projections
    }

    fn add(&mut self, member: NodeRelation) {
        self.projections
            .extend(member.relation().projections().iter().cloned());
        let (guards, _) = split_guards(member.relation().condition());
        self.guards.retain(|g| guards.contains(g));
        self.members.push(member);
    }

    fn first_relation(&self) -> &Relation {
        self.members[0].relation()
    }

    pub fn members(&self) -> &[NodeRelation] {
        &self.members
    }

    /// The relation to execute: the shared base projecting every member's
    /// columns.
    pub fn base_relation(&self) -> Relation {
        match self.first_relation() {
            Relation::Rows(data) => {
                let mut data = data.clone();
                let (_, condition) = split_guards(&data.condition);
                data.condition = Expression::and(condition.into_iter().chain(self.guards.iter().cloned()));
                data.projections = self.projections.clone();
                Relation::Rows(data)
            }
            other => other.clone(),
        }
    }
}

/// The `IS NOT NULL` conjuncts of `condition`, and the rest.
fn split_guards(condition: &Expression) -> (BTreeSet<Expression>, BTreeSet<Expression>) {
    condition
        .conjuncts()
        .into_iter()
        .cloned()
        .partition(|c| matches!(c, Expression::NotNull(_)))
}

fn same_base(a: &RelationData, b: &RelationData) -> bool {
    a.database == b.database
        && a.aliases == b.aliases
        && a.joins == b.joins
        && a.soft_condition == b.soft_condition
        && a.order == b.order
        && a.limit == b.limit
        && a.limit_inverse == b.limit_inverse
        && a.unique == b.unique
}
