use std::collections::BTreeSet;
use std::fmt;

use super::triple_pattern::{PatternTerm, Position, TriplePattern};
use crate::node_maker::NodeMaker;
use crate::relational::{
    AliasMap, ColumnRenamer, ProjectionSpec, Relation, RelationBuilder, RelationName,
    RelationalError,
};

/// A bridge: a relation whose rows each produce one triple through three
/// node makers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TripleRelation {
    relation: Relation,
    subject: NodeMaker,
    predicate: NodeMaker,
    object: NodeMaker,
}

impl TripleRelation {
    pub fn new(
        relation: Relation,
        subject: NodeMaker,
        predicate: NodeMaker,
        object: NodeMaker,
    ) -> Self {
        TripleRelation {
            relation,
            subject,
            predicate,
            object,
        }
    }

    pub fn relation(&self) -> &Relation {
        &self.relation
    }

    pub fn node_maker(&self, position: Position) -> &NodeMaker {
        match position {
            Position::Subject => &self.subject,
            Position::Predicate => &self.predicate,
            Position::Object => &self.object,
        }
    }

    /// Restricts the bridge to rows matching the bound terms of `pattern`.
    ///
    /// Returns `None` when some bound term can never be produced. The
    /// result projects exactly the columns its node makers read, and only
    /// keeps rows where none of them is NULL.
    pub fn select_triple(&self, pattern: &TriplePattern) -> Option<TripleRelation> {
        let mut builder = RelationBuilder::from_relation(&self.relation);
        let mut makers = Vec::with_capacity(3);
        for position in Position::ALL {
            let maker = self.node_maker(position);
            let selected = match pattern.term(position) {
                PatternTerm::Node(node) => maker.select_node(node, &mut builder),
                PatternTerm::Variable(_) => maker.clone(),
            };
            if selected.is_empty() {
                return None;
            }
            makers.push(selected);
        }

        let projections: BTreeSet<ProjectionSpec> =
            makers.iter().flat_map(NodeMaker::projection_specs).collect();
        for projection in &projections {
            builder.add_condition(projection.not_null_condition());
        }
        builder.set_projections(projections);
        if pattern.object.is_bound() && !pattern.subject.is_bound() {
            builder.swap_limits();
        }
        let relation = builder.freeze();
        if relation.is_empty() {
            return None;
        }

        let mut makers = makers.into_iter();
        match (makers.next(), makers.next(), makers.next()) {
            (Some(subject), Some(predicate), Some(object)) => Some(TripleRelation {
                relation,
                subject,
                predicate,
                object,
            }),
            _ => None,
        }
    }

    /// Every table the bridge reads, under the names used in its node makers.
    pub fn tables(&self) -> BTreeSet<RelationName> {
        let mut tables = self.relation.tables();
        for position in Position::ALL {
            tables.extend(
                self.node_maker(position)
                    .projection_specs()
                    .iter()
                    .flat_map(ProjectionSpec::required_attributes)
                    .map(|a| a.relation_name().clone()),
            );
        }
        tables
    }

    /// A copy whose tables are all aliased as `T{index}_table`, so that
    /// several copies can be joined in one statement.
    pub fn with_prefix(&self, index: usize) -> Result<TripleRelation, RelationalError> {
        let aliases =
            AliasMap::from_pairs(self.tables().into_iter().map(|t| {
                let alias = t.with_prefix(index);
                (t, alias)
            }))?;
        Ok(self.rename(&aliases))
    }

    pub fn rename(&self, renamer: &dyn ColumnRenamer) -> TripleRelation {
        TripleRelation {
            relation: self.relation.rename_columns(renamer),
            subject: self.subject.rename(renamer),
            predicate: self.predicate.rename(renamer),
            object: self.object.rename(renamer),
        }
    }
}

impl fmt::Display for TripleRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TripleRelation({} {} {})",
            self.subject, self.predicate, self.object
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Expression;
    use crate::node_maker::{Node, NodeType, Pattern, ValueMaker};
    use crate::relational::{Attribute, DatabaseHandle};
    use crate::sql_generator::Vendor;

    fn attr(s: &str) -> Attribute {
        Attribute::parse(s).unwrap()
    }

    fn name_bridge() -> TripleRelation {
        let mut builder = Relation::builder(DatabaseHandle::new("db", Vendor::Sql92));
        builder.restrict_limit(Some(10));
        TripleRelation::new(
            builder.freeze(),
            NodeMaker::typed(
                NodeType::Uri,
                ValueMaker::Pattern(Pattern::parse("http://ex/person/@@people.id@@").unwrap()),
                true,
            ),
            NodeMaker::Fixed(Node::uri("http://ex/name")),
            NodeMaker::typed(
                NodeType::plain_literal(),
                ValueMaker::Column(attr("people.name")),
                false,
            ),
        )
    }

    fn pattern(s: PatternTerm, p: PatternTerm, o: PatternTerm) -> TriplePattern {
        TriplePattern::new(s, p, o)
    }

    #[test]
    fn test_select_triple_projects_needed_columns() {
        let selected = name_bridge()
            .select_triple(&pattern(
                PatternTerm::variable("s"),
                Node::uri("http://ex/name").into(),
                PatternTerm::variable("o"),
            ))
            .unwrap();
        let projections: Vec<String> = selected
            .relation()
            .projections()
            .iter()
            .map(|p| p.to_string())
            .collect();
        assert_eq!(projections, vec!["people.id", "people.name"]);
    }

    #[test]
    fn test_select_triple_rejects_other_predicate() {
        let selected = name_bridge().select_triple(&pattern(
            PatternTerm::variable("s"),
            Node::uri("http://ex/age").into(),
            PatternTerm::variable("o"),
        ));
        assert!(selected.is_none());
    }

    #[test]
    fn test_bound_subject_becomes_condition() {
        let selected = name_bridge()
            .select_triple(&pattern(
                Node::uri("http://ex/person/7").into(),
                PatternTerm::variable("p"),
                PatternTerm::variable("o"),
            ))
            .unwrap();
        assert_eq!(
            selected.relation().condition(),
            &Expression::and([
                Expression::attribute_equals_value(&attr("people.id"), "7"),
                Expression::not_null(Expression::attribute(&attr("people.name"))),
            ])
        );
        assert_eq!(
            selected.node_maker(Position::Subject),
            &NodeMaker::Fixed(Node::uri("http://ex/person/7"))
        );
    }

    #[test]
    fn test_projected_columns_must_not_be_null() {
        let selected = name_bridge()
            .select_triple(&pattern(
                PatternTerm::variable("s"),
                PatternTerm::variable("p"),
                PatternTerm::variable("o"),
            ))
            .unwrap();
        let guards: Vec<String> = selected
            .relation()
            .condition()
            .conjuncts()
            .iter()
            .map(|c| c.to_string())
            .collect();
        assert_eq!(guards, vec!["people.id IS NOT NULL", "people.name IS NOT NULL"]);
    }

    #[test]
    fn test_bound_object_swaps_limits() {
        let selected = name_bridge()
            .select_triple(&pattern(
                PatternTerm::variable("s"),
                PatternTerm::variable("p"),
                Node::plain_literal("Alice").into(),
            ))
            .unwrap();
        assert_eq!(selected.relation().limit(), None);
        assert_eq!(selected.relation().limit_inverse(), Some(10));
    }

    #[test]
    fn test_with_prefix_renames_everything() {
        let prefixed = name_bridge().with_prefix(2).unwrap();
        let tables: Vec<String> = prefixed.tables().iter().map(|t| t.to_string()).collect();
        assert_eq!(tables, vec!["T2_people"]);
        assert_eq!(
            prefixed.relation().aliases().original_of(&RelationName::new(None, "T2_people")),
            RelationName::new(None, "people")
        );
    }
}
