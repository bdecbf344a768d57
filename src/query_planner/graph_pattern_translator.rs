//! Translation of a basic graph pattern into node relations.
//!
//! Each triple is matched against every bridge on its own; the surviving
//! candidates are then combined across triples, joined on shared variables,
//! and every combination that is provably empty is dropped.

use super::errors::QueryPlannerError;
use super::node_relation::NodeRelation;
use super::triple_pattern::{Position, TriplePattern};
use super::triple_relation::TripleRelation;
use super::uri_maker_rule::UriMakerRule;
use super::variable_constraints::VariableConstraints;
use crate::config::EngineConfig;
use crate::relational::Relation;

pub struct GraphPatternTranslator<'a> {
    bridges: &'a [TripleRelation],
    rule: Option<UriMakerRule>,
    max_combinations: usize,
}

impl<'a> GraphPatternTranslator<'a> {
    pub fn new(bridges: &'a [TripleRelation], config: &EngineConfig) -> Self {
        GraphPatternTranslator {
            bridges,
            rule: config
                .use_all_optimizations
                .then(|| UriMakerRule::new(bridges)),
            max_combinations: config.max_combinations,
        }
    }

    /// Node relations whose union is the answer to `patterns`.
    pub fn translate(
        &self,
        patterns: &[TriplePattern],
    ) -> Result<Vec<NodeRelation>, QueryPlannerError> {
        if patterns.is_empty() {
            return Ok(vec![NodeRelation::truth()]);
        }

        let mut candidates = Vec::with_capacity(patterns.len());
        for (index, pattern) in patterns.iter().enumerate() {
            let matches = self.candidates_for(pattern);
            if matches.is_empty() {
                log::debug!("No bridge matches triple {}: {}", index, pattern);
                return Ok(Vec::new());
            }
            candidates.push(matches);
        }

        let count = candidates
            .iter()
            .try_fold(1usize, |acc, c| acc.checked_mul(c.len()))
            .unwrap_or(usize::MAX);
        if count > self.max_combinations {
            return Err(QueryPlannerError::TooManyCombinations {
                count,
                max: self.max_combinations,
            });
        }

        // Distinct copies of each table per triple, unless there is only one
        if patterns.len() > 1 {
            for (index, matches) in candidates.iter_mut().enumerate() {
                for candidate in matches.iter_mut() {
                    *candidate = candidate.with_prefix(index)?;
                }
            }
        }

        let mut results = Vec::new();
        let mut selection = vec![0usize; candidates.len()];
        loop {
            let combination: Vec<&TripleRelation> = selection
                .iter()
                .zip(&candidates)
                .map(|(&i, matches)| &matches[i])
                .collect();
            if let Some(node_relation) = combine(patterns, &combination)? {
                results.push(node_relation);
            }
            if !advance(&mut selection, &candidates) {
                break;
            }
        }

        log::trace!(
            "Translated {} triple(s) into {} node relation(s) from {} combination(s)",
            patterns.len(),
            results.len(),
            count
        );
        Ok(results)
    }

    /// Bridges able to produce `pattern`, narrowed to its bound terms.
    fn candidates_for(&self, pattern: &TriplePattern) -> Vec<TripleRelation> {
        let Some(rule) = &self.rule else {
            return self
                .bridges
                .iter()
                .filter_map(|b| b.select_triple(pattern))
                .collect();
        };

        let mut subject_checker = rule.checker(&pattern.subject);
        let mut object_checker = rule.checker(&pattern.object);
        let mut selected = Vec::new();
        for index in rule.sort(0..self.bridges.len()) {
            let subject_kind = rule.kind(index, Position::Subject);
            let object_kind = rule.kind(index, Position::Object);
            if !subject_checker.can_match(subject_kind) || !object_checker.can_match(object_kind) {
                log::trace!("Skipping URI column bridge {} for {}", index, pattern);
                continue;
            }
            if let Some(triple) = self.bridges[index].select_triple(pattern) {
                subject_checker.add_potential_match(subject_kind);
                object_checker.add_potential_match(object_kind);
                selected.push(triple);
            }
        }
        selected
    }
}

/// Joins one candidate per triple. `None` when the combination is empty.
fn combine(
    patterns: &[TriplePattern],
    combination: &[&TripleRelation],
) -> Result<Option<NodeRelation>, QueryPlannerError> {
    let relations: Vec<Relation> = combination.iter().map(|t| t.relation().clone()).collect();
    let joined = Relation::join_all(&relations)?;
    if joined.is_empty() {
        return Ok(None);
    }

    let mut constraints = VariableConstraints::new();
    for (pattern, triple) in patterns.iter().zip(combination) {
        for (position, variable) in pattern.variables() {
            constraints.add(variable, triple.node_maker(position).clone());
        }
    }
    let Some(resolved) = constraints.resolve() else {
        return Ok(None);
    };

    let relation = joined.select(&resolved.condition);
    if relation.is_empty() {
        return Ok(None);
    }
    Ok(Some(NodeRelation::new(
        relation,
        resolved.bindings,
        resolved.residuals,
    )))
}

/// Steps `selection` to the next combination, last triple fastest.
fn advance(selection: &mut [usize], candidates: &[Vec<TripleRelation>]) -> bool {
    for i in (0..selection.len()).rev() {
        selection[i] += 1;
        if selection[i] < candidates[i].len() {
            return true;
        }
        selection[i] = 0;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_maker::{Node, NodeMaker, NodeType, Pattern, ValueMaker};
    use crate::query_planner::triple_pattern::PatternTerm;
    use crate::relational::{Attribute, DatabaseHandle};
    use crate::sql_generator::Vendor;

    fn attr(s: &str) -> Attribute {
        Attribute::parse(s).unwrap()
    }

    fn db(name: &str) -> DatabaseHandle {
        DatabaseHandle::new(name, Vendor::Sql92)
    }

    fn person_uri(column: &str) -> NodeMaker {
        NodeMaker::typed(
            NodeType::Uri,
            ValueMaker::Pattern(Pattern::parse(&format!("http://ex/person/@@{}@@", column)).unwrap()),
            true,
        )
    }

    fn literal(column: &str) -> NodeMaker {
        NodeMaker::typed(NodeType::plain_literal(), ValueMaker::Column(attr(column)), false)
    }

    fn bridges() -> Vec<TripleRelation> {
        vec![
            TripleRelation::new(
                Relation::builder(db("db")).freeze(),
                person_uri("people.id"),
                NodeMaker::Fixed(Node::uri("http://ex/name")),
                literal("people.name"),
            ),
            TripleRelation::new(
                Relation::builder(db("db")).freeze(),
                person_uri("people.id"),
                NodeMaker::Fixed(Node::uri("http://ex/email")),
                literal("people.email"),
            ),
        ]
    }

    fn triple(s: PatternTerm, p: &str, o: PatternTerm) -> TriplePattern {
        TriplePattern::new(s, Node::uri(p).into(), o)
    }

    #[test]
    fn test_empty_pattern_is_truth() {
        let bridges = bridges();
        let translator = GraphPatternTranslator::new(&bridges, &EngineConfig::default());
        assert_eq!(translator.translate(&[]).unwrap(), vec![NodeRelation::truth()]);
    }

    #[test]
    fn test_unmatched_triple_gives_nothing() {
        let bridges = bridges();
        let translator = GraphPatternTranslator::new(&bridges, &EngineConfig::default());
        let result = translator
            .translate(&[triple(PatternTerm::variable("s"), "http://ex/age", PatternTerm::variable("o"))])
            .unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_shared_variable_becomes_join() {
        let bridges = bridges();
        let translator = GraphPatternTranslator::new(&bridges, &EngineConfig::default());
        let result = translator
            .translate(&[
                triple(PatternTerm::variable("s"), "http://ex/name", PatternTerm::variable("n")),
                triple(PatternTerm::variable("s"), "http://ex/email", PatternTerm::variable("e")),
            ])
            .unwrap();
        assert_eq!(result.len(), 1);
        let conjuncts: Vec<String> = result[0]
            .relation()
            .condition()
            .conjuncts()
            .iter()
            .map(|c| c.to_string())
            .collect();
        assert!(conjuncts.contains(&"(T0_people.id = T1_people.id)".to_string()), "{:?}", conjuncts);
        assert!(conjuncts.contains(&"T1_people.email IS NOT NULL".to_string()), "{:?}", conjuncts);
        let variables: Vec<&str> = result[0].variables().collect();
        assert_eq!(variables, vec!["e", "n", "s"]);
    }

    #[test]
    fn test_translation_is_deterministic() {
        let bridges = bridges();
        let translator = GraphPatternTranslator::new(&bridges, &EngineConfig::default());
        let pattern = [triple(
            PatternTerm::variable("s"),
            "http://ex/name",
            PatternTerm::variable("n"),
        )];
        assert_eq!(
            translator.translate(&pattern).unwrap(),
            translator.translate(&pattern).unwrap()
        );
    }

    #[test]
    fn test_too_many_combinations() {
        let bridges = bridges();
        let config = EngineConfig {
            max_combinations: 3,
            ..Default::default()
        };
        let translator = GraphPatternTranslator::new(&bridges, &config);
        let any = || TriplePattern::new(
            PatternTerm::variable("s"),
            PatternTerm::variable("p"),
            PatternTerm::variable("o"),
        );
        let err = translator.translate(&[any(), any()]).unwrap_err();
        assert_eq!(err, QueryPlannerError::TooManyCombinations { count: 4, max: 3 });
    }

    #[test]
    fn test_cross_database_join_is_an_error() {
        let bridges = vec![
            TripleRelation::new(
                Relation::builder(db("one")).freeze(),
                person_uri("people.id"),
                NodeMaker::Fixed(Node::uri("http://ex/name")),
                literal("people.name"),
            ),
            TripleRelation::new(
                Relation::builder(db("two")).freeze(),
                person_uri("staff.id"),
                NodeMaker::Fixed(Node::uri("http://ex/email")),
                literal("staff.email"),
            ),
        ];
        let translator = GraphPatternTranslator::new(&bridges, &EngineConfig::default());
        let err = translator
            .translate(&[
                triple(PatternTerm::variable("s"), "http://ex/name", PatternTerm::variable("n")),
                triple(PatternTerm::variable("s"), "http://ex/email", PatternTerm::variable("e")),
            ])
            .unwrap_err();
        assert!(matches!(err, QueryPlannerError::CrossDatabaseJoin { .. }));
    }
}
