//! A read-only [`Graph`] whose triples are produced by SQL queries over the
//! bridges of a mapping.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::errors::GraphError;
use super::graph::Graph;
use super::triple::{Triple, TripleMatch};
use crate::config::EngineConfig;
use crate::execution::{
    BindingIterator, ConnectionRegistry, DiagnosticSink, ExecutionError, LogSink,
};
use crate::node_maker::Node;
use crate::query_planner::optimizer::{push_down, FilterExpr};
use crate::query_planner::{
    parse_query, Binding, CompatibleRelationGroup, GraphPatternTranslator, NodeRelation,
    PatternTerm, Position, TriplePattern, TripleRelation,
};
use crate::relational::{Relation, RelationBuilder};
use crate::sql_generator::build_select;

pub struct MappedGraph {
    bridges: Vec<TripleRelation>,
    registry: Arc<ConnectionRegistry>,
    config: EngineConfig,
    sink: Arc<dyn DiagnosticSink>,
}

impl MappedGraph {
    pub fn new(
        bridges: Vec<TripleRelation>,
        registry: Arc<ConnectionRegistry>,
        config: EngineConfig,
    ) -> Self {
        MappedGraph {
            bridges,
            registry,
            config,
            sink: Arc::new(LogSink),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn bridges(&self) -> &[TripleRelation] {
        &self.bridges
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Translates `patterns`, pushes `filter` into each node relation and
    /// groups the survivors into statements.
    pub fn plan(
        &self,
        patterns: &[TriplePattern],
        filter: Option<&FilterExpr>,
    ) -> Result<Vec<CompatibleRelationGroup>, GraphError> {
        let translator = GraphPatternTranslator::new(&self.bridges, &self.config);
        let mut relations = translator.translate(patterns)?;
        if let Some(filter) = filter {
            relations = relations
                .iter()
                .map(|r| push_down(r, filter).into_node_relation())
                .collect();
        }
        relations.retain(|r| !r.relation().is_empty());

        let merge = self.config.use_all_optimizations && self.config.group_compatible_relations;
        let groups = CompatibleRelationGroup::group(relations, merge);
        log::debug!(
            "Planned {} triple(s) into {} statement group(s)",
            patterns.len(),
            groups.len()
        );
        Ok(groups)
    }

    /// Lazily streams the bindings of `patterns` that satisfy `filter`.
    pub fn query(
        &self,
        patterns: &[TriplePattern],
        filter: Option<&FilterExpr>,
    ) -> Result<BindingIterator, GraphError> {
        let groups = self.plan(patterns, filter)?;
        Ok(BindingIterator::new(groups, Arc::clone(&self.registry)).with_sink(Arc::clone(&self.sink)))
    }

    /// Parses a pattern with optional `FILTER` clauses and queries it.
    pub fn query_text(&self, text: &str) -> Result<BindingIterator, GraphError> {
        let parsed = parse_query(text)?;
        self.query(&parsed.patterns, parsed.filter.as_ref())
    }

    /// The SQL statements `query` would run, in execution order.
    pub fn explain(
        &self,
        patterns: &[TriplePattern],
        filter: Option<&FilterExpr>,
    ) -> Result<Vec<String>, GraphError> {
        let mut statements = Vec::new();
        for group in self.plan(patterns, filter)? {
            let relation = group.base_relation();
            if let Relation::Rows(_) = relation {
                let statement = build_select(&relation).map_err(ExecutionError::from)?;
                statements.push(statement.sql);
            }
        }
        Ok(statements)
    }

    fn collect_bindings(
        &self,
        pattern: &TriplePattern,
        limit: Option<u64>,
    ) -> Result<BindingIterator, GraphError> {
        let groups = self.plan(std::slice::from_ref(pattern), None)?;
        let groups = match limit {
            None => groups,
            Some(limit) => {
                let limited = groups
                    .iter()
                    .flat_map(|g| g.members())
                    .map(|member| limit_rows(member, limit))
                    .collect();
                CompatibleRelationGroup::group(limited, false)
            }
        };
        Ok(BindingIterator::new(groups, Arc::clone(&self.registry)).with_sink(Arc::clone(&self.sink)))
    }
}

fn limit_rows(node_relation: &NodeRelation, limit: u64) -> NodeRelation {
    match node_relation.relation() {
        Relation::Rows(_) => {
            let mut builder = RelationBuilder::from_relation(node_relation.relation());
            builder.restrict_limit(Some(limit));
            node_relation.with_relation(builder.freeze())
        }
        _ => node_relation.clone(),
    }
}

fn triple_from_binding(pattern: &TriplePattern, binding: &Binding) -> Option<Triple> {
    let term = |position: Position| -> Option<Node> {
        match pattern.term(position) {
            PatternTerm::Node(node) => Some(node.clone()),
            PatternTerm::Variable(name) => binding.get(name).cloned(),
        }
    };
    Some(Triple::new(
        term(Position::Subject)?,
        term(Position::Predicate)?,
        term(Position::Object)?,
    ))
}

impl Graph for MappedGraph {
    fn find(&self, pattern: &TripleMatch) -> Result<Vec<Triple>, GraphError> {
        let triple_pattern = pattern.to_pattern();
        let mut triples = Vec::new();
        let mut seen = BTreeSet::new();
        for binding in self.collect_bindings(&triple_pattern, None)? {
            let Some(triple) = triple_from_binding(&triple_pattern, &binding?) else {
                continue;
            };
            if self.config.deduplicate_find_results && !seen.insert(triple.clone()) {
                continue;
            }
            triples.push(triple);
        }
        log::debug!("find {} returned {} triple(s)", pattern, triples.len());
        Ok(triples)
    }

    fn contains(&self, pattern: &TripleMatch) -> Result<bool, GraphError> {
        let mut bindings = self.collect_bindings(&pattern.to_pattern(), Some(1))?;
        let found = match bindings.next() {
            Some(binding) => {
                binding?;
                true
            }
            None => false,
        };
        bindings.close()?;
        Ok(found)
    }

    fn add(&self, _triple: &Triple) -> Result<(), GraphError> {
        Err(GraphError::ReadOnly { operation: "add" })
    }

    fn delete(&self, _triple: &Triple) -> Result<(), GraphError> {
        Err(GraphError::ReadOnly { operation: "delete" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_maker::{NodeMaker, NodeType, Pattern, ValueMaker};
    use crate::relational::{Attribute, DatabaseHandle};
    use crate::sql_generator::Vendor;
    use crate::testing::{row, FakeConnection};

    fn attr(s: &str) -> Attribute {
        Attribute::parse(s).unwrap()
    }

    fn person() -> NodeMaker {
        NodeMaker::typed(
            NodeType::Uri,
            ValueMaker::Pattern(Pattern::parse("http://ex/person/@@people.id@@").unwrap()),
            true,
        )
    }

    fn name_bridge() -> TripleRelation {
        TripleRelation::new(
            Relation::builder(DatabaseHandle::new("db", Vendor::Sql92)).freeze(),
            person(),
            NodeMaker::Fixed(Node::uri("http://ex/name")),
            NodeMaker::typed(NodeType::plain_literal(), ValueMaker::Column(attr("people.name")), false),
        )
    }

    fn graph(connection: Arc<FakeConnection>) -> MappedGraph {
        let registry = ConnectionRegistry::new().with_connection("db", connection);
        MappedGraph::new(vec![name_bridge()], Arc::new(registry), EngineConfig::default())
    }

    #[test]
    fn test_find_builds_triples() {
        let connection = Arc::new(FakeConnection::new(Vendor::Sql92).with_rows(
            "people",
            vec![row(&["1", "Ann"]), row(&["2", "Bob"]), row(&["1", "Ann"])],
        ));
        let triples = graph(connection.clone()).find(&TripleMatch::any()).unwrap();
        assert_eq!(
            triples,
            vec![
                Triple::new(
                    Node::uri("http://ex/person/1"),
                    Node::uri("http://ex/name"),
                    Node::plain_literal("Ann")
                ),
                Triple::new(
                    Node::uri("http://ex/person/2"),
                    Node::uri("http://ex/name"),
                    Node::plain_literal("Bob")
                ),
            ]
        );
        assert_eq!(connection.execution_count(), 1);
    }

    #[test]
    fn test_find_with_unknown_predicate_runs_nothing() {
        let connection = Arc::new(FakeConnection::new(Vendor::Sql92));
        let pattern = TripleMatch::new(None, Some(Node::uri("http://ex/age")), None);
        assert!(graph(connection.clone()).find(&pattern).unwrap().is_empty());
        assert_eq!(connection.execution_count(), 0);
    }

    #[test]
    fn test_contains_limits_to_one_row() {
        let connection = Arc::new(
            FakeConnection::new(Vendor::Sql92).with_rows("people", vec![row(&["Ann"])]),
        );
        // the bound subject is fixed, so only the name column is selected
        let pattern = TripleMatch::new(Some(Node::uri("http://ex/person/1")), None, None);
        assert!(graph(connection.clone()).contains(&pattern).unwrap());
        let executed = connection.executed();
        assert_eq!(executed.len(), 1);
        assert!(executed[0].ends_with("LIMIT 1"), "{}", executed[0]);
        assert!(executed[0].contains("\"people\".\"id\" = '1'"), "{}", executed[0]);
    }

    #[test]
    fn test_contains_skips_rows_with_null_columns() {
        // columns follow the SELECT list: id, then name
        let connection = Arc::new(FakeConnection::new(Vendor::Sql92).with_rows(
            "people",
            vec![vec![Some("1".to_string()), None], row(&["2", "Bob"])],
        ));
        let graph = graph(connection.clone());
        let name = TripleMatch::new(None, Some(Node::uri("http://ex/name")), None);
        assert!(graph.contains(&name).unwrap());
        assert_eq!(graph.find(&name).unwrap().len(), 1);
        let executed = connection.executed();
        assert!(executed[0].contains("\"people\".\"name\" IS NOT NULL"), "{}", executed[0]);
        assert!(executed[0].contains("\"people\".\"id\" IS NOT NULL"), "{}", executed[0]);
    }

    #[test]
    fn test_explain_pushes_filter_into_sql() {
        let connection = Arc::new(FakeConnection::new(Vendor::Sql92));
        let graph = graph(connection.clone());
        let parsed = parse_query("?p <http://ex/name> ?n . FILTER(?n = \"Ann\")").unwrap();
        let statements = graph.explain(&parsed.patterns, parsed.filter.as_ref()).unwrap();
        assert_eq!(statements.len(), 1);
        assert!(statements[0].contains("\"people\".\"name\" = 'Ann'"), "{}", statements[0]);
        assert_eq!(connection.execution_count(), 0);
    }

    #[test]
    fn test_query_applies_residue_filter() {
        let connection = Arc::new(FakeConnection::new(Vendor::Sql92).with_rows(
            "people",
            vec![row(&["1", "Ann"]), row(&["2", "Bob"])],
        ));
        let bindings: Vec<Binding> = graph(connection)
            .query_text("?p <http://ex/name> ?n FILTER regex(?n, \"^B\")")
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0]["n"], Node::plain_literal("Bob"));
    }

    #[test]
    fn test_mutation_is_rejected() {
        let connection = Arc::new(FakeConnection::new(Vendor::Sql92));
        let triple = Triple::new(
            Node::uri("http://ex/person/1"),
            Node::uri("http://ex/name"),
            Node::plain_literal("Ann"),
        );
        assert_eq!(
            graph(connection).add(&triple),
            Err(GraphError::ReadOnly { operation: "add" })
        );
    }
}
