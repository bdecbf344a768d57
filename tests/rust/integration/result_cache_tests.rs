//! The result cache in front of an in-memory graph and a mapped graph

#[cfg(test)]
mod result_cache_tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use relgraph::config::{EngineConfig, ResultCacheConfig};
    use relgraph::execution::ConnectionRegistry;
    use relgraph::graph::{CachingGraph, Graph, GraphError, MappedGraph, Triple, TripleMatch};
    use relgraph::mapping::Mapping;
    use relgraph::node_maker::Node;
    use relgraph::sql_generator::Vendor;
    use relgraph::testing::{row, FakeConnection};

    /// Answers from a fixed list of triples and counts the calls it gets.
    struct CountingGraph {
        triples: Vec<Triple>,
        finds: AtomicUsize,
        contains: AtomicUsize,
    }

    impl CountingGraph {
        fn new(triples: Vec<Triple>) -> Self {
            CountingGraph {
                triples,
                finds: AtomicUsize::new(0),
                contains: AtomicUsize::new(0),
            }
        }
    }

    impl Graph for CountingGraph {
        fn find(&self, pattern: &TripleMatch) -> Result<Vec<Triple>, GraphError> {
            self.finds.fetch_add(1, Ordering::SeqCst);
            Ok(self.triples.iter().filter(|t| pattern.matches(t)).cloned().collect())
        }

        fn contains(&self, pattern: &TripleMatch) -> Result<bool, GraphError> {
            self.contains.fetch_add(1, Ordering::SeqCst);
            Ok(self.triples.iter().any(|t| pattern.matches(t)))
        }

        fn add(&self, _triple: &Triple) -> Result<(), GraphError> {
            Err(GraphError::ReadOnly { operation: "add" })
        }

        fn delete(&self, _triple: &Triple) -> Result<(), GraphError> {
            Err(GraphError::ReadOnly { operation: "delete" })
        }
    }

    fn label(subject: &str, text: &str) -> Triple {
        Triple::new(
            Node::uri(subject),
            Node::uri("http://www.w3.org/2000/01/rdf-schema#label"),
            Node::plain_literal(text),
        )
    }

    fn labels() -> Vec<Triple> {
        vec![
            label("http://ex/a", "alpha"),
            label("http://ex/b", "beta"),
            label("http://ex/c", "gamma"),
        ]
    }

    #[test]
    fn test_repeated_find_is_served_from_cache() {
        let cache = CachingGraph::new(CountingGraph::new(labels()), ResultCacheConfig::default());
        let pattern = TripleMatch::new(Some(Node::uri("http://ex/b")), None, None);

        assert_eq!(cache.find(&pattern).unwrap(), vec![label("http://ex/b", "beta")]);
        assert_eq!(cache.find(&pattern).unwrap(), vec![label("http://ex/b", "beta")]);
        assert_eq!(cache.inner().finds.load(Ordering::SeqCst), 1);

        let metrics = cache.metrics();
        assert_eq!(metrics.hits, 1);
        assert_eq!(metrics.misses, 1);
        // subject and object only; the rdfs predicate is free
        assert_eq!(metrics.size_bytes, "http://ex/b".len() + "beta".len());
    }

    #[test]
    fn test_oversized_bucket_bypasses_cache() {
        let config = ResultCacheConfig {
            max_size_bytes: 20,
            ..Default::default()
        };
        let cache = CachingGraph::new(CountingGraph::new(labels()), config);
        let everything = TripleMatch::any();
        assert!(cache.bucket_cost(&labels()) > 20);

        assert_eq!(cache.find(&everything).unwrap().len(), 3);
        assert_eq!(cache.find(&everything).unwrap().len(), 3);
        assert_eq!(cache.find(&everything).unwrap().len(), 3);
        assert_eq!(cache.inner().finds.load(Ordering::SeqCst), 3);

        let metrics = cache.metrics();
        assert_eq!(metrics.misses, 1);
        assert_eq!(metrics.bypasses, 2);
        assert_eq!(metrics.hits, 0);
        assert_eq!(metrics.size_bytes, 0);

        // a small bucket still fits
        let one = TripleMatch::new(Some(Node::uri("http://ex/a")), None, None);
        cache.find(&one).unwrap();
        cache.find(&one).unwrap();
        assert_eq!(cache.inner().finds.load(Ordering::SeqCst), 4);
        assert_eq!(cache.metrics().hits, 1);
    }

    #[test]
    fn test_find_and_contains_are_cached_separately() {
        let cache = CachingGraph::new(CountingGraph::new(labels()), ResultCacheConfig::default());
        let pattern = TripleMatch::new(None, None, Some(Node::plain_literal("gamma")));

        assert!(cache.contains(&pattern).unwrap());
        assert!(cache.contains(&pattern).unwrap());
        assert_eq!(cache.find(&pattern).unwrap().len(), 1);

        assert_eq!(cache.inner().contains.load(Ordering::SeqCst), 1);
        assert_eq!(cache.inner().finds.load(Ordering::SeqCst), 1);
        let metrics = cache.metrics();
        assert_eq!(metrics.exists_entries, 1);
        assert_eq!(metrics.find_entries, 1);
    }

    #[test]
    fn test_clear_forces_requery() {
        let cache = CachingGraph::new(CountingGraph::new(labels()), ResultCacheConfig::default());
        let pattern = TripleMatch::any();
        cache.find(&pattern).unwrap();
        cache.clear();
        assert_eq!(cache.metrics().size_bytes, 0);
        cache.find(&pattern).unwrap();
        assert_eq!(cache.inner().finds.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cache_over_mapped_graph_saves_statements() {
        let connection = Arc::new(FakeConnection::new(Vendor::Sql92).with_rows(
            "\"people\".\"name\"",
            vec![row(&["1", "Ann"]), row(&["2", "Bob"])],
        ));
        let mapping = Mapping::from_yaml_str(
            r#"
databases:
  - name: crm
bridges:
  - name: person_name
    database: crm
    subject: { pattern: "http://ex/person/@@people.id@@" }
    predicate: http://xmlns.com/foaf/0.1/name
    object: { column: people.name }
"#,
        )
        .unwrap();
        let registry = ConnectionRegistry::new().with_connection("crm", connection.clone());
        let graph = MappedGraph::new(mapping.into_bridges(), Arc::new(registry), EngineConfig::default());
        let cache = CachingGraph::with_defaults(graph);

        let names = TripleMatch::new(None, Some(Node::uri("http://xmlns.com/foaf/0.1/name")), None);
        assert_eq!(cache.find(&names).unwrap().len(), 2);
        assert_eq!(cache.find(&names).unwrap().len(), 2);
        assert_eq!(connection.execution_count(), 1);

        assert!(cache.contains(&names).unwrap());
        assert!(cache.contains(&names).unwrap());
        assert_eq!(connection.execution_count(), 2);

        assert!(matches!(
            cache.add(&label("http://ex/a", "alpha")),
            Err(GraphError::ReadOnly { .. })
        ));
    }
}
