//! Integration tests for queries over a mapped graph

#[cfg(test)]
mod mapped_graph_tests {
    use std::sync::Arc;

    use relgraph::config::EngineConfig;
    use relgraph::execution::{ConnectionRegistry, DatabaseError, ExecutionError};
    use relgraph::graph::{Graph, GraphError, MappedGraph, Triple, TripleMatch};
    use relgraph::mapping::Mapping;
    use relgraph::node_maker::Node;
    use relgraph::query_planner::{parse_patterns, parse_query, Binding};
    use relgraph::sql_generator::Vendor;
    use relgraph::testing::{row, FakeConnection};

    const LIBRARY: &str = r#"
databases:
  - name: library
    vendor: postgresql
translation_tables:
  - name: genres
    pairs:
      - { database: "sf", graph: "http://ex/genre/ScienceFiction" }
      - { database: "fa", graph: "http://ex/genre/Fantasy" }
bridges:
  - name: book_title
    database: library
    unique: true
    subject: { pattern: "http://ex/book/@@books.id@@" }
    predicate: http://purl.org/dc/terms/title
    object: { column: books.title }
  - name: book_author
    database: library
    joins:
      - "books.author_id = authors.id"
    subject: { pattern: "http://ex/book/@@books.id@@" }
    predicate: http://purl.org/dc/terms/creator
    object: { pattern: "http://ex/author/@@authors.id@@" }
  - name: author_name
    database: library
    subject: { pattern: "http://ex/author/@@authors.id@@" }
    predicate: http://xmlns.com/foaf/0.1/name
    object: { column: authors.name }
  - name: book_genre
    database: library
    subject: { pattern: "http://ex/book/@@books.id@@" }
    predicate: http://ex/genre
    object: { column: books.genre, term_type: uri, translate_with: genres }
"#;

    fn library(connection: Arc<FakeConnection>) -> MappedGraph {
        let mapping = Mapping::from_yaml_str(LIBRARY).unwrap();
        let registry = ConnectionRegistry::new().with_connection("library", connection);
        MappedGraph::new(mapping.into_bridges(), Arc::new(registry), EngineConfig::default())
    }

    fn collect(graph: &MappedGraph, text: &str) -> Vec<Binding> {
        graph
            .query_text(text)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_find_by_predicate() {
        let connection = Arc::new(FakeConnection::new(Vendor::PostgreSql).with_rows(
            "\"books\".\"title\"",
            vec![row(&["1", "Dune"]), row(&["2", "Emma"])],
        ));
        let graph = library(connection.clone());
        let title = Node::uri("http://purl.org/dc/terms/title");
        let triples = graph
            .find(&TripleMatch::new(None, Some(title.clone()), None))
            .unwrap();
        assert_eq!(
            triples,
            vec![
                Triple::new(Node::uri("http://ex/book/1"), title.clone(), Node::plain_literal("Dune")),
                Triple::new(Node::uri("http://ex/book/2"), title, Node::plain_literal("Emma")),
            ]
        );
        let executed = connection.executed();
        assert_eq!(executed.len(), 1);
        // unique bridge
        assert!(!executed[0].contains("DISTINCT"), "{}", executed[0]);
    }

    #[test]
    fn test_join_across_triples() {
        let connection = Arc::new(FakeConnection::new(Vendor::PostgreSql));
        let graph = library(connection.clone());

        let undeclared = parse_patterns("?b dc:title ?t");
        assert!(undeclared.is_err());

        let query = parse_query(
            "PREFIX dc: <http://purl.org/dc/terms/>
             PREFIX foaf: <http://xmlns.com/foaf/0.1/>
             WHERE { ?b dc:title ?t ; dc:creator ?a . ?a foaf:name ?n }",
        )
        .unwrap();
        let statements = graph.explain(&query.patterns, None).unwrap();
        assert_eq!(statements.len(), 1);
        let sql = &statements[0];
        assert!(sql.contains("\"T0_books\".\"id\" = \"T1_books\".\"id\""), "{}", sql);
        assert!(sql.contains("\"T1_authors\".\"id\" = \"T2_authors\".\"id\""), "{}", sql);
        assert!(sql.contains("\"T1_authors\".\"id\" = \"T1_books\".\"author_id\""), "{}", sql);
        assert_eq!(connection.execution_count(), 0);
    }

    #[test]
    fn test_translated_values() {
        let connection = Arc::new(FakeConnection::new(Vendor::PostgreSql).with_rows(
            "\"books\".\"genre\"",
            vec![row(&["sf", "1"]), row(&["xx", "2"])],
        ));
        let graph = library(connection.clone());
        let bindings = collect(&graph, "?b <http://ex/genre> ?g");
        // "xx" has no translation and produces no binding
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0]["g"], Node::uri("http://ex/genre/ScienceFiction"));
        assert_eq!(bindings[0]["b"], Node::uri("http://ex/book/1"));

        let sql = graph
            .explain(
                &parse_patterns("?b <http://ex/genre> <http://ex/genre/Fantasy>").unwrap(),
                None,
            )
            .unwrap();
        assert!(sql[0].contains("\"books\".\"genre\" = 'fa'"), "{}", sql[0]);
    }

    #[test]
    fn test_residue_filter_runs_on_bindings() {
        let connection = Arc::new(FakeConnection::new(Vendor::PostgreSql).with_rows(
            "\"books\".\"title\"",
            vec![row(&["1", "Dune"]), row(&["2", "Emma"]), row(&["3", "Dracula"])],
        ));
        let graph = library(connection);
        let bindings = collect(
            &graph,
            "?b <http://purl.org/dc/terms/title> ?t FILTER(regex(?t, \"^d\", \"i\"))",
        );
        let titles: Vec<&str> = bindings.iter().map(|b| b["t"].label()).collect();
        assert_eq!(titles, vec!["Dune", "Dracula"]);
    }

    #[test]
    fn test_database_failure_surfaces_with_sql() {
        let connection = Arc::new(
            FakeConnection::new(Vendor::PostgreSql)
                .with_execute_failure("books", DatabaseError::Statement("relation does not exist".into())),
        );
        let graph = library(connection);
        let err = graph.find(&TripleMatch::any()).unwrap_err();
        match err {
            GraphError::Execution(ExecutionError::Database { sql, source }) => {
                assert!(sql.starts_with("SELECT "), "{}", sql);
                assert_eq!(source, DatabaseError::Statement("relation does not exist".into()));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_contains_stops_after_first_row() {
        let connection = Arc::new(
            FakeConnection::new(Vendor::PostgreSql)
                .with_rows("\"authors\".\"name\"", vec![row(&["Frank Herbert"])]),
        );
        let graph = library(connection.clone());
        let pattern = TripleMatch::new(
            Some(Node::uri("http://ex/author/7")),
            Some(Node::uri("http://xmlns.com/foaf/0.1/name")),
            None,
        );
        assert!(graph.contains(&pattern).unwrap());
        assert!(connection.executed()[0].ends_with("LIMIT 1"));
        assert_eq!(connection.closed_cursors(), 1);
    }

    const CONTACTS: &str = r#"
databases:
  - name: crm
    vendor: postgresql
bridges:
  - name: person_email
    database: crm
    subject: { pattern: "http://ex/person/@@people.id@@" }
    predicate: http://xmlns.com/foaf/0.1/mbox
    object: { column: people.email }
  - name: first_email
    database: crm
    limit: 1
    subject: { pattern: "http://ex/person/@@people.id@@" }
    predicate: http://ex/firstEmail
    object: { column: people.email }
"#;

    /// people(id, email) = (1, NULL), (2, 'b@x'), in SELECT list order
    fn contacts() -> (MappedGraph, Arc<FakeConnection>) {
        let connection = Arc::new(FakeConnection::new(Vendor::PostgreSql).with_rows(
            "\"people\".\"email\"",
            vec![
                vec![None, Some("1".to_string())],
                vec![Some("b@x".to_string()), Some("2".to_string())],
            ],
        ));
        let mapping = Mapping::from_yaml_str(CONTACTS).unwrap();
        let registry = ConnectionRegistry::new().with_connection("crm", connection.clone());
        let graph = MappedGraph::new(mapping.into_bridges(), Arc::new(registry), EngineConfig::default());
        (graph, connection)
    }

    #[test]
    fn test_null_columns_do_not_hide_results() {
        let (graph, connection) = contacts();
        let mbox = TripleMatch::new(None, Some(Node::uri("http://xmlns.com/foaf/0.1/mbox")), None);
        let expected = Triple::new(
            Node::uri("http://ex/person/2"),
            Node::uri("http://xmlns.com/foaf/0.1/mbox"),
            Node::plain_literal("b@x"),
        );
        assert_eq!(graph.find(&mbox).unwrap(), vec![expected]);
        assert!(graph.contains(&mbox).unwrap());

        let executed = connection.executed();
        assert!(executed[1].ends_with("LIMIT 1"), "{}", executed[1]);
        assert!(executed[1].contains("\"people\".\"email\" IS NOT NULL"), "{}", executed[1]);
    }

    #[test]
    fn test_bridge_limit_counts_only_usable_rows() {
        let (graph, _) = contacts();
        let first = TripleMatch::new(None, Some(Node::uri("http://ex/firstEmail")), None);
        let triples = graph.find(&first).unwrap();
        assert_eq!(triples.len(), 1);
        assert_eq!(triples[0].object, Node::plain_literal("b@x"));
    }
}
