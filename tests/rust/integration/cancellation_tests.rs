//! Cancelling a running query through its binding iterator

#[cfg(test)]
mod cancellation_tests {
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::Duration;

    use relgraph::config::EngineConfig;
    use relgraph::execution::{ConnectionRegistry, DiagnosticSink};
    use relgraph::graph::MappedGraph;
    use relgraph::mapping::Mapping;
    use relgraph::node_maker::Node;
    use relgraph::sql_generator::Vendor;
    use relgraph::testing::{row, FakeConnection};

    const PEOPLE: &str = r#"
databases:
  - name: crm
bridges:
  - name: person_name
    database: crm
    subject: { pattern: "http://ex/person/@@people.id@@" }
    predicate: http://xmlns.com/foaf/0.1/name
    object: { column: people.name }
"#;

    const QUERY: &str = "?p <http://xmlns.com/foaf/0.1/name> ?n";

    #[derive(Default)]
    struct RecordingSink {
        executed: Mutex<Vec<String>>,
        cancelled: Mutex<Vec<String>>,
    }

    impl DiagnosticSink for RecordingSink {
        fn sql_executed(&self, sql: &str) {
            self.executed.lock().unwrap().push(sql.to_string());
        }

        fn query_cancelled(&self, sql: &str) {
            self.cancelled.lock().unwrap().push(sql.to_string());
        }
    }

    fn people(connection: Arc<FakeConnection>, sink: Arc<RecordingSink>) -> MappedGraph {
        let mapping = Mapping::from_yaml_str(PEOPLE).unwrap();
        let registry = ConnectionRegistry::new().with_connection("crm", connection);
        MappedGraph::new(mapping.into_bridges(), Arc::new(registry), EngineConfig::default())
            .with_sink(sink)
    }

    fn three_people() -> FakeConnection {
        FakeConnection::new(Vendor::Sql92).with_rows(
            "\"people\".\"name\"",
            vec![row(&["1", "Ann"]), row(&["2", "Bob"]), row(&["3", "Cid"])],
        )
    }

    #[test]
    fn test_cancel_before_start_is_ignored() {
        let connection = Arc::new(three_people());
        let sink = Arc::new(RecordingSink::default());
        let graph = people(connection.clone(), sink.clone());

        let bindings = graph.query_text(QUERY).unwrap();
        let handle = bindings.cancel_handle();
        handle.cancel();
        assert!(!handle.is_cancelled());

        let names: Vec<Node> = bindings.map(|b| b.unwrap()["n"].clone()).collect();
        assert_eq!(names.len(), 3);
        assert!(sink.cancelled.lock().unwrap().is_empty());
        assert_eq!(sink.executed.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_cancel_after_first_row() {
        let connection = Arc::new(three_people());
        let sink = Arc::new(RecordingSink::default());
        let graph = people(connection.clone(), sink.clone());

        let mut bindings = graph.query_text(QUERY).unwrap();
        let first = bindings.next().unwrap().unwrap();
        assert_eq!(first["n"], Node::plain_literal("Ann"));
        assert_eq!(first["p"], Node::uri("http://ex/person/1"));

        bindings.cancel_handle().cancel();
        let err = bindings.next().unwrap().unwrap_err();
        assert!(err.is_cancelled(), "{:?}", err);
        assert!(bindings.next().is_none());

        let cancelled = sink.cancelled.lock().unwrap().clone();
        assert_eq!(cancelled, sink.executed.lock().unwrap().clone());
        assert_eq!(connection.closed_cursors(), 1);

        let calls = connection.hook_calls();
        let position = |name: &str| calls.iter().position(|c| c == name).unwrap();
        assert!(position("before_cancel") < position("after_cancel"));
        assert!(position("after_cancel") < position("before_close"));
    }

    #[test]
    fn test_cancel_from_another_thread() {
        let connection = Arc::new(
            FakeConnection::new(Vendor::Sql92)
                .with_rows("\"people\".\"name\"", vec![row(&["1", "Ann"])])
                .with_blocking("\"people\".\"name\""),
        );
        let sink = Arc::new(RecordingSink::default());
        let graph = people(connection.clone(), sink);

        let mut bindings = graph.query_text(QUERY).unwrap();
        assert!(bindings.next().unwrap().is_ok());

        let handle = bindings.cancel_handle();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            handle.cancel();
        });

        // blocks in the fetch until the other thread cancels
        let err = bindings.next().unwrap().unwrap_err();
        canceller.join().unwrap();
        assert!(err.is_cancelled(), "{:?}", err);
        assert!(bindings.next().is_none());
    }

    #[test]
    fn test_close_releases_cursor() {
        let connection = Arc::new(three_people());
        let graph = people(connection.clone(), Arc::new(RecordingSink::default()));

        let mut bindings = graph.query_text(QUERY).unwrap();
        bindings.next().unwrap().unwrap();
        bindings.close().unwrap();
        bindings.close().unwrap();
        assert_eq!(connection.closed_cursors(), 1);
        assert!(bindings.next().is_none());
    }
}
