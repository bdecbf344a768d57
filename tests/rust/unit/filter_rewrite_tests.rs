//! Unit tests for filter normalisation and pushdown

#[cfg(test)]
mod filter_rewrite_tests {
    use std::sync::Arc;

    use relgraph::config::EngineConfig;
    use relgraph::execution::ConnectionRegistry;
    use relgraph::graph::MappedGraph;
    use relgraph::mapping::Mapping;
    use relgraph::query_planner::optimizer::{conjuncts, to_cnf, FilterExpr};
    use relgraph::query_planner::{parse_filter, parse_query};

    fn var(name: &str) -> FilterExpr {
        FilterExpr::variable(name)
    }

    #[test]
    fn test_negated_conjunction_of_atoms_is_unchanged() {
        let filter = parse_filter("!(?a && ?b)").unwrap();
        assert_eq!(filter, FilterExpr::not(FilterExpr::and(var("a"), var("b"))));
        assert_eq!(to_cnf(&filter), filter);
    }

    #[test]
    fn test_negated_disjunction_uses_de_morgan() {
        let filter = parse_filter("!(?a || ?b)").unwrap();
        assert_eq!(
            to_cnf(&filter),
            FilterExpr::and(FilterExpr::not(var("a")), FilterExpr::not(var("b")))
        );
        assert_eq!(
            conjuncts(&filter),
            vec![FilterExpr::not(var("a")), FilterExpr::not(var("b"))]
        );
    }

    const PEOPLE: &str = r#"
databases:
  - name: hr
    vendor: postgresql
    column_types:
      people.age: INT
bridges:
  - name: age
    database: hr
    subject: { pattern: "http://ex/person/@@people.id@@" }
    predicate: http://ex/age
    object: { column: people.age, datatype: "http://www.w3.org/2001/XMLSchema#integer" }
  - name: name
    database: hr
    subject: { pattern: "http://ex/person/@@people.id@@" }
    predicate: http://ex/name
    object: { column: people.name, language: en }
"#;

    fn graph() -> MappedGraph {
        let mapping = Mapping::from_yaml_str(PEOPLE).unwrap();
        MappedGraph::new(
            mapping.into_bridges(),
            Arc::new(ConnectionRegistry::new()),
            EngineConfig::default(),
        )
    }

    fn explain(text: &str) -> Vec<String> {
        let query = parse_query(text).unwrap();
        graph().explain(&query.patterns, query.filter.as_ref()).unwrap()
    }

    #[test]
    fn test_numeric_comparison_reaches_sql() {
        let statements = explain("?p <http://ex/age> ?age FILTER(?age > 30)");
        assert_eq!(statements.len(), 1);
        assert!(statements[0].contains("\"people\".\"age\" > "), "{}", statements[0]);
    }

    #[test]
    fn test_impossible_filter_removes_statement() {
        assert!(explain("?p <http://ex/name> ?n FILTER(lang(?n) = \"de\")").is_empty());
        assert!(explain("?p <http://ex/name> ?n FILTER isIRI(?n)").is_empty());
        assert_eq!(explain("?p <http://ex/name> ?n FILTER(lang(?n) = \"en\")").len(), 1);
    }

    #[test]
    fn test_uri_equality_becomes_column_condition() {
        let statements = explain("?p <http://ex/name> ?n FILTER(?p = <http://ex/person/42>)");
        assert_eq!(statements.len(), 1);
        assert!(statements[0].contains("\"people\".\"id\" = '42'"), "{}", statements[0]);
    }
}
