//! Unit tests for graph pattern translation against compiled bridges

#[cfg(test)]
mod translation_tests {
    use relgraph::config::EngineConfig;
    use relgraph::mapping::Mapping;
    use relgraph::node_maker::Node;
    use relgraph::query_planner::{parse_patterns, GraphPatternTranslator, PatternTerm, TriplePattern};

    const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

    /// Two ways of producing instances of ex:Class1: one bridge builds the
    /// URI from a pattern, the other reads it from a column.
    const CLASS_MAPPING: &str = r#"
databases:
  - name: db
bridges:
  - name: class1_by_pattern
    database: db
    subject: { pattern: "http://ex/res@@items.id@@" }
    predicate: http://www.w3.org/1999/02/22-rdf-syntax-ns#type
    object: http://ex/Class1
  - name: class1_by_column
    database: db
    subject: { column: legacy.uri, term_type: uri }
    predicate: http://www.w3.org/1999/02/22-rdf-syntax-ns#type
    object: http://ex/Class1
  - name: label
    database: db
    subject: { pattern: "http://ex/res@@items.id@@" }
    predicate: http://www.w3.org/2000/01/rdf-schema#label
    object: { column: items.label }
"#;

    fn type_pattern(subject: PatternTerm) -> TriplePattern {
        TriplePattern::new(
            subject,
            Node::uri(RDF_TYPE).into(),
            Node::uri("http://ex/Class1").into(),
        )
    }

    #[test]
    fn test_uri_maker_rule_skips_column_bridge() {
        let mapping = Mapping::from_yaml_str(CLASS_MAPPING).unwrap();
        let pattern = [type_pattern(Node::uri("http://ex/res1").into())];

        let optimized = GraphPatternTranslator::new(mapping.bridges(), &EngineConfig::default());
        assert_eq!(optimized.translate(&pattern).unwrap().len(), 1);

        let config = EngineConfig {
            use_all_optimizations: false,
            ..Default::default()
        };
        let plain = GraphPatternTranslator::new(mapping.bridges(), &config);
        assert_eq!(plain.translate(&pattern).unwrap().len(), 2);
    }

    #[test]
    fn test_uri_maker_rule_ignores_variables() {
        let mapping = Mapping::from_yaml_str(CLASS_MAPPING).unwrap();
        let translator = GraphPatternTranslator::new(mapping.bridges(), &EngineConfig::default());
        let result = translator
            .translate(&[type_pattern(PatternTerm::variable("x"))])
            .unwrap();
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_translation_is_idempotent() {
        let mapping = Mapping::from_yaml_str(CLASS_MAPPING).unwrap();
        let translator = GraphPatternTranslator::new(mapping.bridges(), &EngineConfig::default());
        let patterns = parse_patterns(
            "?x a <http://ex/Class1> ; rdfs:label ?label .",
        )
        .unwrap();
        let first = translator.translate(&patterns).unwrap();
        assert!(!first.is_empty());
        assert_eq!(first, translator.translate(&patterns).unwrap());
    }

    #[test]
    fn test_incompatible_uri_shapes_are_dropped() {
        let mapping = Mapping::from_yaml_str(CLASS_MAPPING).unwrap();
        let translator = GraphPatternTranslator::new(mapping.bridges(), &EngineConfig::default());
        let pattern = [type_pattern(Node::uri("http://other/thing").into())];
        let result = translator.translate(&pattern).unwrap();
        // Only the URI column could hold an arbitrary URI
        assert_eq!(result.len(), 1);
        assert!(result[0].relation().tables().iter().all(|t| t.table().ends_with("legacy")));
    }
}
