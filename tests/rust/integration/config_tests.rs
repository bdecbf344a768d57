//! Loading engine, cache and mapping configuration from files and the
//! environment

#[cfg(test)]
mod config_tests {
    use std::env;
    use std::io::Write;

    use relgraph::config::{ConfigError, EngineConfig, ResultCacheConfig};
    use relgraph::mapping::{Mapping, MappingError};
    use serial_test::serial;
    use tempfile::NamedTempFile;

    fn yaml_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    #[serial]
    fn test_engine_config_from_env() {
        env::set_var("RELGRAPH_GROUP_RELATIONS", "false");
        env::set_var("RELGRAPH_DEDUPLICATE_RESULTS", "false");
        let config = EngineConfig::from_env();
        env::remove_var("RELGRAPH_GROUP_RELATIONS");
        env::remove_var("RELGRAPH_DEDUPLICATE_RESULTS");

        let config = config.unwrap();
        assert!(!config.group_compatible_relations);
        assert!(!config.deduplicate_find_results);
        assert!(config.use_all_optimizations);
        assert_eq!(config.max_combinations, 10_000);
    }

    #[test]
    #[serial]
    fn test_engine_config_rejects_zero_combinations() {
        env::set_var("RELGRAPH_MAX_COMBINATIONS", "0");
        let result = EngineConfig::from_env();
        env::remove_var("RELGRAPH_MAX_COMBINATIONS");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    #[serial]
    fn test_cache_config_from_env() {
        env::set_var("RELGRAPH_CACHE_ENABLED", "false");
        env::set_var("RELGRAPH_CACHE_MAX_FIND_ENTRIES", "5");
        env::set_var("RELGRAPH_CACHE_LITERAL_WEIGHT", "2");
        let config = ResultCacheConfig::from_env();
        env::remove_var("RELGRAPH_CACHE_ENABLED");
        env::remove_var("RELGRAPH_CACHE_MAX_FIND_ENTRIES");
        env::remove_var("RELGRAPH_CACHE_LITERAL_WEIGHT");

        let config = config.unwrap();
        assert!(!config.enabled);
        assert_eq!(config.max_find_entries, 5);
        assert_eq!(config.literal_weight, 2);
        assert_eq!(config.uri_weight, 1);
    }

    #[test]
    #[serial]
    fn test_cache_config_rejects_empty_tables() {
        env::set_var("RELGRAPH_CACHE_MAX_EXISTS_ENTRIES", "0");
        let result = ResultCacheConfig::from_env();
        env::remove_var("RELGRAPH_CACHE_MAX_EXISTS_ENTRIES");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_engine_config_from_yaml_file() {
        let file = yaml_file("use_all_optimizations: false\nmax_combinations: 12\n");
        let config = EngineConfig::from_yaml_file(file.path()).unwrap();
        assert!(!config.use_all_optimizations);
        assert_eq!(config.max_combinations, 12);
        assert!(config.deduplicate_find_results);

        let invalid = yaml_file("max_combinations: 0\n");
        assert!(matches!(
            EngineConfig::from_yaml_file(invalid.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_mapping_from_yaml_file() {
        let file = yaml_file(
            r#"
databases:
  - name: crm
    vendor: postgresql
    column_types:
      people.age: integer
bridges:
  - name: person_age
    database: crm
    subject: { pattern: "http://ex/person/@@people.id@@" }
    predicate: http://ex/age
    object:
      column: people.age
      datatype: http://www.w3.org/2001/XMLSchema#integer
"#,
        );
        let mapping = Mapping::from_yaml_file(file.path()).unwrap();
        assert_eq!(mapping.bridges().len(), 1);
        assert_eq!(mapping.database_names().collect::<Vec<_>>(), vec!["crm"]);
        assert!(mapping.database("crm").is_some());
    }

    #[test]
    fn test_missing_mapping_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Mapping::from_yaml_file(dir.path().join("absent.yaml"));
        assert!(matches!(result, Err(MappingError::ReadError { .. })));
    }

    #[test]
    fn test_malformed_mapping_file() {
        let file = yaml_file("bridges: [unclosed");
        let result = Mapping::from_yaml_file(file.path());
        assert!(matches!(result, Err(MappingError::ParseError { .. })));
    }
}
