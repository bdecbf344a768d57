use std::collections::BTreeMap;

use super::errors::NodeMakerError;

/// A fixed two-way mapping between database values and graph values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TranslationTable {
    name: String,
    to_graph: BTreeMap<String, String>,
    to_database: BTreeMap<String, String>,
}

impl TranslationTable {
    pub fn new(
        name: impl Into<String>,
        pairs: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, NodeMakerError> {
        let name = name.into();
        let mut to_graph = BTreeMap::new();
        let mut to_database = BTreeMap::new();
        for (db_value, graph_value) in pairs {
            if to_graph.insert(db_value.clone(), graph_value.clone()).is_some()
                || to_database.insert(graph_value, db_value.clone()).is_some()
            {
                return Err(NodeMakerError::AmbiguousTranslation {
                    table: name,
                    value: db_value,
                });
            }
        }
        Ok(TranslationTable {
            name,
            to_graph,
            to_database,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn to_graph_value(&self, db_value: &str) -> Option<&str> {
        self.to_graph.get(db_value).map(String::as_str)
    }

    pub fn to_database_value(&self, graph_value: &str) -> Option<&str> {
        self.to_database.get(graph_value).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.to_graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_graph.is_empty()
    }
}
