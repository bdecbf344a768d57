//! Serde model of a mapping document.
//!
//! ```yaml
//! databases:
//!   - name: shop
//!     vendor: postgresql
//!     column_types:
//!       people.id: INT
//! translation_tables:
//!   - name: colors
//!     pairs:
//!       - { database: "1", graph: "http://ex/red" }
//! bridges:
//!   - name: person_name
//!     database: shop
//!     subject: { pattern: "http://ex/person/@@people.id@@" }
//!     predicate: http://ex/name
//!     object: { column: people.name, language: en }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::MappingError;
use crate::sql_generator::Vendor;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MappingDocument {
    #[serde(default)]
    pub databases: Vec<DatabaseDefinition>,
    #[serde(default)]
    pub translation_tables: Vec<TranslationTableDefinition>,
    pub bridges: Vec<BridgeDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseDefinition {
    pub name: String,
    #[serde(default)]
    pub vendor: Vendor,
    /// `table.column` to vendor type name, e.g. `people.id: INT`
    #[serde(default)]
    pub column_types: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranslationTableDefinition {
    pub name: String,
    pub pairs: Vec<TranslationPair>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranslationPair {
    pub database: String,
    pub graph: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BridgeDefinition {
    pub name: String,
    pub database: String,
    /// Declarations like `people AS boss`
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub joins: Vec<JoinDefinition>,
    /// SQL condition over qualified columns
    #[serde(default)]
    pub condition: Option<String>,
    /// Rows are already distinct, so no DISTINCT is needed
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub limit: Option<u64>,
    /// Limit applied when the bridge is read from the object side
    #[serde(default)]
    pub limit_inverse: Option<u64>,
    #[serde(default)]
    pub order: Option<OrderDefinition>,
    pub subject: NodeMakerDefinition,
    pub predicate: NodeMakerDefinition,
    pub object: NodeMakerDefinition,
}

/// `people.id = emails.person`, optionally as an outer join.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum JoinDefinition {
    Inner(String),
    Detailed {
        on: String,
        #[serde(default)]
        outer: Option<OuterSide>,
    },
}

impl JoinDefinition {
    pub fn condition(&self) -> &str {
        match self {
            JoinDefinition::Inner(on) | JoinDefinition::Detailed { on, .. } => on,
        }
    }

    pub fn outer(&self) -> Option<OuterSide> {
        match self {
            JoinDefinition::Inner(_) => None,
            JoinDefinition::Detailed { outer, .. } => *outer,
        }
    }
}

/// The side whose rows are kept by an outer join.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OuterSide {
    Left,
    Right,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderDefinition {
    pub column: String,
    #[serde(default)]
    pub descending: bool,
}

/// A constant URI, or a full node maker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum NodeMakerDefinition {
    Uri(String),
    Detailed(Box<NodeMakerSpec>),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct NodeMakerSpec {
    pub constant: Option<String>,
    pub column: Option<String>,
    pub pattern: Option<String>,
    pub sql_expression: Option<String>,
    pub blank_node_columns: Option<Vec<String>>,

    pub term_type: Option<TermType>,
    pub language: Option<String>,
    pub datatype: Option<String>,
    /// Each row produces a distinct node
    pub unique: bool,

    pub max_length: Option<usize>,
    pub contains: Option<String>,
    pub regex: Option<String>,
    pub translate_with: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TermType {
    Uri,
    Blank,
    Literal,
}

impl MappingDocument {
    /// Load a mapping from a YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, MappingError> {
        let contents = fs::read_to_string(path).map_err(|e| MappingError::ReadError {
            error: e.to_string(),
        })?;

        Self::from_yaml_str(&contents)
    }

    /// Parse a mapping from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, MappingError> {
        serde_yaml::from_str(yaml).map_err(|e| MappingError::ParseError {
            error: e.to_string(),
        })
    }

    /// Checks names are unique and references resolve
    pub fn validate(&self) -> Result<(), MappingError> {
        if self.bridges.is_empty() {
            return Err(MappingError::InvalidMapping {
                message: "Mapping must contain at least one bridge".to_string(),
            });
        }

        let mut databases = std::collections::HashSet::new();
        for database in &self.databases {
            if !databases.insert(database.name.as_str()) {
                return Err(MappingError::InvalidMapping {
                    message: format!("Duplicate database: {}", database.name),
                });
            }
        }

        let mut tables = std::collections::HashSet::new();
        for table in &self.translation_tables {
            if !tables.insert(table.name.as_str()) {
                return Err(MappingError::InvalidMapping {
                    message: format!("Duplicate translation table: {}", table.name),
                });
            }
        }

        let mut bridges = std::collections::HashSet::new();
        for bridge in &self.bridges {
            if !bridges.insert(bridge.name.as_str()) {
                return Err(MappingError::InvalidMapping {
                    message: format!("Duplicate bridge: {}", bridge.name),
                });
            }
            if !databases.contains(bridge.database.as_str()) {
                return Err(MappingError::bridge(
                    &bridge.name,
                    format!("unknown database '{}'", bridge.database),
                ));
            }
            for maker in [&bridge.subject, &bridge.predicate, &bridge.object] {
                if let NodeMakerDefinition::Detailed(spec) = maker {
                    if let Some(name) = &spec.translate_with {
                        if !tables.contains(name.as_str()) {
                            return Err(MappingError::bridge(
                                &bridge.name,
                                format!("unknown translation table '{}'", name),
                            ));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
