//! Compiles a [`MappingDocument`] into bridges.

use std::collections::BTreeMap;
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use super::document::{
    BridgeDefinition, DatabaseDefinition, JoinDefinition, MappingDocument, NodeMakerDefinition,
    NodeMakerSpec, OuterSide, TermType,
};
use super::errors::MappingError;
use crate::expression::Expression;
use crate::node_maker::{
    BlankNodeId, Node, NodeMaker, NodeType, Pattern, TranslationTable, ValueConstraint,
    ValueMaker, ValueRegex,
};
use crate::query_planner::TripleRelation;
use crate::relational::{
    AliasMap, Attribute, DatabaseHandle, Join, JoinDirection, OrderSpec, RelationBuilder,
};
use crate::sql_generator::SqlDataType;

lazy_static! {
    static ref JOIN_CONJUNCTION: Regex = Regex::new(r"(?i)\s+and\s+").expect("valid regex");
}

/// Bridges compiled from a mapping document, with the databases they read.
#[derive(Debug, Clone)]
pub struct Mapping {
    databases: BTreeMap<String, DatabaseHandle>,
    bridges: Vec<TripleRelation>,
}

impl Mapping {
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, MappingError> {
        Self::compile(&MappingDocument::from_yaml_file(path)?)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, MappingError> {
        Self::compile(&MappingDocument::from_yaml_str(yaml)?)
    }

    pub fn compile(document: &MappingDocument) -> Result<Self, MappingError> {
        document.validate()?;

        let databases: BTreeMap<String, DatabaseHandle> = document
            .databases
            .iter()
            .map(|d| Ok((d.name.clone(), database_handle(d)?)))
            .collect::<Result<_, MappingError>>()?;

        let mut tables = BTreeMap::new();
        for table in &document.translation_tables {
            let pairs = table
                .pairs
                .iter()
                .map(|p| (p.database.clone(), p.graph.clone()));
            let compiled = TranslationTable::new(table.name.as_str(), pairs).map_err(|e| {
                MappingError::InvalidMapping {
                    message: e.to_string(),
                }
            })?;
            tables.insert(table.name.clone(), compiled);
        }

        let mut bridges = Vec::with_capacity(document.bridges.len());
        for bridge in &document.bridges {
            let compiled = BridgeCompiler {
                bridge,
                tables: &tables,
            }
            .compile(&databases)?;
            log::trace!("Compiled bridge '{}': {}", bridge.name, compiled);
            bridges.push(compiled);
        }

        log::info!(
            "Loaded mapping with {} bridge(s) over {} database(s)",
            bridges.len(),
            databases.len()
        );
        Ok(Mapping { databases, bridges })
    }

    pub fn bridges(&self) -> &[TripleRelation] {
        &self.bridges
    }

    pub fn into_bridges(self) -> Vec<TripleRelation> {
        self.bridges
    }

    pub fn database(&self, name: &str) -> Option<&DatabaseHandle> {
        self.databases.get(name)
    }

    pub fn database_names(&self) -> impl Iterator<Item = &str> {
        self.databases.keys().map(String::as_str)
    }
}

fn database_handle(definition: &DatabaseDefinition) -> Result<DatabaseHandle, MappingError> {
    let column_types = definition
        .column_types
        .iter()
        .map(|(column, type_name)| {
            let attribute = Attribute::parse(column).map_err(|e| MappingError::InvalidMapping {
                message: format!("database '{}': {}", definition.name, e),
            })?;
            Ok((attribute, SqlDataType::from_type_name(type_name)))
        })
        .collect::<Result<_, MappingError>>()?;
    Ok(DatabaseHandle::new(&definition.name, definition.vendor).with_column_types(column_types))
}

struct BridgeCompiler<'a> {
    bridge: &'a BridgeDefinition,
    tables: &'a BTreeMap<String, TranslationTable>,
}

impl BridgeCompiler<'_> {
    fn error(&self, message: impl Into<String>) -> MappingError {
        MappingError::bridge(&self.bridge.name, message)
    }

    fn attribute(&self, qualified: &str) -> Result<Attribute, MappingError> {
        Attribute::parse(qualified.trim())
            .map_err(|e| MappingError::from_relational(&self.bridge.name, e))
    }

    fn compile(
        &self,
        databases: &BTreeMap<String, DatabaseHandle>,
    ) -> Result<TripleRelation, MappingError> {
        let bridge = self.bridge;
        let database = databases
            .get(&bridge.database)
            .ok_or_else(|| self.error(format!("unknown database '{}'", bridge.database)))?;

        let mut builder = RelationBuilder::new(database.clone());
        if !bridge.aliases.is_empty() {
            let pairs = bridge
                .aliases
                .iter()
                .map(|a| AliasMap::parse_declaration(a))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| MappingError::from_relational(&bridge.name, e))?;
            let aliases = AliasMap::from_pairs(pairs)
                .map_err(|e| MappingError::from_relational(&bridge.name, e))?;
            builder
                .add_aliases(&aliases)
                .map_err(|e| MappingError::from_relational(&bridge.name, e))?;
        }
        builder.add_joins(self.joins()?);
        if let Some(condition) = &bridge.condition {
            builder.add_condition(Expression::sql(condition));
        }
        builder.set_unique(bridge.unique);
        builder.restrict_limit(bridge.limit);
        builder.restrict_limit_inverse(bridge.limit_inverse);
        if let Some(order) = &bridge.order {
            let column = self.attribute(&order.column)?;
            builder.add_order([OrderSpec::new(Expression::attribute(&column), !order.descending)]);
        }

        Ok(TripleRelation::new(
            builder.freeze(),
            self.node_maker(&bridge.subject, "subject")?,
            self.node_maker(&bridge.predicate, "predicate")?,
            self.node_maker(&bridge.object, "object")?,
        ))
    }

    fn joins(&self) -> Result<Vec<Join>, MappingError> {
        let mut by_direction: BTreeMap<JoinDirection, Vec<(Attribute, Attribute)>> = BTreeMap::new();
        for join in &self.bridge.joins {
            let direction = match join.outer() {
                None => JoinDirection::Undirected,
                Some(OuterSide::Left) => JoinDirection::Left,
                Some(OuterSide::Right) => JoinDirection::Right,
            };
            let pairs = by_direction.entry(direction).or_default();
            for equality in JOIN_CONJUNCTION.split(join.condition()) {
                pairs.push(self.join_equality(join, equality)?);
            }
        }

        let mut joins = Vec::new();
        for (direction, pairs) in by_direction {
            joins.extend(
                Join::build(pairs, direction)
                    .map_err(|e| MappingError::from_relational(&self.bridge.name, e))?,
            );
        }
        Ok(joins)
    }

    fn join_equality(
        &self,
        join: &JoinDefinition,
        equality: &str,
    ) -> Result<(Attribute, Attribute), MappingError> {
        match equality.split_once('=') {
            Some((left, right)) if !right.contains('=') => {
                Ok((self.attribute(left)?, self.attribute(right)?))
            }
            _ => Err(self.error(format!(
                "join '{}' must be 'table.column = table.column'",
                join.condition()
            ))),
        }
    }

    fn node_maker(
        &self,
        definition: &NodeMakerDefinition,
        position: &str,
    ) -> Result<NodeMaker, MappingError> {
        let spec = match definition {
            NodeMakerDefinition::Uri(uri) => return Ok(NodeMaker::Fixed(Node::uri(uri.as_str()))),
            NodeMakerDefinition::Detailed(spec) => spec,
        };

        let sources = [
            spec.constant.is_some(),
            spec.column.is_some(),
            spec.pattern.is_some(),
            spec.sql_expression.is_some(),
            spec.blank_node_columns.is_some(),
        ];
        if sources.iter().filter(|s| **s).count() != 1 {
            return Err(self.error(format!(
                "{} needs exactly one of constant, column, pattern, sql_expression or blank_node_columns",
                position
            )));
        }

        let node_type = self.node_type(spec, position)?;
        if let Some(constant) = &spec.constant {
            return node_type
                .make_node(constant)
                .map(NodeMaker::Fixed)
                .ok_or_else(|| {
                    self.error(format!("{} constant '{}' is not a valid {:?} term", position, constant, node_type))
                });
        }

        let base = if let Some(column) = &spec.column {
            ValueMaker::Column(self.attribute(column)?)
        } else if let Some(pattern) = &spec.pattern {
            ValueMaker::Pattern(
                Pattern::parse(pattern)
                    .map_err(|e| MappingError::from_node_maker(&self.bridge.name, e))?,
            )
        } else if let Some(expression) = &spec.sql_expression {
            ValueMaker::SqlExpression(Expression::sql(expression))
        } else {
            let columns = spec.blank_node_columns.as_deref().unwrap_or_default();
            if columns.is_empty() {
                return Err(self.error(format!("{} blank_node_columns is empty", position)));
            }
            let attributes = columns
                .iter()
                .map(|c| self.attribute(c))
                .collect::<Result<Vec<_>, _>>()?;
            ValueMaker::BlankNodeId(BlankNodeId::new(self.bridge.name.as_str(), attributes))
        };

        let mut constraints = Vec::new();
        if let Some(max) = spec.max_length {
            constraints.push(ValueConstraint::MaxLength(max));
        }
        if let Some(needle) = &spec.contains {
            constraints.push(ValueConstraint::Contains(needle.clone()));
        }
        if let Some(regex) = &spec.regex {
            constraints.push(ValueConstraint::Regex(
                ValueRegex::new(regex).map_err(|e| MappingError::from_node_maker(&self.bridge.name, e))?,
            ));
        }
        let translator = match &spec.translate_with {
            Some(name) => Some(
                self.tables
                    .get(name)
                    .cloned()
                    .ok_or_else(|| self.error(format!("unknown translation table '{}'", name)))?,
            ),
            None => None,
        };

        Ok(NodeMaker::typed(
            node_type,
            ValueMaker::decorate(base, constraints, translator),
            spec.unique,
        ))
    }

    /// Explicit `term_type`, otherwise: blank for blank node columns,
    /// literal when a language or datatype is given or the value comes from
    /// a column or SQL expression, URI for patterns and constants.
    fn node_type(&self, spec: &NodeMakerSpec, position: &str) -> Result<NodeType, MappingError> {
        let is_blank_source = spec.blank_node_columns.is_some();
        let term_type = spec.term_type.unwrap_or(
            if is_blank_source {
                TermType::Blank
            } else if spec.language.is_some()
                || spec.datatype.is_some()
                || spec.column.is_some()
                || spec.sql_expression.is_some()
            {
                TermType::Literal
            } else {
                TermType::Uri
            },
        );

        if is_blank_source != (term_type == TermType::Blank) {
            return Err(self.error(format!(
                "{}: blank nodes are made from blank_node_columns only",
                position
            )));
        }
        if term_type != TermType::Literal && (spec.language.is_some() || spec.datatype.is_some()) {
            return Err(self.error(format!("{}: only literals have a language or datatype", position)));
        }

        Ok(match term_type {
            TermType::Uri => NodeType::Uri,
            TermType::Blank => NodeType::Blank,
            TermType::Literal => match (&spec.language, &spec.datatype) {
                (Some(_), Some(_)) => {
                    return Err(self.error(format!(
                        "{}: a literal has a language or a datatype, not both",
                        position
                    )))
                }
                (Some(language), None) => NodeType::lang_literal(language),
                (None, Some(datatype)) => NodeType::typed_literal(datatype),
                (None, None) => NodeType::plain_literal(),
            },
        })
    }
}
