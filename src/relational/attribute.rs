use std::fmt;

use super::errors::RelationalError;

/// A table, or a derived alias of one.
///
/// `case_unspecified` names were written without quotes in the mapping and
/// are rendered bare, letting the database apply its own case folding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationName {
    schema: Option<String>,
    table: String,
    case_unspecified: bool,
}

impl RelationName {
    pub fn new(schema: Option<&str>, table: impl Into<String>) -> Self {
        RelationName {
            schema: schema.map(str::to_string),
            table: table.into(),
            case_unspecified: false,
        }
    }

    pub fn case_insensitive(schema: Option<&str>, table: impl Into<String>) -> Self {
        RelationName {
            case_unspecified: true,
            ..Self::new(schema, table)
        }
    }

    /// Parse `table` or `schema.table`.
    pub fn parse(qualified: &str) -> Result<Self, RelationalError> {
        let parts: Vec<&str> = qualified.trim().split('.').collect();
        if parts.iter().any(|p| p.trim().is_empty()) {
            return Err(RelationalError::InvalidRelationName(qualified.to_string()));
        }
        match parts.as_slice() {
            [table] => Ok(Self::new(None, table.trim())),
            [schema, table] => Ok(Self::new(Some(schema.trim()), table.trim())),
            _ => Err(RelationalError::InvalidRelationName(qualified.to_string())),
        }
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn is_case_unspecified(&self) -> bool {
        self.case_unspecified
    }

    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.table),
            None => self.table.clone(),
        }
    }

    /// Alias name used when the same table appears several times in one
    /// statement: `T3_schema_table`.
    pub fn with_prefix(&self, index: usize) -> RelationName {
        let table = match &self.schema {
            Some(schema) => format!("T{}_{}_{}", index, schema, self.table),
            None => format!("T{}_{}", index, self.table),
        };
        RelationName {
            schema: None,
            table,
            case_unspecified: self.case_unspecified,
        }
    }
}

impl fmt::Display for RelationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified_name())
    }
}

/// A qualified column reference.
///
/// Ordering is by relation name, then column, which keeps generated SQL
/// text deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Attribute {
    relation: RelationName,
    column: String,
}

impl Attribute {
    pub fn new(relation: RelationName, column: impl Into<String>) -> Self {
        Attribute {
            relation,
            column: column.into(),
        }
    }

    /// Parse `table.column` or `schema.table.column`.
    pub fn parse(qualified: &str) -> Result<Self, RelationalError> {
        let trimmed = qualified.trim();
        let (relation, column) = trimmed
            .rsplit_once('.')
            .ok_or_else(|| RelationalError::InvalidAttribute(qualified.to_string()))?;
        if column.trim().is_empty() {
            return Err(RelationalError::InvalidAttribute(qualified.to_string()));
        }
        let relation = RelationName::parse(relation)
            .map_err(|_| RelationalError::InvalidAttribute(qualified.to_string()))?;
        Ok(Attribute::new(relation, column.trim()))
    }

    pub fn relation_name(&self) -> &RelationName {
        &self.relation
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.relation.qualified_name(), self.column)
    }

    pub fn with_relation(&self, relation: RelationName) -> Attribute {
        Attribute::new(relation, self.column.clone())
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified_name())
    }
}
