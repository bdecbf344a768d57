use std::collections::BTreeSet;

use super::pattern::DELIMITER;
use super::value_maker::RowValues;
use crate::expression::Expression;
use crate::relational::{Attribute, ColumnRenamer, ProjectionSpec};

/// Blank node labels of the form `classId@@value1@@value2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlankNodeId {
    class_id: String,
    attributes: Vec<Attribute>,
}

impl BlankNodeId {
    pub fn new(class_id: impl Into<String>, attributes: Vec<Attribute>) -> Self {
        BlankNodeId {
            class_id: class_id.into(),
            attributes,
        }
    }

    pub fn class_id(&self) -> &str {
        &self.class_id
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn make_value(&self, row: &dyn RowValues) -> Option<String> {
        let mut result = self.class_id.clone();
        for attribute in &self.attributes {
            let value = row.value(&ProjectionSpec::Attribute(attribute.clone()))?;
            result.push_str(DELIMITER);
            result.push_str(value);
        }
        Some(result)
    }

    pub fn value_expression(&self, value: &str) -> Expression {
        let mut parts = value.split(DELIMITER);
        if parts.next() != Some(self.class_id.as_str()) {
            return Expression::False;
        }
        let values: Vec<&str> = parts.collect();
        if values.len() != self.attributes.len() {
            return Expression::False;
        }
        Expression::and(
            self.attributes
                .iter()
                .zip(values)
                .map(|(a, v)| Expression::attribute_equals_value(a, v)),
        )
    }

    pub fn sql_expression(&self) -> Expression {
        let mut parts = vec![Expression::constant(self.class_id.clone())];
        for attribute in &self.attributes {
            parts.push(Expression::constant(DELIMITER));
            parts.push(Expression::attribute(attribute));
        }
        Expression::concatenation(parts)
    }

    pub fn projection_specs(&self) -> BTreeSet<ProjectionSpec> {
        self.attributes
            .iter()
            .map(|a| ProjectionSpec::Attribute(a.clone()))
            .collect()
    }

    pub fn rename(&self, renamer: &dyn ColumnRenamer) -> BlankNodeId {
        BlankNodeId {
            class_id: self.class_id.clone(),
            attributes: self
                .attributes
                .iter()
                .map(|a| renamer.apply_to_attribute(a))
                .collect(),
        }
    }
}
