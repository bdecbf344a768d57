use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::blank_node_id::BlankNodeId;
use super::description::{ValueDescription, ValueShape};
use super::pattern::Pattern;
use super::translation_table::TranslationTable;
use super::value_constraint::ValueConstraint;
use crate::expression::Expression;
use crate::relational::{Attribute, ColumnRenamer, OrderSpec, ProjectionSpec};

/// Read access to one result row by projected column.
pub trait RowValues {
    fn value(&self, spec: &ProjectionSpec) -> Option<&str>;
}

impl RowValues for BTreeMap<ProjectionSpec, String> {
    fn value(&self, spec: &ProjectionSpec) -> Option<&str> {
        self.get(spec).map(String::as_str)
    }
}

/// Converts between database rows and string values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueMaker {
    Column(Attribute),
    Pattern(Pattern),
    BlankNodeId(BlankNodeId),
    Constant(String),
    /// A value computed by an SQL expression.
    SqlExpression(Expression),
    Decorated(Box<ValueDecorator>),
}

/// Restricts and optionally translates the values of another value maker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueDecorator {
    pub base: ValueMaker,
    pub constraints: Vec<ValueConstraint>,
    pub translator: Option<TranslationTable>,
}

impl ValueMaker {
    /// Wraps `base` only when there is something to add.
    pub fn decorate(
        base: ValueMaker,
        constraints: Vec<ValueConstraint>,
        translator: Option<TranslationTable>,
    ) -> ValueMaker {
        if constraints.is_empty() && translator.is_none() {
            return base;
        }
        ValueMaker::Decorated(Box::new(ValueDecorator {
            base,
            constraints,
            translator,
        }))
    }

    pub fn make_value(&self, row: &dyn RowValues) -> Option<String> {
        match self {
            ValueMaker::Column(a) => row
                .value(&ProjectionSpec::Attribute(a.clone()))
                .map(str::to_string),
            ValueMaker::Pattern(p) => p.make_value(row),
            ValueMaker::BlankNodeId(b) => b.make_value(row),
            ValueMaker::Constant(c) => Some(c.clone()),
            ValueMaker::SqlExpression(e) => row
                .value(&ProjectionSpec::Expression(e.clone()))
                .map(str::to_string),
            ValueMaker::Decorated(d) => {
                let value = d.base.make_value(row)?;
                match &d.translator {
                    Some(table) => table.to_graph_value(&value).map(str::to_string),
                    None => Some(value),
                }
            }
        }
    }

    /// Condition selecting the rows that produce `value`; `False` when no
    /// row can.
    pub fn value_expression(&self, value: &str) -> Expression {
        match self {
            ValueMaker::Column(a) => Expression::attribute_equals_value(a, value),
            ValueMaker::Pattern(p) => p.value_expression(value),
            ValueMaker::BlankNodeId(b) => b.value_expression(value),
            ValueMaker::Constant(c) => {
                if c == value {
                    Expression::True
                } else {
                    Expression::False
                }
            }
            ValueMaker::SqlExpression(e) => Expression::equal(e.clone(), Expression::constant(value)),
            ValueMaker::Decorated(d) => {
                if !d.constraints.iter().all(|c| c.matches(value)) {
                    return Expression::False;
                }
                match &d.translator {
                    Some(table) => match table.to_database_value(value) {
                        Some(db_value) => d.base.value_expression(db_value),
                        None => Expression::False,
                    },
                    None => d.base.value_expression(value),
                }
            }
        }
    }

    pub fn projection_specs(&self) -> BTreeSet<ProjectionSpec> {
        match self {
            ValueMaker::Column(a) => BTreeSet::from([ProjectionSpec::Attribute(a.clone())]),
            ValueMaker::Pattern(p) => p.projection_specs(),
            ValueMaker::BlankNodeId(b) => b.projection_specs(),
            ValueMaker::Constant(_) => BTreeSet::new(),
            ValueMaker::SqlExpression(e) => BTreeSet::from([ProjectionSpec::Expression(e.clone())]),
            ValueMaker::Decorated(d) => d.base.projection_specs(),
        }
    }

    pub fn order_specs(&self, ascending: bool) -> Vec<OrderSpec> {
        match self {
            ValueMaker::Column(a) => vec![OrderSpec::new(Expression::attribute(a), ascending)],
            ValueMaker::Pattern(p) => p
                .attributes()
                .map(|a| OrderSpec::new(Expression::attribute(a), ascending))
                .collect(),
            ValueMaker::BlankNodeId(b) => b
                .attributes()
                .iter()
                .map(|a| OrderSpec::new(Expression::attribute(a), ascending))
                .collect(),
            ValueMaker::Constant(_) => Vec::new(),
            ValueMaker::SqlExpression(e) => vec![OrderSpec::new(e.clone(), ascending)],
            ValueMaker::Decorated(d) => d.base.order_specs(ascending),
        }
    }

    /// SQL computing the value itself, when it has one.
    pub fn sql_expression(&self) -> Option<Expression> {
        match self {
            ValueMaker::Column(a) => Some(Expression::attribute(a)),
            ValueMaker::Pattern(p) => p.sql_expression(),
            ValueMaker::BlankNodeId(b) => Some(b.sql_expression()),
            ValueMaker::Constant(c) => Some(Expression::constant(c.clone())),
            ValueMaker::SqlExpression(e) => Some(e.clone()),
            ValueMaker::Decorated(d) if d.translator.is_none() => d.base.sql_expression(),
            ValueMaker::Decorated(_) => None,
        }
    }

    pub fn rename(&self, renamer: &dyn ColumnRenamer) -> ValueMaker {
        match self {
            ValueMaker::Column(a) => ValueMaker::Column(renamer.apply_to_attribute(a)),
            ValueMaker::Pattern(p) => ValueMaker::Pattern(p.rename(renamer)),
            ValueMaker::BlankNodeId(b) => ValueMaker::BlankNodeId(b.rename(renamer)),
            ValueMaker::Constant(c) => ValueMaker::Constant(c.clone()),
            ValueMaker::SqlExpression(e) => ValueMaker::SqlExpression(e.rename(renamer)),
            ValueMaker::Decorated(d) => ValueMaker::Decorated(Box::new(ValueDecorator {
                base: d.base.rename(renamer),
                constraints: d.constraints.clone(),
                translator: d.translator.clone(),
            })),
        }
    }

    pub fn describe(&self) -> ValueDescription {
        match self {
            ValueMaker::Column(a) => ValueDescription::plain(ValueShape::Column(a.clone())),
            ValueMaker::Pattern(p) => ValueDescription::plain(ValueShape::Pattern(p.clone())),
            ValueMaker::BlankNodeId(b) => ValueDescription::plain(ValueShape::BlankNodeId(b.clone())),
            ValueMaker::Constant(c) => ValueDescription::plain(ValueShape::Constant(c.clone())),
            ValueMaker::SqlExpression(e) => {
                ValueDescription::plain(ValueShape::SqlExpression(e.clone()))
            }
            ValueMaker::Decorated(d) => {
                let mut description = d.base.describe();
                description.constraints.extend(d.constraints.iter().cloned());
                if let Some(table) = &d.translator {
                    description.translators.insert(0, table.name().to_string());
                }
                description
            }
        }
    }
}

impl fmt::Display for ValueMaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueMaker::Column(a) => write!(f, "Column({})", a),
            ValueMaker::Pattern(p) => write!(f, "Pattern({})", p),
            ValueMaker::BlankNodeId(b) => write!(f, "BlankNodeID({})", b.class_id()),
            ValueMaker::Constant(c) => write!(f, "Constant({})", c),
            ValueMaker::SqlExpression(e) => write!(f, "SQLExpression({})", e),
            ValueMaker::Decorated(d) => {
                write!(f, "{}", d.base)?;
                for c in &d.constraints {
                    write!(f, ":{}", c)?;
                }
                if let Some(t) = &d.translator {
                    write!(f, ":translate({})", t.name())?;
                }
                Ok(())
            }
        }
    }
}
