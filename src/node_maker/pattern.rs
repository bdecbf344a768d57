//! URI and literal templates such as `http://ex/item/@@items.id|urlify@@`.
//!
//! A template alternates literal text with column placeholders. Each
//! placeholder may apply a column function that encodes the column value
//! before it is spliced in; reading a value back decodes it again.

use std::collections::BTreeSet;
use std::fmt;

use regex::Regex;

use super::errors::NodeMakerError;
use super::value_maker::RowValues;
use crate::expression::Expression;
use crate::relational::{Attribute, ColumnRenamer, ProjectionSpec};

pub const DELIMITER: &str = "@@";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColumnFunction {
    Identity,
    /// Form encoding, space becomes `+`.
    UrlEncode,
    /// Spaces become `_`, then percent-encoding.
    Urlify,
    /// Percent-encoding.
    Encode,
}

impl ColumnFunction {
    fn parse(name: &str) -> Result<Self, NodeMakerError> {
        match name {
            "urlencode" => Ok(ColumnFunction::UrlEncode),
            "urlify" => Ok(ColumnFunction::Urlify),
            "encode" => Ok(ColumnFunction::Encode),
            other => Err(NodeMakerError::UnknownColumnFunction(other.to_string())),
        }
    }

    fn name(self) -> Option<&'static str> {
        match self {
            ColumnFunction::Identity => None,
            ColumnFunction::UrlEncode => Some("urlencode"),
            ColumnFunction::Urlify => Some("urlify"),
            ColumnFunction::Encode => Some("encode"),
        }
    }

    pub fn encode(self, value: &str) -> String {
        match self {
            ColumnFunction::Identity => value.to_string(),
            ColumnFunction::UrlEncode => urlencoding::encode(value).replace("%20", "+"),
            ColumnFunction::Urlify => urlencoding::encode(&value.replace(' ', "_")).into_owned(),
            ColumnFunction::Encode => urlencoding::encode(value).into_owned(),
        }
    }

    pub fn decode(self, value: &str) -> Option<String> {
        match self {
            ColumnFunction::Identity => Some(value.to_string()),
            ColumnFunction::UrlEncode => urlencoding::decode(&value.replace('+', " "))
                .ok()
                .map(|d| d.into_owned()),
            ColumnFunction::Urlify => urlencoding::decode(value)
                .ok()
                .map(|d| d.replace('_', " ")),
            ColumnFunction::Encode => urlencoding::decode(value).ok().map(|d| d.into_owned()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatternColumn {
    pub attribute: Attribute,
    pub function: ColumnFunction,
}

/// Parsed template. `literals` always has one more element than `columns`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pattern {
    literals: Vec<String>,
    columns: Vec<PatternColumn>,
}

impl Pattern {
    pub fn parse(template: &str) -> Result<Pattern, NodeMakerError> {
        let pieces: Vec<&str> = template.split(DELIMITER).collect();
        if pieces.len() % 2 == 0 {
            return Err(NodeMakerError::UnbalancedPattern(template.to_string()));
        }

        let mut literals = Vec::new();
        let mut columns = Vec::new();
        for (i, piece) in pieces.iter().enumerate() {
            if i % 2 == 0 {
                literals.push(piece.to_string());
                continue;
            }
            let (column, function) = match piece.split_once('|') {
                Some((column, function)) => (column, ColumnFunction::parse(function.trim())?),
                None => (*piece, ColumnFunction::Identity),
            };
            let attribute = Attribute::parse(column)
                .map_err(|e| NodeMakerError::InvalidPattern(template.to_string(), e.to_string()))?;
            columns.push(PatternColumn {
                attribute,
                function,
            });
        }
        Ok(Pattern { literals, columns })
    }

    pub fn columns(&self) -> &[PatternColumn] {
        &self.columns
    }

    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.columns.iter().map(|c| &c.attribute)
    }

    pub fn literal_prefix(&self) -> &str {
        self.literals.first().map(String::as_str).unwrap_or("")
    }

    pub fn literal_suffix(&self) -> &str {
        self.literals.last().map(String::as_str).unwrap_or("")
    }

    pub fn uses_column_functions(&self) -> bool {
        self.columns.iter().any(|c| c.function != ColumnFunction::Identity)
    }

    /// Values can be split back into columns when no two placeholders are
    /// adjacent.
    pub fn is_reversible(&self) -> bool {
        self.literals.len() <= 2
            || self.literals[1..self.literals.len() - 1]
                .iter()
                .all(|l| !l.is_empty())
    }

    /// Same literal text and column functions, so equal values imply
    /// equal columns position by position.
    pub fn is_equivalent_to(&self, other: &Pattern) -> bool {
        self.literals == other.literals
            && self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(&other.columns)
                .all(|(a, b)| a.function == b.function)
    }

    /// True when no value can be produced by both patterns.
    pub fn is_disjoint_from(&self, other: &Pattern) -> bool {
        let (p1, p2) = (self.literal_prefix(), other.literal_prefix());
        let (s1, s2) = (self.literal_suffix(), other.literal_suffix());
        !(p1.starts_with(p2) || p2.starts_with(p1)) || !(s1.ends_with(s2) || s2.ends_with(s1))
    }

    pub fn make_value(&self, row: &dyn RowValues) -> Option<String> {
        let mut result = self.literals[0].clone();
        for (column, literal) in self.columns.iter().zip(&self.literals[1..]) {
            let value = row.value(&ProjectionSpec::Attribute(column.attribute.clone()))?;
            result.push_str(&column.function.encode(value));
            result.push_str(literal);
        }
        Some(result)
    }

    pub fn value_expression(&self, value: &str) -> Expression {
        if self.columns.is_empty() {
            return if value == self.literals[0] {
                Expression::True
            } else {
                Expression::False
            };
        }
        if !value.starts_with(self.literal_prefix()) || !value.ends_with(self.literal_suffix()) {
            return Expression::False;
        }
        if !self.is_reversible() {
            return match self.sql_expression() {
                Some(concat) => Expression::equal(concat, Expression::constant(value)),
                None => {
                    log::warn!(
                        "Pattern {} cannot be matched against '{}': adjacent columns with column functions",
                        self,
                        value
                    );
                    Expression::False
                }
            };
        }

        let Some(regex) = self.regex() else {
            return Expression::False;
        };
        let Some(captures) = regex.captures(value) else {
            return Expression::False;
        };
        let mut conditions = Vec::with_capacity(self.columns.len());
        for (i, column) in self.columns.iter().enumerate() {
            let Some(raw) = captures.get(i + 1) else {
                return Expression::False;
            };
            let Some(decoded) = column.function.decode(raw.as_str()) else {
                return Expression::False;
            };
            // Only canonical encodings are ever produced
            if column.function.encode(&decoded) != raw.as_str() {
                return Expression::False;
            }
            conditions.push(Expression::attribute_equals_value(&column.attribute, &decoded));
        }
        Expression::and(conditions)
    }

    fn regex(&self) -> Option<Regex> {
        let mut source = String::from("(?s)^");
        source.push_str(&regex::escape(&self.literals[0]));
        for literal in &self.literals[1..] {
            source.push_str("(.*?)");
            source.push_str(&regex::escape(literal));
        }
        source.push('$');
        Regex::new(&source).ok()
    }

    /// The value computed in SQL, available when no column function is used.
    pub fn sql_expression(&self) -> Option<Expression> {
        if self.uses_column_functions() {
            return None;
        }
        let mut parts = vec![Expression::constant(self.literals[0].clone())];
        for (column, literal) in self.columns.iter().zip(&self.literals[1..]) {
            parts.push(Expression::attribute(&column.attribute));
            parts.push(Expression::constant(literal.clone()));
        }
        Some(Expression::concatenation(parts))
    }

    pub fn projection_specs(&self) -> BTreeSet<ProjectionSpec> {
        self.attributes()
            .map(|a| ProjectionSpec::Attribute(a.clone()))
            .collect()
    }

    pub fn rename(&self, renamer: &dyn ColumnRenamer) -> Pattern {
        Pattern {
            literals: self.literals.clone(),
            columns: self
                .columns
                .iter()
                .map(|c| PatternColumn {
                    attribute: renamer.apply_to_attribute(&c.attribute),
                    function: c.function,
                })
                .collect(),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.literals[0])?;
        for (column, literal) in self.columns.iter().zip(&self.literals[1..]) {
            f.write_str(DELIMITER)?;
            f.write_str(&column.attribute.qualified_name())?;
            if let Some(name) = column.function.name() {
                write!(f, "|{}", name)?;
            }
            f.write_str(DELIMITER)?;
            f.write_str(literal)?;
        }
        Ok(())
    }
}
