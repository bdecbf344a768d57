use std::collections::BTreeSet;
use std::fmt;

use super::attribute::Attribute;
use super::column_renamer::ColumnRenamer;
use crate::expression::{Expression, SqlContext};

/// One item of a SELECT list: a plain column or a computed expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProjectionSpec {
    Attribute(Attribute),
    Expression(Expression),
}

impl ProjectionSpec {
    pub fn attribute(attribute: Attribute) -> Self {
        ProjectionSpec::Attribute(attribute)
    }

    pub fn required_attributes(&self) -> BTreeSet<Attribute> {
        match self {
            ProjectionSpec::Attribute(a) => BTreeSet::from([a.clone()]),
            ProjectionSpec::Expression(e) => e.attributes(),
        }
    }

    pub fn rename(&self, renamer: &dyn ColumnRenamer) -> ProjectionSpec {
        match self {
            ProjectionSpec::Attribute(a) => ProjectionSpec::Attribute(renamer.apply_to_attribute(a)),
            ProjectionSpec::Expression(e) => ProjectionSpec::Expression(e.rename(renamer)),
        }
    }

    pub fn as_expression(&self) -> Expression {
        match self {
            ProjectionSpec::Attribute(a) => Expression::Attribute(a.clone()),
            ProjectionSpec::Expression(e) => e.clone(),
        }
    }

    /// `spec IS NOT NULL`; a NULL in any projected column produces no node.
    pub fn not_null_condition(&self) -> Expression {
        Expression::not_null(self.as_expression())
    }

    /// SELECT list item. Expressions get a positional column label.
    pub fn to_sql(&self, context: &SqlContext<'_>, position: usize) -> String {
        match self {
            ProjectionSpec::Attribute(a) => context.vendor.quote_attribute(a),
            ProjectionSpec::Expression(e) => context.vendor.alias_clause(
                &e.to_sql(context),
                &context.vendor.quote_identifier(&format!("expr{}", position)),
            ),
        }
    }
}

impl fmt::Display for ProjectionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectionSpec::Attribute(a) => write!(f, "{}", a),
            ProjectionSpec::Expression(e) => write!(f, "{}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderSpec {
    pub expression: Expression,
    pub ascending: bool,
}

impl OrderSpec {
    pub fn new(expression: Expression, ascending: bool) -> Self {
        OrderSpec {
            expression,
            ascending,
        }
    }

    pub fn rename(&self, renamer: &dyn ColumnRenamer) -> OrderSpec {
        OrderSpec::new(self.expression.rename(renamer), self.ascending)
    }

    pub fn to_sql(&self, context: &SqlContext<'_>) -> String {
        let sql = self.expression.to_sql(context);
        if self.ascending {
            sql
        } else {
            format!("{} DESC", sql)
        }
    }
}
