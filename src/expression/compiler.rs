use super::tree::{BinaryOperator, Constant, Expression};
use crate::relational::{AliasMap, Attribute, DatabaseHandle, RelationData};
use crate::sql_generator::{SqlDataType, Vendor};

/// Everything needed to turn an expression into SQL text for one statement.
#[derive(Debug, Clone, Copy)]
pub struct SqlContext<'a> {
    pub vendor: Vendor,
    pub aliases: &'a AliasMap,
    pub database: Option<&'a DatabaseHandle>,
}

impl<'a> SqlContext<'a> {
    pub fn new(vendor: Vendor, aliases: &'a AliasMap, database: Option<&'a DatabaseHandle>) -> Self {
        SqlContext {
            vendor,
            aliases,
            database,
        }
    }

    pub fn for_relation(relation: &'a RelationData) -> Self {
        SqlContext {
            vendor: relation.database.vendor(),
            aliases: &relation.aliases,
            database: Some(&relation.database),
        }
    }

    /// Column type, looked up on the physical table behind any alias.
    pub fn column_type(&self, attribute: &Attribute) -> SqlDataType {
        match self.database {
            Some(db) => db.column_type(&self.aliases.original_of_attribute(attribute)),
            None => SqlDataType::Unknown,
        }
    }

    fn format_constant(&self, constant: &Constant) -> Option<String> {
        match &constant.type_carrier {
            Some(carrier) => self
                .vendor
                .format_constant(&constant.value, self.column_type(carrier)),
            None => Some(self.vendor.quote_string(&constant.value)),
        }
    }
}

impl Expression {
    pub fn to_sql(&self, context: &SqlContext<'_>) -> String {
        let vendor = context.vendor;
        match self {
            Expression::True => vendor.true_condition().to_string(),
            Expression::False => vendor.false_condition().to_string(),
            Expression::Constant(c) => context
                .format_constant(c)
                .unwrap_or_else(|| vendor.quote_string(&c.value)),
            Expression::Attribute(a) => vendor.quote_attribute(a),
            Expression::Conjunction(members) => join_sorted(members, context, " AND "),
            Expression::Disjunction(members) => join_sorted(members, context, " OR "),
            Expression::Not(inner) => format!("NOT ({})", inner.to_sql(context)),
            Expression::BinaryOp { op, left, right } if op.is_comparison() => {
                compile_comparison(*op, left, right, context)
            }
            Expression::BinaryOp { op, left, right } => format!(
                "({} {} {})",
                left.to_sql(context),
                op.symbol(),
                right.to_sql(context)
            ),
            Expression::Concatenation(parts) => {
                let rendered: Vec<String> = parts.iter().map(|p| p.to_sql(context)).collect();
                vendor.concatenate(&rendered)
            }
            Expression::NotNull(inner) => format!("{} IS NOT NULL", inner.to_sql(context)),
            Expression::Sql(fragment) => {
                format!("({})", fragment.render(|a| vendor.quote_attribute(a)))
            }
        }
    }
}

fn join_sorted(
    members: &std::collections::BTreeSet<Expression>,
    context: &SqlContext<'_>,
    separator: &str,
) -> String {
    let mut fragments: Vec<String> = members.iter().map(|m| m.to_sql(context)).collect();
    fragments.sort();
    format!("({})", fragments.join(separator))
}

/// A constant that is not a valid value of the column it is compared with
/// cannot match any row.
fn compile_comparison(
    op: BinaryOperator,
    left: &Expression,
    right: &Expression,
    context: &SqlContext<'_>,
) -> String {
    let invalid_side = [(left, right), (right, left)]
        .into_iter()
        .find(|(side, _)| match side {
            Expression::Constant(c) => context.format_constant(c).is_none(),
            _ => false,
        });

    if let Some((_, other)) = invalid_side {
        return match op {
            BinaryOperator::NotEqual => format!("{} IS NOT NULL", other.to_sql(context)),
            _ => context.vendor.false_condition().to_string(),
        };
    }
    format!(
        "{} {} {}",
        left.to_sql(context),
        op.symbol(),
        right.to_sql(context)
    )
}
