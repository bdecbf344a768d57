use std::collections::BTreeSet;
use std::fmt;

use super::sql_fragment::SqlFragment;
use crate::relational::{Attribute, ColumnRenamer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BinaryOperator {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "<>",
            BinaryOperator::Less => "<",
            BinaryOperator::LessOrEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterOrEqual => ">=",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
        }
    }

    pub fn is_comparison(self) -> bool {
        !self.is_arithmetic()
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOperator::Add
                | BinaryOperator::Subtract
                | BinaryOperator::Multiply
                | BinaryOperator::Divide
        )
    }

    /// The comparison that holds exactly when this one does not, ignoring NULLs.
    pub fn negated(self) -> Option<BinaryOperator> {
        match self {
            BinaryOperator::Equal => Some(BinaryOperator::NotEqual),
            BinaryOperator::NotEqual => Some(BinaryOperator::Equal),
            _ => None,
        }
    }
}

/// A constant value. The optional type carrier names the column the value
/// is compared against and selects its literal format in SQL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Constant {
    pub value: String,
    pub type_carrier: Option<Attribute>,
}

/// Boolean and arithmetic expressions over columns.
///
/// Values are built through the associated constructors, which simplify as
/// they go: conjunctions and disjunctions are flattened and never contain
/// `True` or `False`, constants are folded, and negations cancel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Expression {
    True,
    False,
    Constant(Constant),
    Attribute(Attribute),
    Conjunction(BTreeSet<Expression>),
    Disjunction(BTreeSet<Expression>),
    Not(Box<Expression>),
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Concatenation(Vec<Expression>),
    NotNull(Box<Expression>),
    Sql(SqlFragment),
}

impl Expression {
    pub fn constant(value: impl Into<String>) -> Expression {
        Expression::Constant(Constant {
            value: value.into(),
            type_carrier: None,
        })
    }

    pub fn typed_constant(value: impl Into<String>, type_carrier: &Attribute) -> Expression {
        Expression::Constant(Constant {
            value: value.into(),
            type_carrier: Some(type_carrier.clone()),
        })
    }

    pub fn attribute(attribute: &Attribute) -> Expression {
        Expression::Attribute(attribute.clone())
    }

    /// `attribute = 'value'`, with the constant typed by the attribute.
    pub fn attribute_equals_value(attribute: &Attribute, value: &str) -> Expression {
        Expression::equal(
            Expression::attribute(attribute),
            Expression::typed_constant(value, attribute),
        )
    }

    pub fn sql(text: &str) -> Expression {
        Expression::Sql(SqlFragment::parse(text))
    }

    pub fn and(parts: impl IntoIterator<Item = Expression>) -> Expression {
        let mut members = BTreeSet::new();
        for part in parts {
            match part {
                Expression::True => {}
                Expression::False => return Expression::False,
                Expression::Conjunction(inner) => members.extend(inner),
                other => {
                    members.insert(other);
                }
            }
        }
        if members.len() <= 1 {
            return members.into_iter().next().unwrap_or(Expression::True);
        }
        Expression::Conjunction(members)
    }

    pub fn or(parts: impl IntoIterator<Item = Expression>) -> Expression {
        let mut members = BTreeSet::new();
        for part in parts {
            match part {
                Expression::False => {}
                Expression::True => return Expression::True,
                Expression::Disjunction(inner) => members.extend(inner),
                other => {
                    members.insert(other);
                }
            }
        }
        if members.len() <= 1 {
            return members.into_iter().next().unwrap_or(Expression::False);
        }
        Expression::Disjunction(members)
    }

    pub fn not(expression: Expression) -> Expression {
        match expression {
            Expression::True => Expression::False,
            Expression::False => Expression::True,
            Expression::Not(inner) => *inner,
            Expression::BinaryOp { op, left, right } => match op.negated() {
                Some(negated) => Expression::binary(negated, *left, *right),
                None => Expression::Not(Box::new(Expression::BinaryOp { op, left, right })),
            },
            other => Expression::Not(Box::new(other)),
        }
    }

    pub fn binary(op: BinaryOperator, left: Expression, right: Expression) -> Expression {
        if let (Expression::Constant(l), Expression::Constant(r)) = (&left, &right) {
            if let Some(folded) = fold_constants(op, l, r) {
                return folded;
            }
        }
        // Equalities between columns are symmetric; keep one spelling
        if matches!(op, BinaryOperator::Equal | BinaryOperator::NotEqual)
            && matches!((&left, &right), (Expression::Attribute(_), Expression::Attribute(_)))
            && left > right
        {
            return Expression::BinaryOp {
                op,
                left: Box::new(right),
                right: Box::new(left),
            };
        }
        Expression::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn equal(left: Expression, right: Expression) -> Expression {
        Expression::binary(BinaryOperator::Equal, left, right)
    }

    pub fn not_equal(left: Expression, right: Expression) -> Expression {
        Expression::binary(BinaryOperator::NotEqual, left, right)
    }

    pub fn concatenation(parts: impl IntoIterator<Item = Expression>) -> Expression {
        let mut merged: Vec<Expression> = Vec::new();
        for part in parts {
            let flattened = match part {
                Expression::Concatenation(inner) => inner,
                other => vec![other],
            };
            for item in flattened {
                match (merged.last_mut(), item) {
                    (_, Expression::Constant(c)) if c.value.is_empty() => {}
                    (Some(Expression::Constant(previous)), Expression::Constant(c)) => {
                        previous.value.push_str(&c.value);
                        previous.type_carrier = None;
                    }
                    (_, item) => merged.push(item),
                }
            }
        }
        match merged.len() {
            0 => Expression::constant(""),
            1 => merged.pop().unwrap_or_else(|| Expression::constant("")),
            _ => Expression::Concatenation(merged),
        }
    }

    pub fn not_null(expression: Expression) -> Expression {
        match expression {
            Expression::Constant(_) | Expression::True | Expression::False => Expression::True,
            other => Expression::NotNull(Box::new(other)),
        }
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Expression::True)
    }

    pub fn is_false(&self) -> bool {
        matches!(self, Expression::False)
    }

    pub fn is_constant(&self) -> bool {
        matches!(
            self,
            Expression::True | Expression::False | Expression::Constant(_)
        )
    }

    /// Columns the expression reads. Type carriers are not read and are
    /// not included.
    pub fn attributes(&self) -> BTreeSet<Attribute> {
        let mut result = BTreeSet::new();
        self.collect_attributes(&mut result);
        result
    }

    fn collect_attributes(&self, into: &mut BTreeSet<Attribute>) {
        match self {
            Expression::True | Expression::False | Expression::Constant(_) => {}
            Expression::Attribute(a) => {
                into.insert(a.clone());
            }
            Expression::Conjunction(members) | Expression::Disjunction(members) => {
                for m in members {
                    m.collect_attributes(into);
                }
            }
            Expression::Not(inner) | Expression::NotNull(inner) => inner.collect_attributes(into),
            Expression::BinaryOp { left, right, .. } => {
                left.collect_attributes(into);
                right.collect_attributes(into);
            }
            Expression::Concatenation(parts) => {
                for p in parts {
                    p.collect_attributes(into);
                }
            }
            Expression::Sql(fragment) => into.extend(fragment.attributes().cloned()),
        }
    }

    pub fn rename(&self, renamer: &dyn ColumnRenamer) -> Expression {
        match self {
            Expression::True => Expression::True,
            Expression::False => Expression::False,
            Expression::Constant(c) => Expression::Constant(Constant {
                value: c.value.clone(),
                type_carrier: c.type_carrier.as_ref().map(|a| renamer.apply_to_attribute(a)),
            }),
            Expression::Attribute(a) => Expression::Attribute(renamer.apply_to_attribute(a)),
            Expression::Conjunction(members) => {
                Expression::and(members.iter().map(|m| m.rename(renamer)))
            }
            Expression::Disjunction(members) => {
                Expression::or(members.iter().map(|m| m.rename(renamer)))
            }
            Expression::Not(inner) => Expression::not(inner.rename(renamer)),
            Expression::BinaryOp { op, left, right } => {
                Expression::binary(*op, left.rename(renamer), right.rename(renamer))
            }
            Expression::Concatenation(parts) => {
                Expression::concatenation(parts.iter().map(|p| p.rename(renamer)))
            }
            Expression::NotNull(inner) => Expression::not_null(inner.rename(renamer)),
            Expression::Sql(fragment) => Expression::Sql(fragment.rename(renamer)),
        }
    }

    /// Members of a conjunction, or the expression itself.
    pub fn conjuncts(&self) -> Vec<&Expression> {
        match self {
            Expression::True => Vec::new(),
            Expression::Conjunction(members) => members.iter().collect(),
            other => vec![other],
        }
    }
}

fn fold_constants(op: BinaryOperator, left: &Constant, right: &Constant) -> Option<Expression> {
    let numbers = (
        left.value.trim().parse::<f64>().ok(),
        right.value.trim().parse::<f64>().ok(),
    );

    if op.is_arithmetic() {
        let (Some(l), Some(r)) = numbers else {
            return None;
        };
        let result = match op {
            BinaryOperator::Add => l + r,
            BinaryOperator::Subtract => l - r,
            BinaryOperator::Multiply => l * r,
            BinaryOperator::Divide if r != 0.0 => l / r,
            _ => return None,
        };
        let integral_inputs = !left.value.contains(['.', 'e', 'E'])
            && !right.value.contains(['.', 'e', 'E']);
        let value = if integral_inputs && result.fract() == 0.0 && result.abs() < 1e15 {
            format!("{}", result as i64)
        } else {
            format!("{}", result)
        };
        return Some(Expression::Constant(Constant {
            value,
            type_carrier: left.type_carrier.clone().or_else(|| right.type_carrier.clone()),
        }));
    }

    let as_text = left.value.cmp(&right.value);
    let ordering = match numbers {
        (Some(l), Some(r)) => {
            let as_number = l.partial_cmp(&r)?;
            if as_number == as_text {
                as_number
            } else if left.type_carrier.is_some() || right.type_carrier.is_some() {
                // only the carrier's column type can tell which reading applies
                return None;
            } else {
                // untyped constants are rendered as strings
                as_text
            }
        }
        _ => as_text,
    };
    let holds = match op {
        BinaryOperator::Equal => ordering.is_eq(),
        BinaryOperator::NotEqual => ordering.is_ne(),
        BinaryOperator::Less => ordering.is_lt(),
        BinaryOperator::LessOrEqual => ordering.is_le(),
        BinaryOperator::Greater => ordering.is_gt(),
        BinaryOperator::GreaterOrEqual => ordering.is_ge(),
        _ => return None,
    };
    Some(if holds { Expression::True } else { Expression::False })
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::True => f.write_str("TRUE"),
            Expression::False => f.write_str("FALSE"),
            Expression::Constant(c) => write!(f, "'{}'", c.value),
            Expression::Attribute(a) => write!(f, "{}", a),
            Expression::Conjunction(members) => write_joined(f, members, " AND "),
            Expression::Disjunction(members) => write_joined(f, members, " OR "),
            Expression::Not(inner) => write!(f, "NOT ({})", inner),
            Expression::BinaryOp { op, left, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
            Expression::Concatenation(parts) => write_joined(f, parts, " || "),
            Expression::NotNull(inner) => write!(f, "{} IS NOT NULL", inner),
            Expression::Sql(fragment) => write!(f, "SQL({})", fragment),
        }
    }
}

fn write_joined<'a>(
    f: &mut fmt::Formatter<'_>,
    items: impl IntoIterator<Item = &'a Expression>,
    separator: &str,
) -> fmt::Result {
    let parts: Vec<String> = items.into_iter().map(|e| e.to_string()).collect();
    write!(f, "({})", parts.join(separator))
}
