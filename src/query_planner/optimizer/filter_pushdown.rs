//! Pushes filter conjuncts into the SQL of a node relation.
//!
//! Every conjunct of the normalised filter is offered on its own. A conjunct
//! is converted when all of its variables resolve to node makers whose
//! shape decides it, either statically (term kind, language, datatype) or
//! through a relational condition. Whatever cannot be converted is returned
//! as residue for evaluation on the produced bindings.

use super::cnf;
use super::filter_eval::lang_matches;
use super::filter_expr::{ArithmeticOp, CompareOp, FilterExpr};
use crate::expression::{BinaryOperator, Expression};
use crate::node_maker::node::{is_numeric_datatype, XSD_BOOLEAN, XSD_STRING};
use crate::node_maker::{Node, NodeMaker, NodeType};
use crate::query_planner::node_relation::NodeRelation;
use crate::query_planner::variable_constraints::{join_condition, JoinOutcome};
use crate::sql_generator::is_numeric_literal;

#[derive(Debug, Clone, PartialEq)]
pub struct PushedFilter {
    /// The node relation with every convertible conjunct applied.
    pub relation: NodeRelation,
    /// Conjuncts left to evaluate on bindings.
    pub residue: Vec<FilterExpr>,
}

impl PushedFilter {
    pub fn is_empty(&self) -> bool {
        self.relation.relation().is_empty()
    }

    /// The relation with its residue attached as binding filters.
    pub fn into_node_relation(self) -> NodeRelation {
        self.relation.with_filters(self.residue)
    }
}

pub fn push_down(node_relation: &NodeRelation, filter: &FilterExpr) -> PushedFilter {
    let converter = FilterConverter {
        relation: node_relation,
    };
    let mut conditions = Vec::new();
    let mut residue = Vec::new();
    for conjunct in cnf::conjuncts(filter) {
        match converter.convert(&conjunct) {
            Some(condition) => {
                log::trace!("Pushed {} into SQL as {}", conjunct, condition);
                conditions.push(condition);
            }
            None => residue.push(conjunct),
        }
    }
    PushedFilter {
        relation: node_relation.select(&Expression::and(conditions)),
        residue,
    }
}

/// A property known from the node maker alone. `Err` when the nodes it
/// produces cannot have the property, which is a type error.
type StaticResult<T> = Result<T, ()>;

struct FilterConverter<'a> {
    relation: &'a NodeRelation,
}

impl FilterConverter<'_> {
    fn maker(&self, variable: &str) -> Option<&NodeMaker> {
        self.relation.node_maker(variable)
    }

    fn maker_of(&self, expr: &FilterExpr) -> Option<&NodeMaker> {
        match expr {
            FilterExpr::Variable(v) => self.maker(v),
            _ => None,
        }
    }

    fn convert(&self, expr: &FilterExpr) -> Option<Expression> {
        match expr {
            FilterExpr::And(a, b) => Some(Expression::and([self.convert(a)?, self.convert(b)?])),
            FilterExpr::Or(a, b) => Some(Expression::or([self.convert(a)?, self.convert(b)?])),
            FilterExpr::Not(a) => Some(Expression::not(self.convert(a)?)),
            FilterExpr::Bound(v) => Some(truth(self.maker(v).is_some())),
            FilterExpr::IsIri(a) => self.term_test(a, |t| t.is_uri(), Node::is_uri),
            FilterExpr::IsBlank(a) => {
                self.term_test(a, |t| matches!(t, NodeType::Blank), Node::is_blank)
            }
            FilterExpr::IsLiteral(a) => self.term_test(a, NodeType::is_literal, Node::is_literal),
            FilterExpr::Constant(node) => constant_truth(node),
            FilterExpr::SameTerm(a, b) => self.term_equality(a, b),
            FilterExpr::LangMatches(tag, range) => {
                let FilterExpr::Lang(inner) = tag.as_ref() else {
                    return None;
                };
                let range = plain_string(range)?;
                Some(match self.static_language(inner)? {
                    Ok(language) => truth(lang_matches(&language, &range)),
                    Err(()) => Expression::False,
                })
            }
            FilterExpr::Compare(op, a, b) => self.comparison(*op, a, b),
            _ => None,
        }
    }

    fn term_test(
        &self,
        operand: &FilterExpr,
        by_type: impl Fn(&NodeType) -> bool,
        by_node: impl Fn(&Node) -> bool,
    ) -> Option<Expression> {
        let result = match self.maker_of(operand)? {
            NodeMaker::Empty => false,
            NodeMaker::Fixed(node) => by_node(node),
            NodeMaker::Typed(t) => by_type(&t.node_type),
        };
        Some(truth(result))
    }

    fn comparison(&self, op: CompareOp, a: &FilterExpr, b: &FilterExpr) -> Option<Expression> {
        if matches!(op, CompareOp::Equal | CompareOp::NotEqual) {
            if let Some(outcome) = self
                .static_equality(a, b)
                .or_else(|| self.static_equality(b, a))
            {
                return Some(match (outcome, op) {
                    (Ok(equal), CompareOp::Equal) => truth(equal),
                    (Ok(equal), _) => truth(!equal),
                    // Type errors reject the binding either way
                    (Err(()), _) => Expression::False,
                });
            }
        }

        if let (Some(x), Some(y)) = (self.numeric_operand(a), self.numeric_operand(b)) {
            return Some(Expression::binary(sql_comparison(op), x, y));
        }

        match op {
            CompareOp::Equal => self.term_equality(a, b),
            CompareOp::NotEqual => self.term_equality(a, b).map(Expression::not),
            _ => None,
        }
    }

    /// `lang(?x) = "..."` and `datatype(?x) = <...>`, decided by node type.
    fn static_equality(&self, a: &FilterExpr, b: &FilterExpr) -> Option<StaticResult<bool>> {
        match (a, b) {
            (FilterExpr::Lang(inner), constant) => {
                let wanted = plain_string(constant)?;
                Some(
                    self.static_language(inner)?
                        .map(|language| language.eq_ignore_ascii_case(&wanted)),
                )
            }
            (FilterExpr::Datatype(inner), FilterExpr::Constant(Node::Uri(wanted))) => {
                Some(self.static_datatype(inner)?.map(|datatype| &datatype == wanted))
            }
            _ => None,
        }
    }

    fn static_language(&self, operand: &FilterExpr) -> Option<StaticResult<String>> {
        match self.maker_of(operand)? {
            NodeMaker::Empty => None,
            NodeMaker::Fixed(Node::Literal(l)) => Some(Ok(l.language.clone().unwrap_or_default())),
            NodeMaker::Fixed(_) => Some(Err(())),
            NodeMaker::Typed(t) => Some(match &t.node_type {
                NodeType::Literal { language, .. } => Ok(language.clone().unwrap_or_default()),
                _ => Err(()),
            }),
        }
    }

    fn static_datatype(&self, operand: &FilterExpr) -> Option<StaticResult<String>> {
        let (language, datatype) = match self.maker_of(operand)? {
            NodeMaker::Empty => return None,
            NodeMaker::Fixed(Node::Literal(l)) => (l.language.clone(), l.datatype.clone()),
            NodeMaker::Fixed(_) => return Some(Err(())),
            NodeMaker::Typed(t) => match &t.node_type {
                NodeType::Literal { language, datatype } => (language.clone(), datatype.clone()),
                _ => return Some(Err(())),
            },
        };
        Some(match (language, datatype) {
            (Some(_), _) => Err(()),
            (None, Some(datatype)) => Ok(datatype),
            (None, None) => Ok(XSD_STRING.to_string()),
        })
    }

    /// RDF term equality through the node makers.
    fn term_equality(&self, a: &FilterExpr, b: &FilterExpr) -> Option<Expression> {
        match (a, b) {
            (FilterExpr::Variable(x), FilterExpr::Variable(y)) => {
                match join_condition(self.maker(x)?, self.maker(y)?) {
                    JoinOutcome::Condition(condition) => Some(condition),
                    JoinOutcome::Impossible => Some(Expression::False),
                    JoinOutcome::Residual => None,
                }
            }
            (FilterExpr::Variable(v), FilterExpr::Constant(node))
            | (FilterExpr::Constant(node), FilterExpr::Variable(v)) => {
                Some(self.maker(v)?.value_expression_for(node))
            }
            (FilterExpr::Constant(x), FilterExpr::Constant(y)) => Some(truth(x == y)),
            _ => None,
        }
    }

    /// SQL for a numeric-valued operand.
    fn numeric_operand(&self, expr: &FilterExpr) -> Option<Expression> {
        match expr {
            FilterExpr::Variable(v) => match self.maker(v)? {
                NodeMaker::Typed(t) if t.node_type.datatype().is_some_and(is_numeric_datatype) => {
                    t.value_maker.sql_expression()
                }
                NodeMaker::Fixed(node) => numeric_constant(node),
                _ => None,
            },
            FilterExpr::Constant(node) => numeric_constant(node),
            FilterExpr::Arithmetic(op, a, b) => Some(Expression::binary(
                sql_arithmetic(*op),
                self.numeric_operand(a)?,
                self.numeric_operand(b)?,
            )),
            _ => None,
        }
    }
}

fn numeric_constant(node: &Node) -> Option<Expression> {
    let literal = node.as_literal()?;
    if !literal.datatype.as_deref().is_some_and(is_numeric_datatype) {
        return None;
    }
    let lexical = literal.lexical.trim();
    is_numeric_literal(lexical).then(|| Expression::sql(lexical))
}

fn plain_string(expr: &FilterExpr) -> Option<String> {
    match expr {
        FilterExpr::Constant(Node::Literal(l))
            if l.language.is_none() && l.datatype.as_deref().is_none_or(|d| d == XSD_STRING) =>
        {
            Some(l.lexical.clone())
        }
        _ => None,
    }
}

fn constant_truth(node: &Node) -> Option<Expression> {
    let literal = node.as_literal()?;
    if literal.datatype.as_deref() != Some(XSD_BOOLEAN) {
        return None;
    }
    match literal.lexical.as_str() {
        "true" | "1" => Some(Expression::True),
        "false" | "0" => Some(Expression::False),
        _ => None,
    }
}

fn truth(value: bool) -> Expression {
    if value {
        Expression::True
    } else {
        Expression::False
    }
}

fn sql_comparison(op: CompareOp) -> BinaryOperator {
    match op {
        CompareOp::Equal => BinaryOperator::Equal,
        CompareOp::NotEqual => BinaryOperator::NotEqual,
        CompareOp::Less => BinaryOperator::Less,
        CompareOp::LessOrEqual => BinaryOperator::LessOrEqual,
        CompareOp::Greater => BinaryOperator::Greater,
        CompareOp::GreaterOrEqual => BinaryOperator::GreaterOrEqual,
    }
}

fn sql_arithmetic(op: ArithmeticOp) -> BinaryOperator {
    match op {
        ArithmeticOp::Add => BinaryOperator::Add,
        ArithmeticOp::Subtract => BinaryOperator::Subtract,
        ArithmeticOp::Multiply => BinaryOperator::Multiply,
        ArithmeticOp::Divide => BinaryOperator::Divide,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::node_maker::node::XSD_INTEGER;
    use crate::node_maker::{Pattern, ValueMaker};
    use crate::relational::{Attribute, DatabaseHandle, Relation};
    use crate::sql_generator::Vendor;

    fn attr(s: &str) -> Attribute {
        Attribute::parse(s).unwrap()
    }

    fn people() -> NodeRelation {
        let mut builder = Relation::builder(DatabaseHandle::new("db", Vendor::Sql92));
        builder.set_unique(true);
        let bindings = BTreeMap::from([
            (
                "s".to_string(),
                NodeMaker::typed(
                    NodeType::Uri,
                    ValueMaker::Pattern(Pattern::parse("http://ex/p/@@people.id@@").unwrap()),
                    true,
                ),
            ),
            (
                "name".to_string(),
                NodeMaker::typed(NodeType::lang_literal("en"), ValueMaker::Column(attr("people.name")), false),
            ),
            (
                "age".to_string(),
                NodeMaker::typed(
                    NodeType::typed_literal(XSD_INTEGER),
                    ValueMaker::Column(attr("people.age")),
                    false,
                ),
            ),
        ]);
        NodeRelation::new(builder.freeze(), bindings, Vec::new())
    }

    fn var(name: &str) -> FilterExpr {
        FilterExpr::variable(name)
    }

    #[test]
    fn test_uri_equality_becomes_condition() {
        let filter = FilterExpr::compare(
            CompareOp::Equal,
            var("s"),
            FilterExpr::Constant(Node::uri("http://ex/p/4")),
        );
        let pushed = push_down(&people(), &filter);
        assert!(pushed.residue.is_empty());
        assert_eq!(
            pushed.relation.relation().condition(),
            &Expression::attribute_equals_value(&attr("people.id"), "4")
        );
    }

    #[test]
    fn test_static_type_tests_fold() {
        let pushed = push_down(&people(), &FilterExpr::IsLiteral(Box::new(var("s"))));
        assert!(pushed.is_empty());
        let pushed = push_down(&people(), &FilterExpr::IsIri(Box::new(var("s"))));
        assert!(!pushed.is_empty());
        assert!(pushed.relation.relation().condition().is_true());
    }

    #[test]
    fn test_language_test_folds() {
        let wrong = FilterExpr::compare(
            CompareOp::Equal,
            FilterExpr::Lang(Box::new(var("name"))),
            FilterExpr::Constant(Node::plain_literal("de")),
        );
        assert!(push_down(&people(), &wrong).is_empty());
        let on_uri = FilterExpr::compare(
            CompareOp::NotEqual,
            FilterExpr::Lang(Box::new(var("s"))),
            FilterExpr::Constant(Node::plain_literal("de")),
        );
        assert!(push_down(&people(), &on_uri).is_empty());
    }

    #[test]
    fn test_numeric_comparison_becomes_sql() {
        let filter = FilterExpr::compare(
            CompareOp::Greater,
            var("age"),
            FilterExpr::Constant(Node::typed_literal("30", XSD_INTEGER)),
        );
        let pushed = push_down(&people(), &filter);
        assert!(pushed.residue.is_empty());
        assert_eq!(
            pushed.relation.relation().condition(),
            &Expression::binary(
                BinaryOperator::Greater,
                Expression::attribute(&attr("people.age")),
                Expression::sql("30")
            )
        );
    }

    #[test]
    fn test_unconvertible_conjuncts_stay_residue() {
        let regex = FilterExpr::Regex(
            Box::new(var("name")),
            Box::new(FilterExpr::Constant(Node::plain_literal("^A"))),
            None,
        );
        let filter = FilterExpr::and(regex.clone(), FilterExpr::Bound("s".to_string()));
        let pushed = push_down(&people(), &filter);
        assert_eq!(pushed.residue, vec![regex]);
        assert!(pushed.relation.relation().condition().is_true());
    }
}
