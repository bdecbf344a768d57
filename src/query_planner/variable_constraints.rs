//! Join discovery between node makers bound to the same variable.

use std::collections::BTreeMap;

use crate::expression::Expression;
use crate::node_maker::{NodeMaker, ValueMaker};

/// How two node makers can be forced to produce the same node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// No node is produced by both.
    Impossible,
    /// Equal nodes exactly when this condition holds.
    Condition(Expression),
    /// Equality has no SQL form; compare the produced nodes instead.
    Residual,
}

pub fn join_condition(a: &NodeMaker, b: &NodeMaker) -> JoinOutcome {
    match (a, b) {
        (NodeMaker::Empty, _) | (_, NodeMaker::Empty) => JoinOutcome::Impossible,
        (NodeMaker::Fixed(node), other) | (other, NodeMaker::Fixed(node)) => {
            outcome(other.value_expression_for(node))
        }
        (NodeMaker::Typed(ta), NodeMaker::Typed(tb)) => {
            if ta.node_type != tb.node_type {
                return JoinOutcome::Impossible;
            }
            join_values(&ta.value_maker, &tb.value_maker)
        }
    }
}

fn outcome(condition: Expression) -> JoinOutcome {
    if condition.is_false() {
        JoinOutcome::Impossible
    } else {
        JoinOutcome::Condition(condition)
    }
}

fn join_values(a: &ValueMaker, b: &ValueMaker) -> JoinOutcome {
    let (base_a, translator_a) = undecorated(a);
    let (base_b, translator_b) = undecorated(b);
    if translator_a != translator_b {
        return JoinOutcome::Residual;
    }

    match (base_a, base_b) {
        (ValueMaker::Column(x), ValueMaker::Column(y)) => outcome(Expression::equal(
            Expression::attribute(x),
            Expression::attribute(y),
        )),
        (ValueMaker::Pattern(p), ValueMaker::Pattern(q)) => {
            if p.is_equivalent_to(q) && p.is_reversible() {
                return outcome(Expression::and(p.columns().iter().zip(q.columns()).map(
                    |(x, y)| {
                        Expression::equal(
                            Expression::attribute(&x.attribute),
                            Expression::attribute(&y.attribute),
                        )
                    },
                )));
            }
            if p.is_disjoint_from(q) {
                return JoinOutcome::Impossible;
            }
            sql_equality(base_a, base_b)
        }
        (ValueMaker::BlankNodeId(x), ValueMaker::BlankNodeId(y)) => {
            if x.class_id() != y.class_id() || x.attributes().len() != y.attributes().len() {
                return JoinOutcome::Impossible;
            }
            outcome(Expression::and(x.attributes().iter().zip(y.attributes()).map(
                |(p, q)| Expression::equal(Expression::attribute(p), Expression::attribute(q)),
            )))
        }
        (ValueMaker::Constant(x), ValueMaker::Constant(y)) => {
            if x == y {
                JoinOutcome::Condition(Expression::True)
            } else {
                JoinOutcome::Impossible
            }
        }
        (ValueMaker::Constant(value), other) | (other, ValueMaker::Constant(value)) => {
            outcome(other.value_expression(value))
        }
        _ => sql_equality(base_a, base_b),
    }
}

fn sql_equality(a: &ValueMaker, b: &ValueMaker) -> JoinOutcome {
    match (a.sql_expression(), b.sql_expression()) {
        (Some(x), Some(y)) => outcome(Expression::equal(x, y)),
        _ => JoinOutcome::Residual,
    }
}

/// Strips decorators, returning the innermost value maker and the names of
/// the translation tables applied on top of it, outermost first.
fn undecorated(maker: &ValueMaker) -> (&ValueMaker, Vec<&str>) {
    match maker {
        ValueMaker::Decorated(d) => {
            let (base, mut translators) = undecorated(&d.base);
            if let Some(table) = &d.translator {
                translators.insert(0, table.name());
            }
            (base, translators)
        }
        other => (other, Vec::new()),
    }
}

/// Node makers collected per variable while combining bridges.
#[derive(Debug, Clone, Default)]
pub struct VariableConstraints {
    makers: BTreeMap<String, Vec<NodeMaker>>,
}

/// The join conditions implied by shared variables.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConstraints {
    pub condition: Expression,
    /// One node maker per variable.
    pub bindings: BTreeMap<String, NodeMaker>,
    /// Further node makers whose node must equal the binding's.
    pub residuals: Vec<(String, NodeMaker)>,
}

impl VariableConstraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, variable: &str, maker: NodeMaker) {
        self.makers
            .entry(variable.to_string())
            .or_default()
            .push(maker);
    }

    /// `None` when some variable can never take one value across all of
    /// its node makers.
    pub fn resolve(&self) -> Option<ResolvedConstraints> {
        let mut conditions = Vec::new();
        let mut bindings = BTreeMap::new();
        let mut residuals = Vec::new();

        for (variable, makers) in &self.makers {
            // A fixed node maker turns every other one into a selection
            let primary_index = makers
                .iter()
                .position(|m| matches!(m, NodeMaker::Fixed(_)))
                .unwrap_or(0);
            let Some(primary) = makers.get(primary_index) else {
                continue;
            };
            for (i, other) in makers.iter().enumerate() {
                if i == primary_index || other == primary {
                    continue;
                }
                match join_condition(primary, other) {
                    JoinOutcome::Impossible => {
                        log::trace!("Variable ?{} cannot join {} with {}", variable, primary, other);
                        return None;
                    }
                    JoinOutcome::Condition(condition) => conditions.push(condition),
                    JoinOutcome::Residual => residuals.push((variable.clone(), other.clone())),
                }
            }
            bindings.insert(variable.clone(), primary.clone());
        }

        let condition = Expression::and(conditions);
        if condition.is_false() {
            return None;
        }
        Some(ResolvedConstraints {
            condition,
            bindings,
            residuals,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_maker::{BlankNodeId, Node, NodeType, Pattern, TranslationTable};
    use crate::relational::Attribute;

    fn attr(s: &str) -> Attribute {
        Attribute::parse(s).unwrap()
    }

    fn uri(value_maker: ValueMaker) -> NodeMaker {
        NodeMaker::typed(NodeType::Uri, value_maker, false)
    }

    fn pattern(s: &str) -> ValueMaker {
        ValueMaker::Pattern(Pattern::parse(s).unwrap())
    }

    #[test]
    fn test_columns_join_by_equality() {
        let outcome = join_condition(
            &uri(ValueMaker::Column(attr("a.x"))),
            &uri(ValueMaker::Column(attr("b.y"))),
        );
        assert_eq!(
            outcome,
            JoinOutcome::Condition(Expression::equal(
                Expression::attribute(&attr("a.x")),
                Expression::attribute(&attr("b.y"))
            ))
        );
    }

    #[test]
    fn test_different_node_types_cannot_join() {
        let outcome = join_condition(
            &uri(ValueMaker::Column(attr("a.x"))),
            &NodeMaker::typed(NodeType::plain_literal(), ValueMaker::Column(attr("b.y")), false),
        );
        assert_eq!(outcome, JoinOutcome::Impossible);
    }

    #[test]
    fn test_equivalent_patterns_join_column_wise() {
        let outcome = join_condition(
            &uri(pattern("http://ex/p/@@a.id@@")),
            &uri(pattern("http://ex/p/@@b.person@@")),
        );
        assert_eq!(
            outcome,
            JoinOutcome::Condition(Expression::equal(
                Expression::attribute(&attr("a.id")),
                Expression::attribute(&attr("b.person"))
            ))
        );
    }

    #[test]
    fn test_disjoint_patterns_cannot_join() {
        let outcome = join_condition(
            &uri(pattern("http://ex/person/@@a.id@@")),
            &uri(pattern("http://ex/project/@@b.id@@")),
        );
        assert_eq!(outcome, JoinOutcome::Impossible);
    }

    #[test]
    fn test_blank_nodes_of_other_class_cannot_join() {
        let a = NodeMaker::typed(
            NodeType::Blank,
            ValueMaker::BlankNodeId(BlankNodeId::new("Addr", vec![attr("a.id")])),
            false,
        );
        let b = NodeMaker::typed(
            NodeType::Blank,
            ValueMaker::BlankNodeId(BlankNodeId::new("Phone", vec![attr("b.id")])),
            false,
        );
        assert_eq!(join_condition(&a, &b), JoinOutcome::Impossible);
    }

    #[test]
    fn test_translated_values_join_residually() {
        let table = TranslationTable::new("colors", vec![("1".to_string(), "red".to_string())])
            .unwrap();
        let translated = uri(ValueMaker::decorate(
            ValueMaker::Column(attr("a.color")),
            Vec::new(),
            Some(table),
        ));
        let plain = uri(ValueMaker::Column(attr("b.color")));
        assert_eq!(join_condition(&translated, &plain), JoinOutcome::Residual);
    }

    #[test]
    fn test_fixed_node_becomes_selection() {
        let fixed = NodeMaker::Fixed(Node::uri("http://ex/p/3"));
        let outcome = join_condition(&fixed, &uri(pattern("http://ex/p/@@a.id@@")));
        assert_eq!(
            outcome,
            JoinOutcome::Condition(Expression::attribute_equals_value(&attr("a.id"), "3"))
        );
    }

    #[test]
    fn test_resolve_collects_conditions_and_bindings() {
        let mut constraints = VariableConstraints::new();
        constraints.add("x", uri(ValueMaker::Column(attr("a.x"))));
        constraints.add("x", uri(ValueMaker::Column(attr("b.x"))));
        constraints.add("y", uri(ValueMaker::Column(attr("b.y"))));
        let resolved = constraints.resolve().unwrap();
        assert_eq!(resolved.bindings.len(), 2);
        assert_eq!(resolved.bindings["x"], uri(ValueMaker::Column(attr("a.x"))));
        assert!(resolved.residuals.is_empty());
        assert!(!resolved.condition.is_true());
    }

    #[test]
    fn test_resolve_fails_on_impossible_join() {
        let mut constraints = VariableConstraints::new();
        constraints.add("x", NodeMaker::Fixed(Node::uri("http://ex/a")));
        constraints.add("x", NodeMaker::Fixed(Node::uri("http://ex/b")));
        assert!(constraints.resolve().is_none());
    }
}
