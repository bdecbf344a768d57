use std::collections::BTreeSet;
use std::fmt;

use super::description::NodeDescription;
use super::node::Node;
use super::node_type::NodeType;
use super::value_maker::{RowValues, ValueMaker};
use crate::expression::Expression;
use crate::relational::{ColumnRenamer, OrderSpec, ProjectionSpec, RelationBuilder};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypedNodeMaker {
    pub node_type: NodeType,
    pub value_maker: ValueMaker,
    /// Each row produces a distinct node.
    pub unique: bool,
}

/// Turns result rows into graph terms of one position of a bridge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeMaker {
    /// Produces nothing.
    Empty,
    Fixed(Node),
    Typed(TypedNodeMaker),
}

impl NodeMaker {
    pub fn typed(node_type: NodeType, value_maker: ValueMaker, unique: bool) -> NodeMaker {
        NodeMaker::Typed(TypedNodeMaker {
            node_type,
            value_maker,
            unique,
        })
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, NodeMaker::Empty)
    }

    pub fn is_unique(&self) -> bool {
        match self {
            NodeMaker::Empty | NodeMaker::Fixed(_) => true,
            NodeMaker::Typed(t) => t.unique,
        }
    }

    pub fn node_type(&self) -> Option<&NodeType> {
        match self {
            NodeMaker::Typed(t) => Some(&t.node_type),
            _ => None,
        }
    }

    pub fn make_node(&self, row: &dyn RowValues) -> Option<Node> {
        match self {
            NodeMaker::Empty => None,
            NodeMaker::Fixed(node) => Some(node.clone()),
            NodeMaker::Typed(t) => {
                let value = t.value_maker.make_value(row)?;
                t.node_type.make_node(&value)
            }
        }
    }

    /// Narrows this node maker to `node`, pushing the matching condition
    /// into `builder`. Returns `Empty` when `node` can never be produced.
    pub fn select_node(&self, node: &Node, builder: &mut RelationBuilder) -> NodeMaker {
        match self {
            NodeMaker::Empty => NodeMaker::Empty,
            NodeMaker::Fixed(fixed) if fixed == node => self.clone(),
            NodeMaker::Fixed(_) => NodeMaker::Empty,
            NodeMaker::Typed(t) => {
                let condition = t.value_expression_for(node);
                if condition.is_false() {
                    return NodeMaker::Empty;
                }
                builder.add_condition(condition);
                NodeMaker::Fixed(node.clone())
            }
        }
    }

    /// Condition under which this node maker produces `node`.
    pub fn value_expression_for(&self, node: &Node) -> Expression {
        match self {
            NodeMaker::Empty => Expression::False,
            NodeMaker::Fixed(fixed) if fixed == node => Expression::True,
            NodeMaker::Fixed(_) => Expression::False,
            NodeMaker::Typed(t) => t.value_expression_for(node),
        }
    }

    pub fn projection_specs(&self) -> BTreeSet<ProjectionSpec> {
        match self {
            NodeMaker::Typed(t) => t.value_maker.projection_specs(),
            _ => BTreeSet::new(),
        }
    }

    pub fn order_specs(&self, ascending: bool) -> Vec<OrderSpec> {
        match self {
            NodeMaker::Typed(t) => t.value_maker.order_specs(ascending),
            _ => Vec::new(),
        }
    }

    pub fn rename(&self, renamer: &dyn ColumnRenamer) -> NodeMaker {
        match self {
            NodeMaker::Typed(t) => NodeMaker::Typed(TypedNodeMaker {
                node_type: t.node_type.clone(),
                value_maker: t.value_maker.rename(renamer),
                unique: t.unique,
            }),
            other => other.clone(),
        }
    }

    pub fn describe(&self) -> NodeDescription {
        match self {
            NodeMaker::Empty => NodeDescription::Empty,
            NodeMaker::Fixed(node) => NodeDescription::Fixed(node.clone()),
            NodeMaker::Typed(t) => NodeDescription::Typed {
                node_type: t.node_type.clone(),
                value: t.value_maker.describe(),
                unique: t.unique,
            },
        }
    }
}

impl TypedNodeMaker {
    pub fn value_expression_for(&self, node: &Node) -> Expression {
        match self.node_type.extract_value(node) {
            Some(value) => self.value_maker.value_expression(&value),
            None => Expression::False,
        }
    }
}

impl fmt::Display for NodeMaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeMaker::Empty => f.write_str("Empty"),
            NodeMaker::Fixed(node) => write!(f, "Fixed({})", node),
            NodeMaker::Typed(t) => {
                write!(f, "{}({})", t.node_type, t.value_maker)?;
                if t.unique {
                    f.write_str(":unique")?;
                }
                Ok(())
            }
        }
    }
}
