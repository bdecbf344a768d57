//! Static descriptions of node makers, used to reason about what a node
//! maker can produce without evaluating it.

use super::blank_node_id::BlankNodeId;
use super::node::Node;
use super::node_type::NodeType;
use super::pattern::Pattern;
use super::value_constraint::ValueConstraint;
use crate::expression::Expression;
use crate::relational::Attribute;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueShape {
    Column(Attribute),
    Pattern(Pattern),
    BlankNodeId(BlankNodeId),
    Constant(String),
    SqlExpression(Expression),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueDescription {
    pub shape: ValueShape,
    pub constraints: Vec<ValueConstraint>,
    /// Translation table names, outermost first.
    pub translators: Vec<String>,
}

impl ValueDescription {
    pub fn plain(shape: ValueShape) -> Self {
        ValueDescription {
            shape,
            constraints: Vec::new(),
            translators: Vec::new(),
        }
    }

    pub fn is_translated(&self) -> bool {
        !self.translators.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeDescription {
    Empty,
    Fixed(Node),
    Typed {
        node_type: NodeType,
        value: ValueDescription,
        unique: bool,
    },
}

impl NodeDescription {
    /// URIs built from a template.
    pub fn is_uri_pattern(&self) -> bool {
        matches!(
            self,
            NodeDescription::Typed {
                node_type: NodeType::Uri,
                value: ValueDescription {
                    shape: ValueShape::Pattern(_),
                    ..
                },
                ..
            }
        )
    }

    /// URIs read verbatim from a column.
    pub fn is_uri_column(&self) -> bool {
        matches!(
            self,
            NodeDescription::Typed {
                node_type: NodeType::Uri,
                value: ValueDescription {
                    shape: ValueShape::Column(_),
                    ..
                },
                ..
            }
        )
    }
}
