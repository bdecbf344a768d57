use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::optimizer::{evaluate_all, FilterExpr};
use crate::expression::Expression;
use crate::node_maker::{Node, NodeMaker, RowValues};
use crate::relational::{ColumnRenamer, ProjectionSpec, Relation};

/// Variable bindings produced by a graph pattern.
pub type Binding = BTreeMap<String, Node>;

/// A relation whose rows each produce one binding of the pattern's
/// variables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRelation {
    relation: Relation,
    bindings: BTreeMap<String, NodeMaker>,
    residuals: Vec<(String, NodeMaker)>,
    filters: Vec<FilterExpr>,
}

impl NodeRelation {
    pub fn new(
        relation: Relation,
        bindings: BTreeMap<String, NodeMaker>,
        residuals: Vec<(String, NodeMaker)>,
    ) -> Self {
        NodeRelation {
            relation,
            bindings,
            residuals,
            filters: Vec::new(),
        }
    }

    /// The single empty binding.
    pub fn truth() -> Self {
        NodeRelation::new(Relation::True, BTreeMap::new(), Vec::new())
    }

    pub fn relation(&self) -> &Relation {
        &self.relation
    }

    pub fn bindings(&self) -> &BTreeMap<String, NodeMaker> {
        &self.bindings
    }

    pub fn node_maker(&self, variable: &str) -> Option<&NodeMaker> {
        self.bindings.get(variable)
    }

    pub fn residuals(&self) -> &[(String, NodeMaker)] {
        &self.residuals
    }

    /// Filter conjuncts checked on each binding after it is built.
    pub fn filters(&self) -> &[FilterExpr] {
        &self.filters
    }

    pub fn with_filters(&self, filters: impl IntoIterator<Item = FilterExpr>) -> NodeRelation {
        let mut relation = self.clone();
        relation.filters.extend(filters);
        relation
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    /// Columns the node makers read from each row.
    pub fn required_projections(&self) -> BTreeSet<ProjectionSpec> {
        self.bindings
            .values()
            .chain(self.residuals.iter().map(|(_, m)| m))
            .flat_map(NodeMaker::projection_specs)
            .collect()
    }

    pub fn select(&self, condition: &Expression) -> NodeRelation {
        NodeRelation {
            relation: self.relation.select(condition),
            bindings: self.bindings.clone(),
            residuals: self.residuals.clone(),
            filters: self.filters.clone(),
        }
    }

    pub fn with_relation(&self, relation: Relation) -> NodeRelation {
        NodeRelation {
            relation,
            bindings: self.bindings.clone(),
            residuals: self.residuals.clone(),
            filters: self.filters.clone(),
        }
    }

    pub fn rename(&self, renamer: &dyn ColumnRenamer) -> NodeRelation {
        NodeRelation {
            relation: self.relation.rename_columns(renamer),
            bindings: self
                .bindings
                .iter()
                .map(|(v, m)| (v.clone(), m.rename(renamer)))
                .collect(),
            residuals: self
                .residuals
                .iter()
                .map(|(v, m)| (v.clone(), m.rename(renamer)))
                .collect(),
            filters: self.filters.clone(),
        }
    }

    /// Builds the binding for one row. `None` when a node maker produces
    /// nothing for the row, a residual equality does not hold, or a filter
    /// rejects the binding.
    pub fn make_binding(&self, row: &dyn RowValues) -> Option<Binding> {
        let mut binding = Binding::new();
        for (variable, maker) in &self.bindings {
            binding.insert(variable.clone(), maker.make_node(row)?);
        }
        for (variable, maker) in &self.residuals {
            let node = maker.make_node(row)?;
            if binding.get(variable) != Some(&node) {
                return None;
            }
        }
        evaluate_all(&self.filters, &binding).then_some(binding)
    }
}

impl fmt::Display for NodeRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bindings: Vec<String> = self
            .bindings
            .iter()
            .map(|(v, m)| format!("?{} <- {}", v, m))
            .collect();
        write!(f, "NodeRelation[{}]", bindings.join(", "))?;
        for filter in &self.filters {
            write!(f, " FILTER {}", filter)?;
        }
        Ok(())
    }
}
