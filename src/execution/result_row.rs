use std::collections::BTreeMap;
use std::sync::Arc;

use crate::node_maker::RowValues;
use crate::relational::ProjectionSpec;

/// A fetched row, addressable by the projection that produced each value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    columns: Arc<BTreeMap<ProjectionSpec, usize>>,
    values: Vec<Option<String>>,
}

impl ResultRow {
    pub fn new(columns: Arc<BTreeMap<ProjectionSpec, usize>>, values: Vec<Option<String>>) -> Self {
        ResultRow { columns, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Option<String>] {
        &self.values
    }
}

impl RowValues for ResultRow {
    fn value(&self, spec: &ProjectionSpec) -> Option<&str> {
        let index = *self.columns.get(spec)?;
        self.values.get(index)?.as_deref()
    }
}
