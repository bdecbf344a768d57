use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::attribute::Attribute;
use crate::sql_generator::{SqlDataType, Vendor};

/// Identifies the database a relation lives in, with the dialect and column
/// type catalog needed to render SQL for it.
///
/// Handles compare by name only; the catalog is shared between clones.
#[derive(Debug, Clone)]
pub struct DatabaseHandle {
    name: Arc<str>,
    vendor: Vendor,
    column_types: Arc<BTreeMap<Attribute, SqlDataType>>,
}

impl DatabaseHandle {
    pub fn new(name: &str, vendor: Vendor) -> Self {
        DatabaseHandle {
            name: Arc::from(name),
            vendor,
            column_types: Arc::new(BTreeMap::new()),
        }
    }

    pub fn with_column_types(mut self, column_types: BTreeMap<Attribute, SqlDataType>) -> Self {
        self.column_types = Arc::new(column_types);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vendor(&self) -> Vendor {
        self.vendor
    }

    /// Type of a column of a physical table (not an alias).
    pub fn column_type(&self, attribute: &Attribute) -> SqlDataType {
        self.column_types.get(attribute).copied().unwrap_or_default()
    }
}

impl PartialEq for DatabaseHandle {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for DatabaseHandle {}

impl Hash for DatabaseHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl PartialOrd for DatabaseHandle {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DatabaseHandle {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}
