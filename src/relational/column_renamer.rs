use std::collections::BTreeMap;

use super::alias_map::AliasMap;
use super::attribute::Attribute;

/// Something that renames attributes, applied uniformly across a relation
/// and everything that refers to its columns.
pub trait ColumnRenamer {
    fn apply_to_attribute(&self, attribute: &Attribute) -> Attribute;

    fn apply_to_alias_map(&self, aliases: &AliasMap) -> AliasMap {
        aliases.clone()
    }
}

/// Renames each table to its alias.
impl ColumnRenamer for AliasMap {
    fn apply_to_attribute(&self, attribute: &Attribute) -> Attribute {
        self.alias_of_attribute(attribute)
    }

    fn apply_to_alias_map(&self, aliases: &AliasMap) -> AliasMap {
        self.compose(aliases)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityRenamer;

impl ColumnRenamer for IdentityRenamer {
    fn apply_to_attribute(&self, attribute: &Attribute) -> Attribute {
        attribute.clone()
    }
}

/// Explicit attribute-to-attribute renaming; unlisted attributes are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnRenamerMap {
    renames: BTreeMap<Attribute, Attribute>,
}

impl ColumnRenamerMap {
    pub fn new(renames: BTreeMap<Attribute, Attribute>) -> Self {
        ColumnRenamerMap { renames }
    }

    pub fn insert(&mut self, from: Attribute, to: Attribute) {
        self.renames.insert(from, to);
    }
}

impl ColumnRenamer for ColumnRenamerMap {
    fn apply_to_attribute(&self, attribute: &Attribute) -> Attribute {
        self.renames
            .get(attribute)
            .cloned()
            .unwrap_or_else(|| attribute.clone())
    }
}
