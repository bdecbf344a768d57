use std::collections::BTreeMap;
use std::fmt;

use super::attribute::{Attribute, RelationName};
use super::errors::RelationalError;

/// Mapping from alias names to the tables they stand for.
///
/// Names without an entry map to themselves in both directions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct AliasMap {
    by_alias: BTreeMap<RelationName, RelationName>,
}

impl AliasMap {
    pub const fn empty() -> Self {
        AliasMap {
            by_alias: BTreeMap::new(),
        }
    }

    pub fn from_pairs(
        pairs: impl IntoIterator<Item = (RelationName, RelationName)>,
    ) -> Result<Self, RelationalError> {
        let mut map = AliasMap::empty();
        for (original, alias) in pairs {
            map.insert(original, alias)?;
        }
        Ok(map)
    }

    /// Parse a declaration like `users AS u2` or `app.users AS u2`.
    pub fn parse_declaration(declaration: &str) -> Result<(RelationName, RelationName), RelationalError> {
        let words: Vec<&str> = declaration.split_whitespace().collect();
        match words.as_slice() {
            [original, keyword, alias] if keyword.eq_ignore_ascii_case("as") => Ok((
                RelationName::parse(original)
                    .map_err(|_| RelationalError::InvalidAlias(declaration.to_string()))?,
                RelationName::parse(alias)
                    .map_err(|_| RelationalError::InvalidAlias(declaration.to_string()))?,
            )),
            _ => Err(RelationalError::InvalidAlias(declaration.to_string())),
        }
    }

    pub fn insert(&mut self, original: RelationName, alias: RelationName) -> Result<(), RelationalError> {
        if let Some(existing) = self.by_alias.get(&alias) {
            if *existing != original {
                return Err(RelationalError::ConflictingAlias {
                    alias: alias.to_string(),
                    first: existing.to_string(),
                    second: original.to_string(),
                });
            }
        }
        self.by_alias.insert(alias, original);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.by_alias.is_empty()
    }

    pub fn is_alias(&self, name: &RelationName) -> bool {
        self.by_alias.contains_key(name)
    }

    pub fn has_alias(&self, original: &RelationName) -> bool {
        self.by_alias.values().any(|o| o == original)
    }

    pub fn original_of(&self, name: &RelationName) -> RelationName {
        self.by_alias.get(name).cloned().unwrap_or_else(|| name.clone())
    }

    pub fn alias_of(&self, original: &RelationName) -> RelationName {
        self.by_alias
            .iter()
            .find(|(_, o)| *o == original)
            .map(|(alias, _)| alias.clone())
            .unwrap_or_else(|| original.clone())
    }

    pub fn original_of_attribute(&self, attribute: &Attribute) -> Attribute {
        if self.is_alias(attribute.relation_name()) {
            attribute.with_relation(self.original_of(attribute.relation_name()))
        } else {
            attribute.clone()
        }
    }

    pub fn alias_of_attribute(&self, attribute: &Attribute) -> Attribute {
        if self.has_alias(attribute.relation_name()) {
            attribute.with_relation(self.alias_of(attribute.relation_name()))
        } else {
            attribute.clone()
        }
    }

    /// Composes two alias maps, `self` applied after `other`.
    ///
    /// Every alias of `other` keeps its original table and has its alias
    /// renamed through `self`. Aliases of `self` that rename one of
    /// `other`'s aliases are consumed by that step; the rest are kept.
    pub fn compose(&self, other: &AliasMap) -> AliasMap {
        let mut by_alias = BTreeMap::new();
        for (alias, original) in &other.by_alias {
            by_alias.insert(self.alias_of(alias), original.clone());
        }
        for (alias, original) in &self.by_alias {
            if !other.is_alias(original) {
                by_alias.insert(alias.clone(), original.clone());
            }
        }
        AliasMap { by_alias }
    }

    /// Union of two maps that do not share alias names.
    pub fn union(&self, other: &AliasMap) -> Result<AliasMap, RelationalError> {
        let mut merged = self.clone();
        for (alias, original) in &other.by_alias {
            merged.insert(original.clone(), alias.clone())?;
        }
        Ok(merged)
    }

    /// Iterates `(alias, original)` pairs in alias order.
    pub fn iter(&self) -> impl Iterator<Item = (&RelationName, &RelationName)> {
        self.by_alias.iter()
    }
}

impl fmt::Display for AliasMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .by_alias
            .iter()
            .map(|(alias, original)| format!("{} AS {}", original, alias))
            .collect();
        write!(f, "AliasMap({})", parts.join(", "))
    }
}
