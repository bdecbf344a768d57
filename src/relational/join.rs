use std::collections::BTreeMap;
use std::fmt;

use super::attribute::{Attribute, RelationName};
use super::column_renamer::ColumnRenamer;
use super::errors::RelationalError;
use crate::expression::Expression;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JoinDirection {
    Undirected,
    /// Outer join keeping every row of the first side.
    Left,
    /// Outer join keeping every row of the second side.
    Right,
}

/// Equality join between columns of two tables.
///
/// Joins are stored in canonical form: `Right` joins are flipped into
/// `Left` joins, undirected joins put the smaller table first, and column
/// pairs are sorted. Derived equality and ordering therefore treat a join
/// and its inverse as the same join.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Join {
    side1: Vec<Attribute>,
    side2: Vec<Attribute>,
    direction: JoinDirection,
}

impl Join {
    pub fn new(
        side1: Vec<Attribute>,
        side2: Vec<Attribute>,
        direction: JoinDirection,
    ) -> Result<Join, RelationalError> {
        if side1.len() != side2.len() {
            return Err(RelationalError::JoinArityMismatch {
                left: side1.len(),
                right: side2.len(),
            });
        }
        if side1.is_empty() {
            return Err(RelationalError::EmptyJoin);
        }
        check_single_table(&side1)?;
        check_single_table(&side2)?;
        Ok(Self::canonical(side1, side2, direction))
    }

    /// Groups column equalities into one join per table pair.
    pub fn build(
        pairs: impl IntoIterator<Item = (Attribute, Attribute)>,
        direction: JoinDirection,
    ) -> Result<Vec<Join>, RelationalError> {
        let mut grouped: BTreeMap<(RelationName, RelationName), (Vec<Attribute>, Vec<Attribute>)> =
            BTreeMap::new();
        for (a, b) in pairs {
            let key = (a.relation_name().clone(), b.relation_name().clone());
            let entry = grouped.entry(key).or_default();
            entry.0.push(a);
            entry.1.push(b);
        }
        grouped
            .into_values()
            .map(|(side1, side2)| Join::new(side1, side2, direction))
            .collect()
    }

    fn canonical(side1: Vec<Attribute>, side2: Vec<Attribute>, direction: JoinDirection) -> Join {
        let (side1, side2, direction) = match direction {
            JoinDirection::Right => (side2, side1, JoinDirection::Left),
            JoinDirection::Undirected
                if side1.first().map(Attribute::relation_name)
                    > side2.first().map(Attribute::relation_name) =>
            {
                (side2, side1, JoinDirection::Undirected)
            }
            other => (side1, side2, other),
        };

        let mut pairs: Vec<(Attribute, Attribute)> = side1.into_iter().zip(side2).collect();
        pairs.sort();
        pairs.dedup();
        let (side1, side2) = pairs.into_iter().unzip();
        Join {
            side1,
            side2,
            direction,
        }
    }

    pub fn attributes1(&self) -> &[Attribute] {
        &self.side1
    }

    pub fn attributes2(&self) -> &[Attribute] {
        &self.side2
    }

    pub fn table1(&self) -> &RelationName {
        // Non-empty by construction
        self.side1[0].relation_name()
    }

    pub fn table2(&self) -> &RelationName {
        self.side2[0].relation_name()
    }

    pub fn direction(&self) -> JoinDirection {
        self.direction
    }

    pub fn is_outer(&self) -> bool {
        self.direction != JoinDirection::Undirected
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&Attribute, &Attribute)> {
        self.side1.iter().zip(self.side2.iter())
    }

    pub fn contains_table(&self, table: &RelationName) -> bool {
        self.table1() == table || self.table2() == table
    }

    /// The join condition as a conjunction of column equalities.
    pub fn condition(&self) -> Expression {
        Expression::and(self.pairs().map(|(a, b)| {
            Expression::equal(Expression::Attribute(a.clone()), Expression::Attribute(b.clone()))
        }))
    }

    pub fn rename(&self, renamer: &dyn ColumnRenamer) -> Join {
        let side1 = self.side1.iter().map(|a| renamer.apply_to_attribute(a)).collect();
        let side2 = self.side2.iter().map(|a| renamer.apply_to_attribute(a)).collect();
        Self::canonical(side1, side2, self.direction)
    }
}

fn check_single_table(side: &[Attribute]) -> Result<(), RelationalError> {
    let first = side[0].relation_name();
    if side.iter().any(|a| a.relation_name() != first) {
        let names: Vec<String> = side.iter().map(Attribute::qualified_name).collect();
        return Err(RelationalError::MixedJoinTables(names.join(", ")));
    }
    Ok(())
}

impl fmt::Display for Join {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arrow = match self.direction {
            JoinDirection::Undirected => "<=>",
            JoinDirection::Left => "=>",
            JoinDirection::Right => "<=",
        };
        let pairs: Vec<String> = self
            .pairs()
            .map(|(a, b)| format!("{} {} {}", a, arrow, b))
            .collect();
        write!(f, "Join({})", pairs.join(", "))
    }
}
