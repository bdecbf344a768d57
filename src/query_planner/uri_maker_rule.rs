//! Ordering heuristic that avoids scanning URI columns.
//!
//! Matching a bound URI against a URI pattern is a structural check, while
//! matching it against a URI column means looking the value up in the
//! table. Bridges with URI patterns are tried first, and once one of them
//! has accepted a bound URI, bridges that could only find the same URI in a
//! column are skipped.

use std::collections::HashMap;

use super::triple_pattern::{PatternTerm, Position};
use super::triple_relation::TripleRelation;
use crate::node_maker::NodeMaker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UriMakerKind {
    UriPattern,
    UriColumn,
    Other,
}

impl UriMakerKind {
    pub fn of(maker: &NodeMaker) -> Self {
        let description = maker.describe();
        if description.is_uri_pattern() {
            UriMakerKind::UriPattern
        } else if description.is_uri_column() {
            UriMakerKind::UriColumn
        } else {
            UriMakerKind::Other
        }
    }
}

/// Classification of every bridge's subject and object node makers,
/// computed once per bridge set.
#[derive(Debug, Clone, Default)]
pub struct UriMakerRule {
    kinds: HashMap<(usize, Position), UriMakerKind>,
}

impl UriMakerRule {
    pub fn new(bridges: &[TripleRelation]) -> Self {
        let mut kinds = HashMap::new();
        for (index, bridge) in bridges.iter().enumerate() {
            for position in [Position::Subject, Position::Object] {
                kinds.insert((index, position), UriMakerKind::of(bridge.node_maker(position)));
            }
        }
        UriMakerRule { kinds }
    }

    pub fn kind(&self, bridge: usize, position: Position) -> UriMakerKind {
        self.kinds
            .get(&(bridge, position))
            .copied()
            .unwrap_or(UriMakerKind::Other)
    }

    fn priority(&self, bridge: usize) -> i32 {
        [Position::Subject, Position::Object]
            .into_iter()
            .map(|position| match self.kind(bridge, position) {
                UriMakerKind::UriPattern => 3,
                UriMakerKind::UriColumn => -1,
                UriMakerKind::Other => 0,
            })
            .sum()
    }

    /// Bridge indexes, pattern-backed bridges first. Ties keep their order.
    pub fn sort(&self, bridges: impl IntoIterator<Item = usize>) -> Vec<usize> {
        let mut sorted: Vec<usize> = bridges.into_iter().collect();
        sorted.sort_by_key(|&b| std::cmp::Reverse(self.priority(b)));
        sorted
    }

    pub fn checker(&self, term: &PatternTerm) -> UriMakerRuleChecker {
        UriMakerRuleChecker {
            bound_uri: term.as_node().is_some_and(|n| n.is_uri()),
            pattern_matched: false,
        }
    }
}

/// Tracks, for one bound term, whether a URI pattern has already accepted it.
#[derive(Debug, Clone, Copy)]
pub struct UriMakerRuleChecker {
    bound_uri: bool,
    pattern_matched: bool,
}

impl UriMakerRuleChecker {
    pub fn can_match(&self, kind: UriMakerKind) -> bool {
        !(self.bound_uri && self.pattern_matched && kind == UriMakerKind::UriColumn)
    }

    pub fn add_potential_match(&mut self, kind: UriMakerKind) {
        if self.bound_uri && kind == UriMakerKind::UriPattern {
            self.pattern_matched = true;
        }
    }
}
