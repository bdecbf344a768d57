//! Conjunctive normal form for filters.
//!
//! Negations are pushed down to the atoms first, then disjunctions are
//! distributed over conjunctions until the filter is a conjunction of
//! disjunctions. Each top-level conjunct can then be pushed into SQL on its
//! own.

use super::filter_expr::FilterExpr;

pub fn to_cnf(expr: &FilterExpr) -> FilterExpr {
    distribute(push_not(expr))
}

/// Top-level conjuncts of the normalised filter.
pub fn conjuncts(expr: &FilterExpr) -> Vec<FilterExpr> {
    let mut out = Vec::new();
    collect_conjuncts(to_cnf(expr), &mut out);
    out
}

fn collect_conjuncts(expr: FilterExpr, out: &mut Vec<FilterExpr>) {
    match expr {
        FilterExpr::And(a, b) => {
            collect_conjuncts(*a, out);
            collect_conjuncts(*b, out);
        }
        other => out.push(other),
    }
}

/// Moves negations inward with De Morgan's laws.
///
/// A negated conjunction of two atoms is kept as it is: it is already a
/// single disjunct. `!=` is an atom of its own.
fn push_not(expr: &FilterExpr) -> FilterExpr {
    match expr {
        FilterExpr::And(a, b) => FilterExpr::and(push_not(a), push_not(b)),
        FilterExpr::Or(a, b) => FilterExpr::or(push_not(a), push_not(b)),
        FilterExpr::Not(inner) => negate(inner),
        other => other.clone(),
    }
}

fn negate(expr: &FilterExpr) -> FilterExpr {
    match expr {
        FilterExpr::Not(inner) => push_not(inner),
        FilterExpr::And(a, b) if a.is_atomic() && b.is_atomic() => expr_not(expr.clone()),
        FilterExpr::And(a, b) => FilterExpr::or(negate(a), negate(b)),
        FilterExpr::Or(a, b) => FilterExpr::and(negate(a), negate(b)),
        atom => expr_not(atom.clone()),
    }
}

fn expr_not(expr: FilterExpr) -> FilterExpr {
    FilterExpr::Not(Box::new(expr))
}

fn distribute(expr: FilterExpr) -> FilterExpr {
    match expr {
        FilterExpr::And(a, b) => FilterExpr::and(distribute(*a), distribute(*b)),
        FilterExpr::Or(a, b) => distribute_or(distribute(*a), distribute(*b)),
        other => other,
    }
}

/// `a || b` for operands already in CNF.
fn distribute_or(a: FilterExpr, b: FilterExpr) -> FilterExpr {
    match (a, b) {
        (FilterExpr::And(x, y), b) => {
            FilterExpr::and(distribute_or(*x, b.clone()), distribute_or(*y, b))
        }
        (a, FilterExpr::And(x, y)) => {
            FilterExpr::and(distribute_or(a.clone(), *x), distribute_or(a, *y))
        }
        (a, b) => FilterExpr::or(a, b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> FilterExpr {
        FilterExpr::variable(name)
    }

    #[test]
    fn test_negated_conjunction_of_atoms_is_kept() {
        let filter = FilterExpr::not(FilterExpr::and(var("a"), var("b")));
        assert_eq!(to_cnf(&filter), filter);
        assert_eq!(to_cnf(&filter).to_string(), "!(?a && ?b)");
    }

    #[test]
    fn test_negated_disjunction_uses_de_morgan() {
        let filter = FilterExpr::not(FilterExpr::or(var("a"), var("b")));
        assert_eq!(
            to_cnf(&filter),
            FilterExpr::and(FilterExpr::not(var("a")), FilterExpr::not(var("b")))
        );
    }

    #[test]
    fn test_double_negation() {
        let filter = FilterExpr::not(FilterExpr::not(var("a")));
        assert_eq!(to_cnf(&filter), var("a"));
    }

    #[test]
    fn test_or_distributes_over_and() {
        let filter = FilterExpr::or(var("a"), FilterExpr::and(var("b"), var("c")));
        assert_eq!(
            conjuncts(&filter),
            vec![
                FilterExpr::or(var("a"), var("b")),
                FilterExpr::or(var("a"), var("c")),
            ]
        );
    }

    #[test]
    fn test_nested_negated_conjunction_expands() {
        let filter = FilterExpr::not(FilterExpr::and(
            var("a"),
            FilterExpr::or(var("b"), var("c")),
        ));
        assert_eq!(
            conjuncts(&filter),
            vec![
                FilterExpr::or(FilterExpr::not(var("a")), FilterExpr::not(var("b"))),
                FilterExpr::or(FilterExpr::not(var("a")), FilterExpr::not(var("c"))),
            ]
        );
    }

    #[test]
    fn test_not_equal_stays_atomic() {
        use super::super::filter_expr::CompareOp;
        let filter = FilterExpr::compare(CompareOp::NotEqual, var("a"), var("b"));
        assert_eq!(conjuncts(&filter), vec![filter]);
    }
}
