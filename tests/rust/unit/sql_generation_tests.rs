//! Unit tests for SELECT statement rendering and expression algebra

#[cfg(test)]
mod sql_generation_tests {
    use relgraph::expression::Expression;
    use relgraph::relational::{
        Attribute, DatabaseHandle, IdentityRenamer, ProjectionSpec, Relation,
    };
    use relgraph::sql_generator::{build_select, SqlGeneratorError, Vendor};

    fn attr(s: &str) -> Attribute {
        Attribute::parse(s).unwrap()
    }

    fn single_column(vendor: Vendor, limit: Option<u64>) -> Relation {
        let mut builder = Relation::builder(DatabaseHandle::new("db", vendor));
        builder.add_projection(ProjectionSpec::Attribute(attr("table.foo")));
        builder.restrict_limit(limit);
        builder.freeze()
    }

    #[test]
    fn test_single_column_select() {
        let statement = build_select(&single_column(Vendor::Sql92, None)).unwrap();
        assert_eq!(statement.sql, "SELECT DISTINCT \"table\".\"foo\" FROM \"table\"");
        assert_eq!(statement.columns, vec![ProjectionSpec::Attribute(attr("table.foo"))]);
    }

    #[test]
    fn test_limit_syntax_follows_vendor() {
        let render = |vendor| build_select(&single_column(vendor, Some(3))).unwrap().sql;
        assert!(render(Vendor::PostgreSql).ends_with(" LIMIT 3"));
        assert!(render(Vendor::SqlServer).starts_with("SELECT DISTINCT TOP 3 "));
        assert!(render(Vendor::Oracle).ends_with("WHERE ROWNUM <= 3"));
    }

    #[test]
    fn test_sentinel_relations_have_no_statement() {
        assert_eq!(build_select(&Relation::Empty).unwrap_err(), SqlGeneratorError::EmptyRelation);
        assert_eq!(build_select(&Relation::True).unwrap_err(), SqlGeneratorError::TrivialRelation);
    }

    #[test]
    fn test_conjunction_absorption() {
        let a = Expression::attribute_equals_value(&attr("t.a"), "1");
        assert_eq!(Expression::and([Expression::True, a.clone()]), a);
        assert_eq!(Expression::and([a.clone(), Expression::False]), Expression::False);
        assert_eq!(Expression::and([Expression::True, Expression::True]), Expression::True);
        match Expression::and([Expression::True, a, Expression::sql("t.b > 2")]) {
            Expression::Conjunction(members) => {
                assert_eq!(members.len(), 2);
                assert!(!members.contains(&Expression::True));
            }
            other => panic!("expected a conjunction, got {:?}", other),
        }
    }

    #[test]
    fn test_identity_rename_is_a_no_op() {
        let expressions = [
            Expression::True,
            Expression::attribute_equals_value(&attr("t.a"), "x"),
            Expression::or([
                Expression::sql("t.b = 1"),
                Expression::not(Expression::attribute(&attr("s.t.c"))),
            ]),
        ];
        for e in expressions {
            assert_eq!(e.rename(&IdentityRenamer), e);
        }
    }
}
