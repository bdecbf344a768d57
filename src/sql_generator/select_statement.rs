use std::collections::{BTreeMap, BTreeSet};

use super::errors::SqlGeneratorError;
use crate::expression::{Expression, SqlContext};
use crate::relational::{Join, JoinDirection, ProjectionSpec, RelationData, RelationName, Relation};

/// A rendered SELECT statement and the position of each projected column
/// in its result rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectStatement {
    pub sql: String,
    pub columns: Vec<ProjectionSpec>,
}

impl SelectStatement {
    pub fn column_index(&self) -> BTreeMap<ProjectionSpec, usize> {
        self.columns
            .iter()
            .enumerate()
            .map(|(i, spec)| (spec.clone(), i))
            .collect()
    }
}

fn order_projection(expression: &Expression) -> ProjectionSpec {
    match expression {
        Expression::Attribute(attribute) => ProjectionSpec::Attribute(attribute.clone()),
        other => ProjectionSpec::Expression(other.clone()),
    }
}

/// Builds the SELECT statement for a relation.
///
/// `Empty` and `True` relations have no statement: the first has no rows
/// and the second needs no database.
pub fn build_select(relation: &Relation) -> Result<SelectStatement, SqlGeneratorError> {
    match relation {
        Relation::Empty => Err(SqlGeneratorError::EmptyRelation),
        Relation::True => Err(SqlGeneratorError::TrivialRelation),
        Relation::Rows(data) => Ok(SelectStatementBuilder::new(relation, data).build()),
    }
}

struct SelectStatementBuilder<'a> {
    relation: &'a Relation,
    data: &'a RelationData,
    context: SqlContext<'a>,
}

impl<'a> SelectStatementBuilder<'a> {
    fn new(relation: &'a Relation, data: &'a RelationData) -> Self {
        SelectStatementBuilder {
            relation,
            data,
            context: SqlContext::for_relation(data),
        }
    }

    fn build(&self) -> SelectStatement {
        let vendor = self.context.vendor;
        let mut projections = self.data.projections.clone();
        if !self.data.unique {
            // SELECT DISTINCT may only order by selected expressions
            projections.extend(self.data.order.iter().map(|o| order_projection(&o.expression)));
        }
        let columns: Vec<ProjectionSpec> = projections.into_iter().collect();

        let mut sql = String::from("SELECT ");
        if !self.data.unique {
            sql.push_str("DISTINCT ");
        }
        if let Some(top) = vendor.limit_prefix(self.data.limit) {
            sql.push_str(&top);
            sql.push(' ');
        }

        if columns.is_empty() {
            sql.push('1');
        } else {
            let rendered: Vec<String> = columns
                .iter()
                .enumerate()
                .map(|(i, spec)| spec.to_sql(&self.context, i))
                .collect();
            sql.push_str(&rendered.join(", "));
        }

        sql.push_str(" FROM ");
        sql.push_str(&self.from_clause());

        let conditions = self.where_conditions();
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        if !self.data.order.is_empty() {
            let order: Vec<String> = self.data.order.iter().map(|o| o.to_sql(&self.context)).collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&order.join(", "));
        }

        if let Some(limit) = vendor.limit_suffix(self.data.limit) {
            sql.push(' ');
            sql.push_str(&limit);
        }

        log::trace!("Built statement: {}", sql);
        SelectStatement { sql, columns }
    }

    fn table_reference(&self, table: &RelationName) -> String {
        let vendor = self.context.vendor;
        if self.data.aliases.is_alias(table) {
            vendor.alias_clause(
                &vendor.quote_relation_name(&self.data.aliases.original_of(table)),
                &vendor.quote_relation_name(table),
            )
        } else {
            vendor.quote_relation_name(table)
        }
    }

    /// Plain tables separated by commas; each optional table is attached
    /// with LEFT OUTER JOIN right after the table it hangs off.
    fn from_clause(&self) -> String {
        let outer: Vec<&Join> = self
            .data
            .joins
            .iter()
            .filter(|j| j.direction() == JoinDirection::Left)
            .collect();
        let optional: BTreeSet<&RelationName> = outer.iter().map(|j| j.table2()).collect();

        let mut items = Vec::new();
        for table in self.relation.tables() {
            if optional.contains(&table) {
                continue;
            }
            let mut item = self.table_reference(&table);
            self.attach_outer_joins(&table, &outer, &mut item, &mut BTreeSet::new());
            items.push(item);
        }
        items.join(", ")
    }

    fn attach_outer_joins(
        &self,
        table: &RelationName,
        outer: &[&Join],
        into: &mut String,
        visited: &mut BTreeSet<RelationName>,
    ) {
        if !visited.insert(table.clone()) {
            return;
        }
        for join in outer.iter().filter(|j| j.table1() == table) {
            let on: Vec<String> = join
                .pairs()
                .map(|(a, b)| {
                    format!(
                        "{} = {}",
                        self.context.vendor.quote_attribute(a),
                        self.context.vendor.quote_attribute(b)
                    )
                })
                .collect();
            into.push_str(" LEFT OUTER JOIN ");
            into.push_str(&self.table_reference(join.table2()));
            into.push_str(&format!(" ON ({})", on.join(" AND ")));
            self.attach_outer_joins(join.table2(), outer, into, visited);
        }
    }

    fn where_conditions(&self) -> Vec<String> {
        let vendor = self.context.vendor;
        let mut conditions: Vec<String> = self
            .data
            .condition
            .conjuncts()
            .into_iter()
            .map(|c| c.to_sql(&self.context))
            .collect();

        for join in &self.data.joins {
            if join.direction() != JoinDirection::Undirected {
                continue;
            }
            for (a, b) in join.pairs() {
                conditions.push(format!(
                    "{} = {}",
                    vendor.quote_attribute(a),
                    vendor.quote_attribute(b)
                ));
            }
        }

        if let Some(rownum) = vendor.limit_condition(self.data.limit) {
            conditions.push(rownum);
        }
        conditions.sort();
        conditions.dedup();
        conditions
    }
}
