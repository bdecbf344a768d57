//! relgraph - graph pattern queries over relational databases
//!
//! This crate answers triple-pattern queries against live SQL tables through:
//! - A YAML mapping of tables to triples (bridges)
//! - Translation of graph patterns and filters into relational algebra
//! - SQL generation for several vendor dialects
//! - Lazy, cancellable execution and an optional result cache

pub mod config;
pub mod execution;
pub mod expression;
pub mod graph;
pub mod mapping;
pub mod node_maker;
pub mod query_planner;
pub mod relational;
pub mod sql_generator;
pub mod testing;
