//! Integration tests - components working together over a database
//!
//! A `FakeConnection` stands in for the database, so these tests run
//! without a server. They cover mapping load, pattern queries, cancellation
//! and the result cache.

mod cancellation_tests;
mod config_tests;
mod mapped_graph_tests;
mod result_cache_tests;
