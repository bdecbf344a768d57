//! Unit tests - cross-module checks that run without a database
//!
//! These tests drive translation, filter rewriting and SQL generation
//! through the public API.

mod filter_rewrite_tests;
mod sql_generation_tests;
mod translation_tests;
