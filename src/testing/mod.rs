//! Test doubles shared by unit and integration tests.

mod fake_connection;

pub use fake_connection::{row, FakeConnection};
