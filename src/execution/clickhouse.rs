//! [`DatabaseConnection`] over the ClickHouse HTTP client.
//!
//! Rows are streamed as `JSONCompactEachRow` lines on a runtime owned by the
//! connection, so the connection must not be used from inside another tokio
//! runtime.

use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clickhouse::query::BytesCursor;
use clickhouse::Client;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, Lines};
use tokio::runtime::Runtime;
use tokio::sync::Notify;

use super::connection::{DatabaseConnection, RawRow, RowCursor, StatementCanceller};
use super::errors::DatabaseError;
use crate::sql_generator::Vendor;

const OUTPUT_FORMAT: &str = "JSONCompactEachRow";

pub struct ClickHouseConnection {
    client: Client,
    runtime: Arc<Runtime>,
}

impl ClickHouseConnection {
    pub fn new(client: Client) -> Result<Self, DatabaseError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("relgraph-clickhouse")
            .enable_all()
            .build()
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;
        Ok(ClickHouseConnection {
            client,
            runtime: Arc::new(runtime),
        })
    }

    /// Connects with `CLICKHOUSE_URL`, `CLICKHOUSE_USER`,
    /// `CLICKHOUSE_PASSWORD` and `CLICKHOUSE_DATABASE`.
    pub fn from_env() -> Result<Self, DatabaseError> {
        let read = |key: &str| {
            env::var(key).map_err(|_| DatabaseError::Connection(format!("{} is not set", key)))
        };
        let client = Client::default()
            .with_url(read("CLICKHOUSE_URL")?)
            .with_user(read("CLICKHOUSE_USER")?)
            .with_password(read("CLICKHOUSE_PASSWORD")?)
            .with_database(read("CLICKHOUSE_DATABASE")?)
            // NULL for unmatched outer join columns
            .with_option("join_use_nulls", "1");
        Self::new(client)
    }
}

impl DatabaseConnection for ClickHouseConnection {
    fn vendor(&self) -> Vendor {
        Vendor::ClickHouse
    }

    fn execute(&self, sql: &str) -> Result<Box<dyn RowCursor>, DatabaseError> {
        let lines = self
            .client
            .query(sql)
            .fetch_bytes(OUTPUT_FORMAT)
            .map_err(|e| DatabaseError::Statement(e.to_string()))?
            .lines();
        Ok(Box::new(ClickHouseCursor {
            runtime: Arc::clone(&self.runtime),
            lines: Some(lines),
            canceller: Arc::new(ClickHouseCanceller::default()),
        }))
    }
}

#[derive(Default)]
struct ClickHouseCanceller {
    cancelled: AtomicBool,
    notify: Notify,
}

impl StatementCanceller for ClickHouseCanceller {
    fn cancel(&self) -> Result<(), DatabaseError> {
        self.cancelled.store(true, Ordering::SeqCst);
        // Stores a permit when no fetch is waiting yet
        self.notify.notify_one();
        Ok(())
    }
}

struct ClickHouseCursor {
    runtime: Arc<Runtime>,
    lines: Option<Lines<BytesCursor>>,
    canceller: Arc<ClickHouseCanceller>,
}

impl RowCursor for ClickHouseCursor {
    fn next_row(&mut self) -> Result<Option<RawRow>, DatabaseError> {
        let Some(lines) = self.lines.as_mut() else {
            return Ok(None);
        };
        if self.canceller.cancelled.load(Ordering::SeqCst) {
            return Err(DatabaseError::Interrupted);
        }
        let canceller = Arc::clone(&self.canceller);
        let line = self.runtime.block_on(async {
            tokio::select! {
                line = lines.next_line() => line.map_err(|e| DatabaseError::Fetch(e.to_string())),
                _ = canceller.notify.notified() => Err(DatabaseError::Interrupted),
            }
        });
        match line? {
            Some(line) => parse_row(&line).map(Some),
            None => {
                self.lines = None;
                Ok(None)
            }
        }
    }

    fn canceller(&self) -> Arc<dyn StatementCanceller> {
        self.canceller.clone()
    }

    fn close(&mut self) -> Result<(), DatabaseError> {
        // Dropping the response body aborts the HTTP request
        self.lines = None;
        Ok(())
    }
}

fn parse_row(line: &str) -> Result<RawRow, DatabaseError> {
    let values: Vec<Value> =
        serde_json::from_str(line).map_err(|e| DatabaseError::Fetch(format!("{}: {}", e, line)))?;
    Ok(values.into_iter().map(json_to_value).collect())
}

fn json_to_value(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}
