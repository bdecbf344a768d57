use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use lazy_static::lazy_static;
use regex::Regex;

use crate::execution::{
    DatabaseConnection, DatabaseError, RawRow, RowCursor, StatementCanceller, VendorHooks,
};
use crate::sql_generator::Vendor;

/// A blocked fetch gives up after this long so a broken test cannot hang.
const BLOCKING_LIMIT: Duration = Duration::from_secs(10);

lazy_static! {
    static ref SELECT_LIST: Regex =
        Regex::new(r"^SELECT (?:DISTINCT )?(?:TOP \d+ )?(.*?) FROM ").expect("valid regex");
    static ref TRAILING_LIMIT: Regex = Regex::new(r" LIMIT (\d+)$").expect("valid regex");
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A row of non-null values.
pub fn row(values: &[&str]) -> RawRow {
    values.iter().map(|v| Some(v.to_string())).collect()
}

struct FetchFailure {
    sql_fragment: String,
    after_rows: usize,
    error: DatabaseError,
}

/// In-memory stand-in for a database connection.
///
/// Statements are answered by the first canned result whose SQL fragment
/// they contain; unmatched statements return no rows. Canned rows follow
/// the SELECT list. Rows with a NULL in a column the statement requires
/// `IS NOT NULL` are skipped, and a trailing `LIMIT n` is honoured. Every
/// executed statement and every vendor hook call is recorded.
pub struct FakeConnection {
    vendor: Vendor,
    results: Vec<(String, Vec<RawRow>)>,
    execute_failures: Vec<(String, DatabaseError)>,
    fetch_failures: Vec<FetchFailure>,
    blocking: Vec<String>,
    executed: Mutex<Vec<String>>,
    hooks: Arc<RecordingHooks>,
    closed_cursors: Arc<AtomicUsize>,
}

impl FakeConnection {
    pub fn new(vendor: Vendor) -> Self {
        FakeConnection {
            vendor,
            results: Vec::new(),
            execute_failures: Vec::new(),
            fetch_failures: Vec::new(),
            blocking: Vec::new(),
            executed: Mutex::new(Vec::new()),
            hooks: Arc::new(RecordingHooks::default()),
            closed_cursors: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_rows(mut self, sql_fragment: &str, rows: Vec<RawRow>) -> Self {
        self.results.push((sql_fragment.to_string(), rows));
        self
    }

    pub fn with_execute_failure(mut self, sql_fragment: &str, error: DatabaseError) -> Self {
        self.execute_failures.push((sql_fragment.to_string(), error));
        self
    }

    /// Fetching fails once `after_rows` rows have been returned.
    pub fn with_fetch_failure(mut self, sql_fragment: &str, after_rows: usize, error: DatabaseError) -> Self {
        self.fetch_failures.push(FetchFailure {
            sql_fragment: sql_fragment.to_string(),
            after_rows,
            error,
        });
        self
    }

    /// Once its rows run out, the cursor waits for cancellation instead of
    /// ending.
    pub fn with_blocking(mut self, sql_fragment: &str) -> Self {
        self.blocking.push(sql_fragment.to_string());
        self
    }

    pub fn executed(&self) -> Vec<String> {
        lock(&self.executed).clone()
    }

    pub fn execution_count(&self) -> usize {
        lock(&self.executed).len()
    }

    pub fn hook_calls(&self) -> Vec<String> {
        lock(&self.hooks.calls).clone()
    }

    pub fn closed_cursors(&self) -> usize {
        self.closed_cursors.load(Ordering::SeqCst)
    }
}

impl DatabaseConnection for FakeConnection {
    fn vendor(&self) -> Vendor {
        self.vendor
    }

    fn hooks(&self) -> Arc<dyn VendorHooks> {
        self.hooks.clone()
    }

    fn execute(&self, sql: &str) -> Result<Box<dyn RowCursor>, DatabaseError> {
        lock(&self.executed).push(sql.to_string());
        if let Some((_, error)) = self.execute_failures.iter().find(|(f, _)| sql.contains(f.as_str())) {
            return Err(error.clone());
        }
        let rows = self
            .results
            .iter()
            .find(|(f, _)| sql.contains(f.as_str()))
            .map(|(_, rows)| answer(sql, rows))
            .unwrap_or_default();
        let failure = self
            .fetch_failures
            .iter()
            .find(|f| sql.contains(f.sql_fragment.as_str()))
            .map(|f| (f.after_rows, f.error.clone()));
        Ok(Box::new(FakeCursor {
            rows,
            failure,
            fetched: 0,
            blocking: self.blocking.iter().any(|f| sql.contains(f.as_str())),
            canceller: Arc::new(FakeCanceller::default()),
            closed_cursors: Arc::clone(&self.closed_cursors),
            closed: false,
        }))
    }
}

/// Applies the `IS NOT NULL` guards and the limit of `sql` to canned rows.
fn answer(sql: &str, rows: &[RawRow]) -> VecDeque<RawRow> {
    let guarded: Vec<usize> = SELECT_LIST
        .captures(sql)
        .map(|c| {
            c[1].split(", ")
                .enumerate()
                .filter(|(_, column)| sql.contains(&format!("{} IS NOT NULL", column)))
                .map(|(index, _)| index)
                .collect()
        })
        .unwrap_or_default();
    let limit = TRAILING_LIMIT
        .captures(sql)
        .and_then(|c| c[1].parse::<usize>().ok())
        .unwrap_or(usize::MAX);
    rows.iter()
        .filter(|row| guarded.iter().all(|&i| row.get(i).is_some_and(Option::is_some)))
        .take(limit)
        .cloned()
        .collect()
}

#[derive(Default)]
struct RecordingHooks {
    calls: Mutex<Vec<String>>,
}

impl RecordingHooks {
    fn record(&self, call: &str) {
        lock(&self.calls).push(call.to_string());
    }
}

impl VendorHooks for RecordingHooks {
    fn before_execute(&self, _sql: &str) {
        self.record("before_execute");
    }
    fn after_execute(&self, _sql: &str) {
        self.record("after_execute");
    }
    fn before_cancel(&self, _sql: &str) {
        self.record("before_cancel");
    }
    fn after_cancel(&self, _sql: &str) {
        self.record("after_cancel");
    }
    fn before_close(&self, _sql: &str) {
        self.record("before_close");
    }
    fn after_close(&self, _sql: &str) {
        self.record("after_close");
    }
}

#[derive(Default)]
struct FakeCanceller {
    cancelled: Mutex<bool>,
    signal: Condvar,
}

impl FakeCanceller {
    fn is_cancelled(&self) -> bool {
        *lock(&self.cancelled)
    }

    /// Blocks until cancelled or the limit passes; true when cancelled.
    fn wait(&self) -> bool {
        let deadline = Instant::now() + BLOCKING_LIMIT;
        let mut cancelled = lock(&self.cancelled);
        while !*cancelled {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            cancelled = self
                .signal
                .wait_timeout(cancelled, deadline - now)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|poisoned| poisoned.into_inner().0);
        }
        true
    }
}

impl StatementCanceller for FakeCanceller {
    fn cancel(&self) -> Result<(), DatabaseError> {
        *lock(&self.cancelled) = true;
        self.signal.notify_all();
        Ok(())
    }
}

struct FakeCursor {
    rows: VecDeque<RawRow>,
    failure: Option<(usize, DatabaseError)>,
    fetched: usize,
    blocking: bool,
    canceller: Arc<FakeCanceller>,
    closed_cursors: Arc<AtomicUsize>,
    closed: bool,
}

impl RowCursor for FakeCursor {
    fn next_row(&mut self) -> Result<Option<RawRow>, DatabaseError> {
        if self.closed {
            return Err(DatabaseError::Fetch("cursor is closed".to_string()));
        }
        if self.canceller.is_cancelled() {
            return Err(DatabaseError::Interrupted);
        }
        if let Some((after_rows, error)) = &self.failure {
            if self.fetched >= *after_rows {
                return Err(error.clone());
            }
        }
        if let Some(row) = self.rows.pop_front() {
            self.fetched += 1;
            return Ok(Some(row));
        }
        if self.blocking {
            return if self.canceller.wait() {
                Err(DatabaseError::Interrupted)
            } else {
                Err(DatabaseError::Fetch("blocked fetch timed out".to_string()))
            };
        }
        Ok(None)
    }

    fn canceller(&self) -> Arc<dyn StatementCanceller> {
        self.canceller.clone()
    }

    fn close(&mut self) -> Result<(), DatabaseError> {
        if !self.closed {
            self.closed = true;
            self.closed_cursors.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
