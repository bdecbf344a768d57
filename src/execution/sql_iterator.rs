//! Lazy, cancellable iteration over the rows of one SELECT statement.
//!
//! The statement is sent to the database on the first call to
//! [`SqlIterator::has_next`] (or `next_row`), and exactly one row is fetched
//! ahead of consumption. [`CancelHandle`] may be cloned and used from any
//! thread: before the statement starts it does nothing, afterwards it
//! interrupts the statement and the iterator's next access fails with
//! [`ExecutionError::Cancelled`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::connection::{DatabaseConnection, RowCursor, StatementCanceller, VendorHooks};
use super::diagnostics::{DiagnosticSink, LogSink};
use super::errors::ExecutionError;
use super::result_row::ResultRow;
use crate::relational::ProjectionSpec;
use crate::sql_generator::SelectStatement;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IteratorState {
    NotStarted,
    Executing,
    Exhausted,
    Cancelled,
    Closed,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct ActiveStatement {
    sql: String,
    canceller: Arc<dyn StatementCanceller>,
    hooks: Arc<dyn VendorHooks>,
    sink: Arc<dyn DiagnosticSink>,
}

#[derive(Default)]
struct CancelState {
    requested: AtomicBool,
    active: Mutex<Option<ActiveStatement>>,
}

/// Cancels the statement of one or more iterators from any thread.
#[derive(Clone, Default)]
pub struct CancelHandle {
    inner: Arc<CancelState>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interrupts the running statement. Has no effect when no statement is
    /// running.
    pub fn cancel(&self) {
        let active = lock(&self.inner.active);
        let Some(statement) = active.as_ref() else {
            log::trace!("Cancel requested while no statement is running; ignored");
            return;
        };
        if self.inner.requested.swap(true, Ordering::SeqCst) {
            return;
        }
        statement.hooks.before_cancel(&statement.sql);
        if let Err(e) = statement.canceller.cancel() {
            log::warn!("Interrupting statement failed: {}", e);
        }
        statement.hooks.after_cancel(&statement.sql);
        statement.sink.query_cancelled(&statement.sql);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.requested.load(Ordering::SeqCst)
    }

    fn activate(&self, statement: ActiveStatement) {
        *lock(&self.inner.active) = Some(statement);
    }

    fn deactivate(&self) {
        *lock(&self.inner.active) = None;
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

pub struct SqlIterator {
    statement: SelectStatement,
    columns: Arc<BTreeMap<ProjectionSpec, usize>>,
    connection: Arc<dyn DatabaseConnection>,
    hooks: Arc<dyn VendorHooks>,
    sink: Arc<dyn DiagnosticSink>,
    cancel: CancelHandle,
    state: IteratorState,
    cursor: Option<Box<dyn RowCursor>>,
    prefetched: Option<ResultRow>,
    error_reported: bool,
}

impl SqlIterator {
    pub fn new(statement: SelectStatement, connection: Arc<dyn DatabaseConnection>) -> Self {
        SqlIterator {
            columns: Arc::new(statement.column_index()),
            statement,
            hooks: connection.hooks(),
            connection,
            sink: Arc::new(LogSink),
            cancel: CancelHandle::new(),
            state: IteratorState::NotStarted,
            cursor: None,
            prefetched: None,
            error_reported: false,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Shares cancellation with other iterators of the same query.
    pub fn with_cancel_handle(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn sql(&self) -> &str {
        &self.statement.sql
    }

    pub fn state(&self) -> IteratorState {
        self.state
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether another row is available, running the statement on first use.
    pub fn has_next(&mut self) -> Result<bool, ExecutionError> {
        match self.state {
            IteratorState::NotStarted => {
                if self.cancel.is_cancelled() {
                    self.state = IteratorState::Cancelled;
                    return Err(self.cancelled_error());
                }
                self.execute()?;
            }
            IteratorState::Executing => self.check_cancelled()?,
            IteratorState::Cancelled => return Err(self.cancelled_error()),
            IteratorState::Exhausted | IteratorState::Closed => return Ok(false),
        }
        if self.prefetched.is_none() {
            self.prefetch()?;
        }
        Ok(self.prefetched.is_some())
    }

    pub fn next_row(&mut self) -> Result<Option<ResultRow>, ExecutionError> {
        if !self.has_next()? {
            return Ok(None);
        }
        Ok(self.prefetched.take())
    }

    /// Releases the cursor. Safe to call any number of times.
    pub fn close(&mut self) -> Result<(), ExecutionError> {
        if self.state == IteratorState::Closed {
            return Ok(());
        }
        self.prefetched = None;
        self.state = IteratorState::Closed;
        self.release()
    }

    fn execute(&mut self) -> Result<(), ExecutionError> {
        let sql = self.statement.sql.clone();
        self.hooks.before_execute(&sql);
        self.sink.sql_executed(&sql);
        let cursor = match self.connection.execute(&sql) {
            Ok(cursor) => cursor,
            Err(source) => {
                self.state = IteratorState::Closed;
                return Err(ExecutionError::Database { sql, source });
            }
        };
        self.hooks.after_execute(&sql);
        self.cancel.activate(ActiveStatement {
            canceller: cursor.canceller(),
            hooks: Arc::clone(&self.hooks),
            sink: Arc::clone(&self.sink),
            sql,
        });
        self.cursor = Some(cursor);
        self.state = IteratorState::Executing;
        Ok(())
    }

    fn prefetch(&mut self) -> Result<(), ExecutionError> {
        let Some(cursor) = self.cursor.as_mut() else {
            self.state = IteratorState::Exhausted;
            return Ok(());
        };
        let fetched = cursor.next_row();
        // Whatever the cursor returned, a cancelled statement yields no rows
        self.check_cancelled()?;

        match fetched {
            Ok(Some(values)) => {
                let expected = self.statement.columns.len();
                if values.len() != expected {
                    let err = ExecutionError::ColumnCount {
                        sql: self.statement.sql.clone(),
                        expected,
                        actual: values.len(),
                    };
                    self.abort(IteratorState::Closed);
                    return Err(err);
                }
                self.prefetched = Some(ResultRow::new(Arc::clone(&self.columns), values));
                Ok(())
            }
            Ok(None) => {
                self.state = IteratorState::Exhausted;
                self.release()
            }
            Err(source) => {
                self.abort(IteratorState::Closed);
                Err(ExecutionError::Database {
                    sql: self.statement.sql.clone(),
                    source,
                })
            }
        }
    }

    fn check_cancelled(&mut self) -> Result<(), ExecutionError> {
        if self.cancel.is_cancelled() {
            self.abort(IteratorState::Cancelled);
            return Err(self.cancelled_error());
        }
        Ok(())
    }

    fn cancelled_error(&self) -> ExecutionError {
        ExecutionError::Cancelled {
            sql: self.statement.sql.clone(),
        }
    }

    /// Drops any pending row and releases the cursor.
    fn abort(&mut self, state: IteratorState) {
        self.prefetched = None;
        self.state = state;
        if let Err(e) = self.release() {
            log::warn!("{}", e);
        }
    }

    fn release(&mut self) -> Result<(), ExecutionError> {
        self.cancel.deactivate();
        let Some(mut cursor) = self.cursor.take() else {
            return Ok(());
        };
        let sql = &self.statement.sql;
        self.hooks.before_close(sql);
        let result = cursor.close();
        self.hooks.after_close(sql);
        result.map_err(|source| ExecutionError::Database {
            sql: sql.clone(),
            source,
        })
    }
}

impl Iterator for SqlIterator {
    type Item = Result<ResultRow, ExecutionError>;

    /// Yields rows until the result is exhausted. An error is yielded once,
    /// after which iteration ends.
    fn next(&mut self) -> Option<Self::Item> {
        if self.error_reported {
            return None;
        }
        match self.next_row() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => None,
            Err(e) => {
                self.error_reported = true;
                Some(Err(e))
            }
        }
    }
}

impl Drop for SqlIterator {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("Closing result cursor failed: {}", e);
        }
    }
}

impl fmt::Debug for SqlIterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlIterator")
            .field("sql", &self.statement.sql)
            .field("state", &self.state)
            .finish()
    }
}
