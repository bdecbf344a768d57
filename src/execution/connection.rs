use std::sync::Arc;

use super::errors::DatabaseError;
use crate::sql_generator::Vendor;

/// One result row: a nullable string per selected column, in select order.
pub type RawRow = Vec<Option<String>>;

/// A live connection to one database.
///
/// The engine never opens or pools physical connections; callers hand in
/// an implementation of this trait per mapped database.
pub trait DatabaseConnection: Send + Sync {
    fn vendor(&self) -> Vendor;

    /// Connection-specific actions around execute, cancel and close.
    fn hooks(&self) -> Arc<dyn VendorHooks> {
        Arc::new(self.vendor())
    }

    fn execute(&self, sql: &str) -> Result<Box<dyn RowCursor>, DatabaseError>;

    fn close(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

/// Forward-only cursor over the rows of one statement.
pub trait RowCursor: Send {
    fn next_row(&mut self) -> Result<Option<RawRow>, DatabaseError>;

    /// Interrupts the statement from another thread.
    fn canceller(&self) -> Arc<dyn StatementCanceller>;

    fn close(&mut self) -> Result<(), DatabaseError>;
}

pub trait StatementCanceller: Send + Sync {
    fn cancel(&self) -> Result<(), DatabaseError>;
}

/// Called at every execute, cancel and close boundary. All hooks default to
/// doing nothing.
pub trait VendorHooks: Send + Sync {
    fn before_execute(&self, _sql: &str) {}
    fn after_execute(&self, _sql: &str) {}
    fn before_cancel(&self, _sql: &str) {}
    fn after_cancel(&self, _sql: &str) {}
    fn before_close(&self, _sql: &str) {}
    fn after_close(&self, _sql: &str) {}
}

impl VendorHooks for Vendor {
    fn before_execute(&self, sql: &str) {
        log::trace!("[{}] execute: {}", self.name(), sql);
    }

    fn after_cancel(&self, sql: &str) {
        log::trace!("[{}] cancelled: {}", self.name(), sql);
    }
}
