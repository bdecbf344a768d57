/// Receives the SQL text the engine runs and the queries it cancels.
pub trait DiagnosticSink: Send + Sync {
    fn sql_executed(&self, sql: &str);
    fn query_cancelled(&self, sql: &str);
}

/// Forwards diagnostics to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn sql_executed(&self, sql: &str) {
        log::debug!("Executing SQL:\n{}", sql);
    }

    fn query_cancelled(&self, sql: &str) {
        log::info!("Cancelled query:\n{}", sql);
    }
}
