use std::collections::HashMap;
use std::sync::Arc;

use super::connection::DatabaseConnection;
use super::errors::ExecutionError;

/// Connections by mapped database name.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<String, Arc<dyn DatabaseConnection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, database: impl Into<String>, connection: Arc<dyn DatabaseConnection>) {
        let database = database.into();
        log::debug!("Registered connection for database '{}' ({})", database, connection.vendor().name());
        self.connections.insert(database, connection);
    }

    pub fn with_connection(mut self, database: impl Into<String>, connection: Arc<dyn DatabaseConnection>) -> Self {
        self.register(database, connection);
        self
    }

    pub fn get(&self, database: &str) -> Result<Arc<dyn DatabaseConnection>, ExecutionError> {
        self.connections
            .get(database)
            .cloned()
            .ok_or_else(|| ExecutionError::UnknownDatabase(database.to_string()))
    }

    pub fn databases(&self) -> impl Iterator<Item = &str> {
        self.connections.keys().map(String::as_str)
    }

    /// Closes every connection, logging failures.
    pub fn close_all(&self) {
        for (database, connection) in &self.connections {
            if let Err(e) = connection.close() {
                log::warn!("Closing connection for database '{}' failed: {}", database, e);
            }
        }
    }
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut databases: Vec<&str> = self.databases().collect();
        databases.sort_unstable();
        f.debug_struct("ConnectionRegistry")
            .field("databases", &databases)
            .finish()
    }
}
