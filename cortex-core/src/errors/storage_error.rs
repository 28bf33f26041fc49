/// Storage-layer errors for SQLite operations. The core never catches
/// these — they propagate to the adapter, which maps them to a 500.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("sqlite error: {message}")]
    Sqlite { message: String },

    #[error("migration failed at version {version}: {reason}")]
    MigrationFailed { version: u32, reason: String },

    #[error("database corruption detected: {details}")]
    CorruptionDetected { details: String },

    #[error("connection pool exhausted: {active_connections} active connections")]
    ConnectionPoolExhausted { active_connections: usize },
}
