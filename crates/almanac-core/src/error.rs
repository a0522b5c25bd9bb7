use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Database error")]
    Database(#[from] sqlx::Error),

    #[error("Migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid recurrence rule: {0}")]
    InvalidRule(String),

    #[error("Query window too large: expansion produced more than {limit} occurrences ({produced} so far). Narrow the window.")]
    WindowTooLarge { produced: usize, limit: usize },

    #[error("Malformed occurrence identifier: {0}")]
    MalformedOccurrenceId(String),
}

impl CoreError {
    /// Whether the error was caused by the caller's input rather than a fault on our side.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            CoreError::Database(_) | CoreError::Migration(_) | CoreError::Io(_)
        )
    }
}
