use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use crate::error::CoreError;

pub use sqlx::SqlitePool as DbPool;

/// Opens (creating if needed) the SQLite database and runs migrations.
///
/// # Arguments
///
/// * `db_path` - A file path, `:memory:`, or a `sqlite:` URL.
///
/// Foreign keys are enabled on every connection so deleting an event cascades
/// to its rule, exceptions and reminders.
pub async fn establish_connection(db_path: &str) -> Result<SqlitePool, CoreError> {
    let in_memory = db_path == ":memory:" || db_path.contains(":memory:");

    let options = if in_memory || db_path.starts_with("sqlite:") {
        SqliteConnectOptions::from_str(db_path)?
    } else {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        SqliteConnectOptions::new().filename(db_path)
    }
    .create_if_missing(true)
    .foreign_keys(true);

    // Each in-memory connection would otherwise get its own database
    let max_connections = if in_memory { 1 } else { 5 };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    tracing::debug!(path = db_path, "database ready");
    Ok(pool)
}
