use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{Executor, Row};
use std::path::Path;

use crate::queries::{ddl, metadata};

pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Open a file-based database connection pool for production use
/// Creates the file if missing, enables WAL mode and foreign keys
pub async fn open_database_connection(db_path: &Path) -> Result<SqlitePool, DynError> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                format!(
                    "Failed to create database directory '{}': {}",
                    parent.display(),
                    e
                )
            })?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Create a database in a temporary directory for testing
/// Returns the pool and the directory guard - keep the guard alive for the duration of the test
pub async fn create_test_connection_in_temporary_file(
) -> Result<(SqlitePool, tempfile::TempDir), DynError> {
    let dir = tempfile::tempdir()?;
    let pool = open_database_connection(&dir.path().join("test.sqlite")).await?;
    Ok((pool, dir))
}

/// Initialize database schema
/// Creates tables and indexes if they don't exist
pub async fn init_database_schema(pool: &SqlitePool) -> Result<(), DynError> {
    sqlx::query(&ddl::create_metadata_table())
        .execute(pool)
        .await?;
    sqlx::query(&ddl::create_users_table()).execute(pool).await?;
    sqlx::query(&ddl::create_audio_table()).execute(pool).await?;
    sqlx::query(&ddl::create_audio_owner_index())
        .execute(pool)
        .await?;
    Ok(())
}

/// Query a single metadata value by key
pub async fn query_metadata<'e, E>(executor: E, key: &str) -> Result<Option<String>, DynError>
where
    E: Executor<'e, Database = sqlx::Sqlite>,
{
    let sql = metadata::select_by_key(key);
    let result = sqlx::query(&sql).fetch_optional(executor).await?;
    Ok(result.map(|row| row.get::<String, _>(0)))
}

/// Insert a new metadata key-value pair
pub async fn insert_metadata<'e, E>(executor: E, key: &str, value: &str) -> Result<(), DynError>
where
    E: Executor<'e, Database = sqlx::Sqlite>,
{
    let sql = metadata::insert(key, value);
    sqlx::query(&sql).execute(executor).await?;
    Ok(())
}
