use log::info;
use sqlx::postgres::PgPool;
use sqlx::sqlite::SqlitePool;

use crate::constants::EXPECTED_DB_VERSION;
use crate::db::{self, DynError};
use crate::db_postgres;

/// Handle to the relational store backing both the identity and audio stores.
///
/// Cloning is cheap: both variants wrap a reference-counted pool.
#[derive(Clone, Debug)]
pub enum Database {
    Sqlite(SqlitePool),
    Postgres(PgPool),
}

impl Database {
    /// Create tables and indexes if missing
    pub async fn init_schema(&self) -> Result<(), DynError> {
        match self {
            Database::Sqlite(pool) => db::init_database_schema(pool).await,
            Database::Postgres(pool) => db_postgres::init_database_schema_pg(pool).await,
        }
    }

    /// Stamp a fresh store with the schema version, or verify an existing stamp
    pub async fn ensure_version(&self) -> Result<(), DynError> {
        let existing = match self {
            Database::Sqlite(pool) => db::query_metadata(pool, "version").await?,
            Database::Postgres(pool) => db_postgres::query_metadata_pg(pool, "version").await?,
        };

        match existing {
            Some(version) if version == EXPECTED_DB_VERSION => Ok(()),
            Some(version) => Err(format!(
                "Unsupported database version: '{}'. This application only supports version '{}'",
                version, EXPECTED_DB_VERSION
            )
            .into()),
            None => {
                info!("Initializing new database with schema version {}", EXPECTED_DB_VERSION);
                match self {
                    Database::Sqlite(pool) => {
                        db::insert_metadata(pool, "version", EXPECTED_DB_VERSION).await
                    }
                    Database::Postgres(pool) => {
                        db_postgres::insert_metadata_pg(pool, "version", EXPECTED_DB_VERSION).await
                    }
                }
            }
        }
    }

    pub async fn close(&self) {
        match self {
            Database::Sqlite(pool) => pool.close().await,
            Database::Postgres(pool) => pool.close().await,
        }
    }
}
