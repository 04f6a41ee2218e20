//! PostgreSQL side of the store: connection setup and schema
//!
//! Same surface as db.rs but over a PgPool.

use log::info;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::{Executor, Row};
use std::str::FromStr;
use url::Url;

use crate::db::DynError;
use crate::queries::{ddl, metadata};

/// SQLSTATE for `duplicate_database`
const DUPLICATE_DATABASE: &str = "42P04";

/// Maintenance database every server has, used to create the service database
const ADMIN_DATABASE: &str = "postgres";

/// Turn the configured base URL (`postgres://user@host[:port]`) into a full
/// connection URL carrying the password and the database name
pub fn build_postgres_url(base_url: &str, password: &str, database: &str) -> Result<String, DynError> {
    let mut url = Url::parse(base_url)?;
    if url.host_str().is_none() {
        return Err(format!("Missing host in postgres url '{}'", base_url).into());
    }

    let port = url.port().unwrap_or(5432);
    url.set_port(Some(port))
        .map_err(|_| format!("Cannot set port on postgres url '{}'", base_url))?;
    url.set_password(Some(password))
        .map_err(|_| format!("Cannot set password on postgres url '{}'", base_url))?;
    url.set_path(database);
    url.set_query(None);

    Ok(url.to_string())
}

/// Open a pool on `database`
pub async fn open_postgres_connection(
    base_url: &str,
    password: &str,
    database: &str,
) -> Result<PgPool, DynError> {
    connect(base_url, password, database, 5).await
}

async fn connect(
    base_url: &str,
    password: &str,
    database: &str,
    max_connections: u32,
) -> Result<PgPool, DynError> {
    let options = PgConnectOptions::from_str(&build_postgres_url(base_url, password, database)?)?;
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Create `database` through the maintenance database unless it already exists
pub async fn create_database_if_not_exists(
    base_url: &str,
    password: &str,
    database: &str,
) -> Result<(), DynError> {
    let admin = connect(base_url, password, ADMIN_DATABASE, 1).await?;

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(database)
            .fetch_one(&admin)
            .await?;

    let result = if exists {
        Ok(())
    } else {
        // CREATE DATABASE takes no bind parameters
        let create_sql = format!("CREATE DATABASE \"{}\"", database.replace('"', "\"\""));
        match sqlx::query(&create_sql).execute(&admin).await {
            Ok(_) => {
                info!("Created PostgreSQL database '{}'", database);
                Ok(())
            }
            // Another instance created it between the check and here
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some(DUPLICATE_DATABASE) => {
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    };

    admin.close().await;
    result
}

/// Open a pool on `database`, creating the database first when missing
pub async fn open_postgres_connection_create_if_needed(
    base_url: &str,
    password: &str,
    database: &str,
) -> Result<PgPool, DynError> {
    create_database_if_not_exists(base_url, password, database).await?;
    open_postgres_connection(base_url, password, database).await
}

/// Initialize database schema for PostgreSQL
/// Creates tables and indexes using PostgreSQL-specific DDL
pub async fn init_database_schema_pg(pool: &PgPool) -> Result<(), DynError> {
    sqlx::query(&ddl::create_metadata_table_pg())
        .execute(pool)
        .await?;
    sqlx::query(&ddl::create_users_table_pg())
        .execute(pool)
        .await?;
    sqlx::query(&ddl::create_audio_table_pg())
        .execute(pool)
        .await?;
    sqlx::query(&ddl::create_audio_owner_index_pg())
        .execute(pool)
        .await?;

    Ok(())
}

/// Query a single metadata value by key (PostgreSQL version)
pub async fn query_metadata_pg<'e, E>(executor: E, key: &str) -> Result<Option<String>, DynError>
where
    E: Executor<'e, Database = sqlx::Postgres>,
{
    let sql = metadata::select_by_key_pg(key);
    let result = sqlx::query(&sql).fetch_optional(executor).await?;

    Ok(result.map(|row| row.get::<String, _>(0)))
}

/// Insert a new metadata key-value pair (PostgreSQL version)
pub async fn insert_metadata_pg<'e, E>(executor: E, key: &str, value: &str) -> Result<(), DynError>
where
    E: Executor<'e, Database = sqlx::Postgres>,
{
    let sql = metadata::insert_pg(key, value);
    sqlx::query(&sql).execute(executor).await?;
    Ok(())
}
