use sea_query::{
    ColumnDef, ForeignKey, ForeignKeyAction, Index, PostgresQueryBuilder, SqliteQueryBuilder,
    Table, TableCreateStatement,
};

use crate::schema::{Audio, Metadata, Users};

fn metadata_table() -> TableCreateStatement {
    Table::create()
        .table(Metadata::Table)
        .if_not_exists()
        .col(ColumnDef::new(Metadata::Key).string().primary_key())
        .col(ColumnDef::new(Metadata::Value).string().not_null())
        .to_owned()
}

fn users_table() -> TableCreateStatement {
    Table::create()
        .table(Users::Table)
        .if_not_exists()
        .col(ColumnDef::new(Users::UserId).string().primary_key())
        .col(ColumnDef::new(Users::Token).string().not_null().unique_key())
        .col(ColumnDef::new(Users::Username).string().not_null())
        .col(ColumnDef::new(Users::CreatedAtMs).big_integer().not_null())
        .to_owned()
}

/// Payload column type differs per backend: BLOB for SQLite, BYTEA for PostgreSQL.
fn audio_table(mut payload: ColumnDef) -> TableCreateStatement {
    Table::create()
        .table(Audio::Table)
        .if_not_exists()
        .col(ColumnDef::new(Audio::AudioId).string().primary_key())
        .col(ColumnDef::new(Audio::OwnerId).string().not_null())
        .col(ColumnDef::new(Audio::DisplayName).string().not_null())
        .col(ColumnDef::new(Audio::RetrievalUrl).string().not_null())
        .col(&mut payload)
        .col(ColumnDef::new(Audio::CreatedAtMs).big_integer().not_null())
        .foreign_key(
            ForeignKey::create()
                .from(Audio::Table, Audio::OwnerId)
                .to(Users::Table, Users::UserId)
                .on_delete(ForeignKeyAction::Restrict),
        )
        .to_owned()
}

fn audio_owner_index() -> sea_query::IndexCreateStatement {
    Index::create()
        .if_not_exists()
        .name("idx_audio_owner_id")
        .table(Audio::Table)
        .col(Audio::OwnerId)
        .to_owned()
}

/// CREATE TABLE IF NOT EXISTS metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL)
pub fn create_metadata_table() -> String {
    metadata_table().to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS users (
///     user_id TEXT PRIMARY KEY,
///     token TEXT NOT NULL UNIQUE,
///     username TEXT NOT NULL,
///     created_at_ms INTEGER NOT NULL
/// )
pub fn create_users_table() -> String {
    users_table().to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS audio (
///     audio_id TEXT PRIMARY KEY,
///     owner_id TEXT NOT NULL REFERENCES users(user_id) ON DELETE RESTRICT,
///     display_name TEXT NOT NULL,
///     retrieval_url TEXT NOT NULL,
///     payload BLOB NOT NULL,
///     created_at_ms INTEGER NOT NULL
/// )
pub fn create_audio_table() -> String {
    audio_table(ColumnDef::new(Audio::Payload).blob().not_null().to_owned())
        .to_string(SqliteQueryBuilder)
}

/// CREATE INDEX IF NOT EXISTS idx_audio_owner_id ON audio(owner_id)
pub fn create_audio_owner_index() -> String {
    audio_owner_index().to_string(SqliteQueryBuilder)
}

// ============================================================================
// PostgreSQL variants
// ============================================================================

/// CREATE TABLE IF NOT EXISTS metadata - PostgreSQL
pub fn create_metadata_table_pg() -> String {
    metadata_table().to_string(PostgresQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS users - PostgreSQL
pub fn create_users_table_pg() -> String {
    users_table().to_string(PostgresQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS audio - PostgreSQL
/// Note: payload is BYTEA
pub fn create_audio_table_pg() -> String {
    audio_table(ColumnDef::new(Audio::Payload).binary().not_null().to_owned())
        .to_string(PostgresQueryBuilder)
}

/// CREATE INDEX IF NOT EXISTS idx_audio_owner_id - PostgreSQL
pub fn create_audio_owner_index_pg() -> String {
    audio_owner_index().to_string(PostgresQueryBuilder)
}
