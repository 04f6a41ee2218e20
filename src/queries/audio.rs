use sea_query::{Expr, PostgresQueryBuilder, Query, SqliteQueryBuilder};

use crate::schema::Audio;

/// Column values for a single row of the audio table
pub struct AudioRow<'a> {
    pub audio_id: &'a str,
    pub owner_id: &'a str,
    pub display_name: &'a str,
    pub retrieval_url: &'a str,
    pub payload: &'a [u8],
    pub created_at_ms: i64,
}

fn insert_statement(row: &AudioRow<'_>) -> sea_query::InsertStatement {
    Query::insert()
        .into_table(Audio::Table)
        .columns([
            Audio::AudioId,
            Audio::OwnerId,
            Audio::DisplayName,
            Audio::RetrievalUrl,
            Audio::Payload,
            Audio::CreatedAtMs,
        ])
        .values_panic([
            row.audio_id.into(),
            row.owner_id.into(),
            row.display_name.into(),
            row.retrieval_url.into(),
            row.payload.to_vec().into(),
            row.created_at_ms.into(),
        ])
        .to_owned()
}

fn select_statement(audio_id: &str, owner_id: &str) -> sea_query::SelectStatement {
    Query::select()
        .columns([
            Audio::AudioId,
            Audio::OwnerId,
            Audio::DisplayName,
            Audio::RetrievalUrl,
            Audio::Payload,
            Audio::CreatedAtMs,
        ])
        .from(Audio::Table)
        .and_where(Expr::col(Audio::AudioId).eq(audio_id))
        .and_where(Expr::col(Audio::OwnerId).eq(owner_id))
        .to_owned()
}

/// INSERT INTO audio (audio_id, owner_id, display_name, retrieval_url, payload, created_at_ms)
/// VALUES (?, ?, ?, ?, ?, ?)
pub fn insert(row: &AudioRow<'_>) -> String {
    insert_statement(row).to_string(SqliteQueryBuilder)
}

/// SELECT audio_id, owner_id, display_name, retrieval_url, payload, created_at_ms
/// FROM audio WHERE audio_id = ? AND owner_id = ?
pub fn select_by_id_and_owner(audio_id: &str, owner_id: &str) -> String {
    select_statement(audio_id, owner_id).to_string(SqliteQueryBuilder)
}

// ============================================================================
// PostgreSQL variants
// ============================================================================

/// INSERT INTO audio (...) VALUES (...) - PostgreSQL
pub fn insert_pg(row: &AudioRow<'_>) -> String {
    insert_statement(row).to_string(PostgresQueryBuilder)
}

/// SELECT ... FROM audio WHERE audio_id = ? AND owner_id = ? - PostgreSQL
pub fn select_by_id_and_owner_pg(audio_id: &str, owner_id: &str) -> String {
    select_statement(audio_id, owner_id).to_string(PostgresQueryBuilder)
}
