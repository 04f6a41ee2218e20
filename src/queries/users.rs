use sea_query::{Expr, PostgresQueryBuilder, Query, SqliteQueryBuilder};

use crate::schema::Users;

/// INSERT INTO users (user_id, token, username, created_at_ms) VALUES (?, ?, ?, ?)
pub fn insert(user_id: &str, token: &str, username: &str, created_at_ms: i64) -> String {
    Query::insert()
        .into_table(Users::Table)
        .columns([
            Users::UserId,
            Users::Token,
            Users::Username,
            Users::CreatedAtMs,
        ])
        .values_panic([
            user_id.into(),
            token.into(),
            username.into(),
            created_at_ms.into(),
        ])
        .to_string(SqliteQueryBuilder)
}

/// SELECT user_id, token, username, created_at_ms FROM users WHERE user_id = ? AND token = ?
pub fn select_by_credentials(user_id: &str, token: &str) -> String {
    Query::select()
        .columns([
            Users::UserId,
            Users::Token,
            Users::Username,
            Users::CreatedAtMs,
        ])
        .from(Users::Table)
        .and_where(Expr::col(Users::UserId).eq(user_id))
        .and_where(Expr::col(Users::Token).eq(token))
        .to_string(SqliteQueryBuilder)
}

// ============================================================================
// PostgreSQL variants
// ============================================================================

/// INSERT INTO users (...) VALUES (...) - PostgreSQL
pub fn insert_pg(user_id: &str, token: &str, username: &str, created_at_ms: i64) -> String {
    Query::insert()
        .into_table(Users::Table)
        .columns([
            Users::UserId,
            Users::Token,
            Users::Username,
            Users::CreatedAtMs,
        ])
        .values_panic([
            user_id.into(),
            token.into(),
            username.into(),
            created_at_ms.into(),
        ])
        .to_string(PostgresQueryBuilder)
}

/// SELECT ... FROM users WHERE user_id = ? AND token = ? - PostgreSQL
pub fn select_by_credentials_pg(user_id: &str, token: &str) -> String {
    Query::select()
        .columns([
            Users::UserId,
            Users::Token,
            Users::Username,
            Users::CreatedAtMs,
        ])
        .from(Users::Table)
        .and_where(Expr::col(Users::UserId).eq(user_id))
        .and_where(Expr::col(Users::Token).eq(token))
        .to_string(PostgresQueryBuilder)
}
