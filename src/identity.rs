use log::info;
use sqlx::Row;

use crate::constants::generate_opaque_id;
use crate::error::{ServiceError, ServiceResult};
use crate::queries::users;
use crate::store::Database;

/// A registered uploader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: String,
    pub token: String,
    pub username: String,
    pub created_at_ms: i64,
}

/// Credentials handed back by a successful registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub user_id: String,
    pub token: String,
}

#[derive(Clone, Debug)]
pub struct IdentityStore {
    db: Database,
}

impl IdentityStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a user with a fresh id and token.
    /// On error the user must be assumed not to exist.
    pub async fn register(&self, username: &str) -> ServiceResult<Registration> {
        if username.trim().is_empty() {
            return Err(ServiceError::validation("username must not be empty"));
        }

        let user_id = generate_opaque_id();
        let token = generate_opaque_id();
        let created_at_ms = chrono::Utc::now().timestamp_millis();

        match &self.db {
            Database::Sqlite(pool) => {
                let sql = users::insert(&user_id, &token, username, created_at_ms);
                let mut tx = pool.begin().await?;
                sqlx::query(&sql).execute(&mut *tx).await?;
                tx.commit().await?;
            }
            Database::Postgres(pool) => {
                let sql = users::insert_pg(&user_id, &token, username, created_at_ms);
                let mut tx = pool.begin().await?;
                sqlx::query(&sql).execute(&mut *tx).await?;
                tx.commit().await?;
            }
        }

        info!("Registered user '{}' as {}", username, user_id);

        Ok(Registration { user_id, token })
    }

    /// Look a user up by id and token together.
    /// `Ok(None)` when the pair matches nobody; errors only for storage failures.
    pub async fn verify(&self, user_id: &str, token: &str) -> ServiceResult<Option<User>> {
        let row = match &self.db {
            Database::Sqlite(pool) => {
                let sql = users::select_by_credentials(user_id, token);
                sqlx::query(&sql).fetch_optional(pool).await?.map(|row| User {
                    user_id: row.get(0),
                    token: row.get(1),
                    username: row.get(2),
                    created_at_ms: row.get(3),
                })
            }
            Database::Postgres(pool) => {
                let sql = users::select_by_credentials_pg(user_id, token);
                sqlx::query(&sql).fetch_optional(pool).await?.map(|row| User {
                    user_id: row.get(0),
                    token: row.get(1),
                    username: row.get(2),
                    created_at_ms: row.get(3),
                })
            }
        };

        Ok(row)
    }
}
