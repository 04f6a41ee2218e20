use bytes::Bytes;
use sqlx::Row;

use crate::error::ServiceResult;
use crate::queries::audio::{self, AudioRow};
use crate::store::Database;

/// A stored, transcoded upload
#[derive(Debug, Clone)]
pub struct AudioRecord {
    pub audio_id: String,
    pub owner_id: String,
    pub display_name: String,
    pub retrieval_url: String,
    pub payload: Bytes,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct AudioStore {
    db: Database,
}

impl AudioStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a record in its own transaction.
    ///
    /// An unknown owner (foreign key) or an existing `audio_id` (primary key)
    /// fails the insert; nothing is overwritten and nothing becomes visible.
    pub async fn put(&self, record: &AudioRecord) -> ServiceResult<()> {
        let row = AudioRow {
            audio_id: &record.audio_id,
            owner_id: &record.owner_id,
            display_name: &record.display_name,
            retrieval_url: &record.retrieval_url,
            payload: &record.payload,
            created_at_ms: record.created_at_ms,
        };

        match &self.db {
            Database::Sqlite(pool) => {
                let sql = audio::insert(&row);
                let mut tx = pool.begin().await?;
                sqlx::query(&sql).execute(&mut *tx).await?;
                tx.commit().await?;
            }
            Database::Postgres(pool) => {
                let sql = audio::insert_pg(&row);
                let mut tx = pool.begin().await?;
                sqlx::query(&sql).execute(&mut *tx).await?;
                tx.commit().await?;
            }
        }

        Ok(())
    }

    /// Fetch a record only if both the audio id and the owner id match it
    pub async fn get(&self, audio_id: &str, owner_id: &str) -> ServiceResult<Option<AudioRecord>> {
        let record = match &self.db {
            Database::Sqlite(pool) => {
                let sql = audio::select_by_id_and_owner(audio_id, owner_id);
                sqlx::query(&sql).fetch_optional(pool).await?.map(|row| AudioRecord {
                    audio_id: row.get(0),
                    owner_id: row.get(1),
                    display_name: row.get(2),
                    retrieval_url: row.get(3),
                    payload: Bytes::from(row.get::<Vec<u8>, _>(4)),
                    created_at_ms: row.get(5),
                })
            }
            Database::Postgres(pool) => {
                let sql = audio::select_by_id_and_owner_pg(audio_id, owner_id);
                sqlx::query(&sql).fetch_optional(pool).await?.map(|row| AudioRecord {
                    audio_id: row.get(0),
                    owner_id: row.get(1),
                    display_name: row.get(2),
                    retrieval_url: row.get(3),
                    payload: Bytes::from(row.get::<Vec<u8>, _>(4)),
                    created_at_ms: row.get(5),
                })
            }
        };

        Ok(record)
    }
}
