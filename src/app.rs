use log::info;
use std::sync::Arc;
use url::Url;

use crate::audio_store::AudioStore;
use crate::config::{ServiceConfig, StorageConfig};
use crate::credentials;
use crate::db::{self, DynError};
use crate::db_postgres;
use crate::identity::IdentityStore;
use crate::ingest::IngestPipeline;
use crate::store::Database;
use crate::transcode::{LameTranscoder, Transcoder};

/// Request-path settings taken from the config file
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub public_url: Url,
    pub chunk_size: usize,
    pub max_upload_bytes: usize,
}

impl AppSettings {
    pub fn from_config(config: &ServiceConfig) -> Result<Self, String> {
        config.validate()?;
        Ok(Self {
            public_url: config.public_url()?,
            chunk_size: config.chunk_size,
            max_upload_bytes: config.max_upload_bytes,
        })
    }
}

/// Everything a request handler needs, built once at startup and shared by `Arc`.
pub struct AppContext {
    pub db: Database,
    pub identities: IdentityStore,
    pub audio: AudioStore,
    pub pipeline: IngestPipeline,
    pub settings: AppSettings,
}

impl AppContext {
    /// Connect to the configured store, prepare the schema and build the context
    pub async fn start(config: &ServiceConfig) -> Result<Self, DynError> {
        let settings = AppSettings::from_config(config)?;

        let db = match config.storage()? {
            StorageConfig::Sqlite(sqlite) => {
                info!("SQLite database: {}", sqlite.path.display());
                Database::Sqlite(db::open_database_connection(&sqlite.path).await?)
            }
            StorageConfig::Postgres(pg) => {
                let creds = credentials::load_credentials()?;
                let password = credentials::get_postgres_password(&creds, &pg.credential_profile)?;
                info!("PostgreSQL database: {} at {}", pg.database, pg.url);
                let pool = db_postgres::open_postgres_connection_create_if_needed(
                    &pg.url,
                    &password,
                    &pg.database,
                )
                .await
                .map_err(|e| {
                    format!(
                        "Failed to connect to PostgreSQL database '{}': {}",
                        pg.database, e
                    )
                })?;
                Database::Postgres(pool)
            }
        };

        Self::open(db, settings, Arc::new(LameTranscoder)).await
    }

    /// Build a context over an already connected store
    pub async fn open(
        db: Database,
        settings: AppSettings,
        transcoder: Arc<dyn Transcoder>,
    ) -> Result<Self, DynError> {
        db.init_schema().await?;
        db.ensure_version().await?;

        let identities = IdentityStore::new(db.clone());
        let audio = AudioStore::new(db.clone());
        let pipeline = IngestPipeline::new(
            identities.clone(),
            audio.clone(),
            transcoder,
            settings.public_url.clone(),
        );

        Ok(Self {
            db,
            identities,
            audio,
            pipeline,
            settings,
        })
    }

    /// Close the connection pool; in-flight queries finish first
    pub async fn stop(&self) {
        self.db.close().await;
        info!("Database connections closed");
    }
}
