// wav_vault: wav uploads stored as mp3 and served back in chunks

pub mod app;
pub mod audio_store;
pub mod config;
pub mod constants;
pub mod credentials;
pub mod db;
pub mod db_postgres;
pub mod error;
pub mod identity;
pub mod ingest;
pub mod queries;
pub mod retrieve;
pub mod schema;
pub mod serve;
pub mod store;
pub mod transcode;

// Re-export the expected database version for convenience
pub use constants::EXPECTED_DB_VERSION;
