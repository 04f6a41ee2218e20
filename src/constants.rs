use uuid::Uuid;

/// Expected database schema version
/// All databases must use this version for compatibility
pub const EXPECTED_DB_VERSION: &str = "1";

/// Size of each chunk handed to the HTTP body when streaming a download
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Path of the retrieval endpoint, embedded in every retrieval URL
pub const AUDIO_PATH: &str = "/audio";

/// Extension an upload must carry (case-sensitive)
pub const ACCEPTED_EXTENSION: &str = "wav";

/// Opaque identifier for users, tokens and audio records (UUID v4)
pub fn generate_opaque_id() -> String {
    Uuid::new_v4().to_string()
}
