use bytes::Bytes;
use log::info;
use std::sync::Arc;
use url::Url;

use crate::audio_store::{AudioRecord, AudioStore};
use crate::constants::{generate_opaque_id, ACCEPTED_EXTENSION, AUDIO_PATH};
use crate::error::{ServiceError, ServiceResult};
use crate::identity::IdentityStore;
use crate::transcode::Transcoder;

/// One upload request, fully read into memory
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub data: Bytes,
    pub user_id: String,
    pub token: String,
}

/// Verification, validation, transcoding and persistence of uploads.
///
/// Each step must succeed before the next runs; the first failure ends the
/// request and nothing is retried.
#[derive(Clone)]
pub struct IngestPipeline {
    identities: IdentityStore,
    audio: AudioStore,
    transcoder: Arc<dyn Transcoder>,
    public_url: Url,
}

impl IngestPipeline {
    pub fn new(
        identities: IdentityStore,
        audio: AudioStore,
        transcoder: Arc<dyn Transcoder>,
        public_url: Url,
    ) -> Self {
        Self {
            identities,
            audio,
            transcoder,
            public_url,
        }
    }

    /// Run an upload through the pipeline and return its retrieval URL
    pub async fn ingest(&self, upload: Upload) -> ServiceResult<String> {
        let user = self
            .identities
            .verify(&upload.user_id, &upload.token)
            .await?
            .ok_or(ServiceError::Auth)?;

        if upload.data.is_empty() {
            return Err(ServiceError::validation("empty file"));
        }

        let display_name = match split_extension(&upload.file_name) {
            Some((stem, ACCEPTED_EXTENSION)) => stem.to_string(),
            _ => return Err(ServiceError::validation("unsupported format")),
        };

        let transcoder = Arc::clone(&self.transcoder);
        let wav = upload.data;
        let mp3 = tokio::task::spawn_blocking(move || transcoder.transcode(&wav))
            .await
            .map_err(|e| ServiceError::Decode(format!("transcoder task failed: {}", e)))??;

        let audio_id = generate_opaque_id();
        let retrieval_url = build_retrieval_url(&self.public_url, &audio_id, &user.user_id);

        let record = AudioRecord {
            audio_id,
            owner_id: user.user_id,
            display_name,
            retrieval_url,
            payload: Bytes::from(mp3),
            created_at_ms: chrono::Utc::now().timestamp_millis(),
        };
        self.audio.put(&record).await?;

        info!(
            "Stored '{}' ({} bytes mp3) as {} for user {}",
            upload.file_name,
            record.payload.len(),
            record.audio_id,
            record.owner_id
        );

        Ok(record.retrieval_url)
    }
}

/// Split a file name at its final `.` into (stem, extension).
/// `a.b.wav` gives `("a.b", "wav")`; a name without a dot gives `None`.
pub fn split_extension(file_name: &str) -> Option<(&str, &str)> {
    file_name.rsplit_once('.')
}

/// `<public_url><AUDIO_PATH>?id=<audio_id>&user=<user_id>`, keeping any path prefix
/// of the public URL.
pub fn build_retrieval_url(public_url: &Url, audio_id: &str, user_id: &str) -> String {
    let mut url = public_url.clone();
    let prefix = url.path().trim_end_matches('/').to_string();
    url.set_path(&format!("{}{}", prefix, AUDIO_PATH));
    url.set_fragment(None);
    url.query_pairs_mut()
        .clear()
        .append_pair("id", audio_id)
        .append_pair("user", user_id);
    url.to_string()
}
