use bytes::Bytes;
use log::debug;

use crate::audio_store::AudioStore;
use crate::error::{ServiceError, ServiceResult};

/// Pull-based chunk iterator over a stored payload.
///
/// Yields consecutive `chunk_size` slices (the last may be shorter) and then
/// ends for good. It is consumed by value and cannot be cloned, so a second
/// download needs a fresh [`retrieve`] call. Dropping it early releases the
/// payload and nothing further is produced.
#[derive(Debug)]
pub struct PayloadChunks {
    payload: Bytes,
    chunk_size: usize,
}

impl PayloadChunks {
    pub fn new(payload: Bytes, chunk_size: usize) -> Self {
        Self {
            payload,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Bytes not yet handed out
    pub fn remaining(&self) -> usize {
        self.payload.len()
    }
}

impl Iterator for PayloadChunks {
    type Item = Bytes;

    fn next(&mut self) -> Option<Bytes> {
        if self.payload.is_empty() {
            return None;
        }
        let take = self.chunk_size.min(self.payload.len());
        Some(self.payload.split_to(take))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.payload.len().div_ceil(self.chunk_size);
        (n, Some(n))
    }
}

impl ExactSizeIterator for PayloadChunks {}

impl Drop for PayloadChunks {
    fn drop(&mut self) {
        if !self.payload.is_empty() {
            debug!("Download stopped with {} bytes unsent", self.payload.len());
        }
    }
}

/// A located recording ready to be streamed
#[derive(Debug)]
pub struct Download {
    pub display_name: String,
    pub chunks: PayloadChunks,
}

impl Download {
    /// File name offered to the client, restored from the upload name
    pub fn file_name(&self) -> String {
        format!("{}.mp3", self.display_name)
    }

    /// `attachment; filename="<name>.mp3"` with the name percent-encoded
    pub fn content_disposition(&self) -> String {
        format!(
            "attachment; filename=\"{}\"",
            urlencoding::encode(&self.file_name())
        )
    }
}

/// Look up a recording by (audio_id, owner id) and prepare it for streaming.
/// A mismatched owner is indistinguishable from a missing recording.
pub async fn retrieve(
    store: &AudioStore,
    audio_id: &str,
    user_id: &str,
    chunk_size: usize,
) -> ServiceResult<Download> {
    let record = store
        .get(audio_id, user_id)
        .await?
        .ok_or(ServiceError::NotFound)?;

    Ok(Download {
        display_name: record.display_name,
        chunks: PayloadChunks::new(record.payload, chunk_size),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(len: usize) -> Bytes {
        Bytes::from((0..len).map(|i| (i % 251) as u8).collect::<Vec<u8>>())
    }

    #[test]
    fn test_chunks_concatenate_to_payload_smaller_than_chunk() {
        let data = payload(1000);
        let chunks: Vec<Bytes> = PayloadChunks::new(data.clone(), 4096).collect();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks.concat(), data.to_vec());
    }

    #[test]
    fn test_chunks_concatenate_to_payload_larger_than_chunk() {
        let data = payload(50000);
        let chunks: Vec<Bytes> = PayloadChunks::new(data.clone(), 4096).collect();
        assert_eq!(chunks.len(), 13);
        assert!(chunks[..12].iter().all(|c| c.len() == 4096));
        assert_eq!(chunks[12].len(), 50000 - 12 * 4096);
        assert_eq!(chunks.concat(), data.to_vec());
    }

    #[test]
    fn test_exhausted_iterator_stays_exhausted() {
        let mut chunks = PayloadChunks::new(payload(10), 4);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.by_ref().count(), 3);
        assert_eq!(chunks.next(), None);
        assert_eq!(chunks.remaining(), 0);
    }

    #[test]
    fn test_empty_payload_yields_nothing() {
        assert_eq!(PayloadChunks::new(Bytes::new(), 4096).count(), 0);
    }

    fn content_disposition(display_name: &str) -> String {
        Download {
            display_name: display_name.to_string(),
            chunks: PayloadChunks::new(Bytes::new(), 4096),
        }
        .content_disposition()
    }

    #[test]
    fn test_content_disposition_percent_encodes() {
        assert_eq!(
            content_disposition("voice memo"),
            "attachment; filename=\"voice%20memo.mp3\""
        );
        assert_eq!(
            content_disposition("a\"b"),
            "attachment; filename=\"a%22b.mp3\""
        );
        assert_eq!(content_disposition("a.b"), "attachment; filename=\"a.b.mp3\"");
    }

    #[test]
    fn test_dropping_partially_read_chunks_stops_production() {
        let mut chunks = PayloadChunks::new(payload(10_000), 1024);
        assert_eq!(chunks.next().unwrap().len(), 1024);
        assert_eq!(chunks.next().unwrap().len(), 1024);
        assert_eq!(chunks.remaining(), 10_000 - 2048);
        assert_eq!(chunks.len(), 8);
        drop(chunks);
    }
}
