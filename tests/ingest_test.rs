//! # Ingestion Pipeline Tests
//!
//! Uploads go through identity verification, the extension gate, the LAME
//! transcoder and the audio store. Output is decoded with symphonia to check
//! it is real audio.
//!
//! ```bash
//! cargo test --test ingest_test
//! ```

mod common;

use bytes::Bytes;
use std::sync::Arc;

use wav_vault::error::{ServiceError, ServiceResult};
use wav_vault::ingest::Upload;
use wav_vault::retrieve::retrieve;
use wav_vault::transcode::{LameTranscoder, Transcoder};

fn upload(file_name: &str, data: Vec<u8>, user_id: &str, token: &str) -> Upload {
    Upload {
        file_name: file_name.to_string(),
        data: Bytes::from(data),
        user_id: user_id.to_string(),
        token: token.to_string(),
    }
}

#[tokio::test]
async fn test_wrong_token_rejected_regardless_of_file() {
    let (ctx, _guard) = common::create_test_context().await;
    let alice = ctx.identities.register("alice").await.unwrap();
    let bob = ctx.identities.register("bob").await.unwrap();

    let cases = vec![
        ("clip.wav", common::sine_wav(440.0, 0.5, 44100, 1)),
        ("clip.wav", Vec::new()),
        ("song.mp3", common::sine_wav(440.0, 0.5, 44100, 1)),
        ("broken.wav", b"not a wav".to_vec()),
    ];

    for (name, data) in cases {
        let err = ctx
            .pipeline
            .ingest(upload(name, data, &alice.user_id, &bob.token))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Auth), "{}: got {:?}", name, err);
    }
    assert_eq!(common::count_audio_rows(&ctx).await, 0);
}

#[tokio::test]
async fn test_auth_message_does_not_say_which_field_was_wrong() {
    let (ctx, _guard) = common::create_test_context().await;
    let alice = ctx.identities.register("alice").await.unwrap();
    let wav = common::sine_wav(440.0, 0.2, 44100, 1);

    let bad_token = ctx
        .pipeline
        .ingest(upload("a.wav", wav.clone(), &alice.user_id, "wrong"))
        .await
        .unwrap_err();
    let bad_id = ctx
        .pipeline
        .ingest(upload("a.wav", wav, "wrong", &alice.token))
        .await
        .unwrap_err();
    assert_eq!(bad_token.to_string(), bad_id.to_string());
}

#[tokio::test]
async fn test_mp3_extension_rejected_even_with_wav_bytes() {
    let (ctx, _guard) = common::create_test_context().await;
    let alice = ctx.identities.register("alice").await.unwrap();

    let err = ctx
        .pipeline
        .ingest(upload(
            "song.mp3",
            common::sine_wav(440.0, 0.5, 44100, 1),
            &alice.user_id,
            &alice.token,
        ))
        .await
        .unwrap_err();
    match err {
        ServiceError::Validation(message) => assert_eq!(message, "unsupported format"),
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_extension_check_is_case_sensitive() {
    let (ctx, _guard) = common::create_test_context().await;
    let alice = ctx.identities.register("alice").await.unwrap();

    for name in ["LOUD.WAV", "noextension", "clip.wav.bak"] {
        let err = ctx
            .pipeline
            .ingest(upload(
                name,
                common::sine_wav(440.0, 0.2, 44100, 1),
                &alice.user_id,
                &alice.token,
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)), "{}: got {:?}", name, err);
    }
}

#[tokio::test]
async fn test_empty_file_rejected() {
    let (ctx, _guard) = common::create_test_context().await;
    let alice = ctx.identities.register("alice").await.unwrap();

    let err = ctx
        .pipeline
        .ingest(upload("clip.wav", Vec::new(), &alice.user_id, &alice.token))
        .await
        .unwrap_err();
    match err {
        ServiceError::Validation(message) => assert_eq!(message, "empty file"),
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_undecodable_wav_persists_nothing() {
    let (ctx, _guard) = common::create_test_context().await;
    let alice = ctx.identities.register("alice").await.unwrap();

    let err = ctx
        .pipeline
        .ingest(upload(
            "broken.wav",
            b"RIFF this is not really a wave file".to_vec(),
            &alice.user_id,
            &alice.token,
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Decode(_)), "got {:?}", err);
    assert_eq!(common::count_audio_rows(&ctx).await, 0);
}

struct CrashingTranscoder;

impl Transcoder for CrashingTranscoder {
    fn transcode(&self, _wav: &[u8]) -> ServiceResult<Vec<u8>> {
        panic!("codec crashed");
    }
}

#[tokio::test]
async fn test_transcoder_crash_fails_only_the_request() {
    let (ctx, _guard) = common::create_test_context_with(Arc::new(CrashingTranscoder), 4096).await;
    let alice = ctx.identities.register("alice").await.unwrap();
    let wav = common::sine_wav(440.0, 0.2, 44100, 1);

    let err = ctx
        .pipeline
        .ingest(upload("a.wav", wav, &alice.user_id, &alice.token))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Decode(_)), "got {:?}", err);

    // Still serving
    assert!(ctx.identities.register("bob").await.is_ok());
    assert_eq!(common::count_audio_rows(&ctx).await, 0);
}

#[tokio::test]
async fn test_round_trip_voice_memo() {
    let (ctx, _guard) = common::create_test_context().await;
    let alice = ctx.identities.register("alice").await.unwrap();

    let url = ctx
        .pipeline
        .ingest(upload(
            "voice memo.wav",
            common::sine_wav(440.0, 2.0, 44100, 2),
            &alice.user_id,
            &alice.token,
        ))
        .await
        .unwrap();

    assert!(url.starts_with("http://vault.test:3000/audio?"), "got {}", url);
    let (audio_id, user_id) = common::url_params(&url);
    assert_eq!(user_id, alice.user_id);

    let stored = ctx.audio.get(&audio_id, &user_id).await.unwrap().unwrap();
    assert_eq!(stored.retrieval_url, url);
    assert_eq!(stored.display_name, "voice memo");

    let download = retrieve(&ctx.audio, &audio_id, &user_id, 4096).await.unwrap();
    assert_eq!(download.file_name(), "voice memo.mp3");
    let mp3: Vec<u8> = download.chunks.flat_map(|chunk| chunk.to_vec()).collect();
    assert_eq!(mp3, stored.payload.to_vec());

    let decoded = common::decode_mp3(mp3);
    assert_eq!(decoded.sample_rate, 44100);
    assert_eq!(decoded.channels, 2);
    // Encoder delay and padding only ever add frames
    assert!(
        decoded.frames >= 88200 && decoded.seconds() < 2.2,
        "decoded {} frames",
        decoded.frames
    );
    common::assert_keeps_whole_clip(&decoded, 88200);
    let frequency = decoded.estimated_frequency();
    assert!(
        (frequency - 440.0).abs() < 20.0,
        "decoded tone at {} Hz",
        frequency
    );
}

#[test]
fn test_clip_tail_survives_encoding() {
    // Short clips fit inside the encoder's internal buffer entirely
    for frames in [1000usize, 4410, 22050] {
        let wav = common::sine_wav_frames(440.0, frames, 44100, 1);
        let mp3 = LameTranscoder.transcode(&wav).unwrap();
        let decoded = common::decode_mp3(mp3);
        common::assert_keeps_whole_clip(&decoded, frames);
    }
}

#[tokio::test]
async fn test_multi_dot_name_keeps_inner_dots() {
    let (ctx, _guard) = common::create_test_context().await;
    let alice = ctx.identities.register("alice").await.unwrap();

    let url = ctx
        .pipeline
        .ingest(upload(
            "a.b.wav",
            common::sine_wav(220.0, 0.3, 22050, 1),
            &alice.user_id,
            &alice.token,
        ))
        .await
        .unwrap();
    let (audio_id, user_id) = common::url_params(&url);

    let download = retrieve(&ctx.audio, &audio_id, &user_id, 4096).await.unwrap();
    assert_eq!(download.display_name, "a.b");
    assert_eq!(download.file_name(), "a.b.mp3");
}

#[tokio::test]
async fn test_retry_creates_distinct_records() {
    let (ctx, _guard) = common::create_test_context().await;
    let alice = ctx.identities.register("alice").await.unwrap();
    let wav = common::sine_wav(440.0, 0.3, 44100, 1);

    let first = ctx
        .pipeline
        .ingest(upload("clip.wav", wav.clone(), &alice.user_id, &alice.token))
        .await
        .unwrap();
    let second = ctx
        .pipeline
        .ingest(upload("clip.wav", wav, &alice.user_id, &alice.token))
        .await
        .unwrap();

    assert_ne!(first, second);
    assert_eq!(common::count_audio_rows(&ctx).await, 2);
}
