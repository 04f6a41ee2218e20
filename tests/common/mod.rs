#![allow(dead_code)]

use hound::{SampleFormat, WavSpec, WavWriter};
use sqlx::sqlite::SqlitePool;
use std::io::Cursor;
use std::sync::Arc;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use url::Url;

use wav_vault::app::{AppContext, AppSettings};
use wav_vault::store::Database;
use wav_vault::transcode::{LameTranscoder, Transcoder};

pub const PUBLIC_URL: &str = "http://vault.test:3000";

/// Build a context over a SQLite database in a temporary directory
/// Keep the returned guard alive for the duration of the test
pub async fn create_test_context() -> (AppContext, tempfile::TempDir) {
    create_test_context_with(Arc::new(LameTranscoder), 4096).await
}

pub async fn create_test_context_with(
    transcoder: Arc<dyn Transcoder>,
    chunk_size: usize,
) -> (AppContext, tempfile::TempDir) {
    let (pool, guard) = wav_vault::db::create_test_connection_in_temporary_file()
        .await
        .unwrap();
    let settings = AppSettings {
        public_url: Url::parse(PUBLIC_URL).unwrap(),
        chunk_size,
        max_upload_bytes: 50 * 1024 * 1024,
    };
    let ctx = AppContext::open(Database::Sqlite(pool), settings, transcoder)
        .await
        .unwrap();
    (ctx, guard)
}

pub fn sqlite_pool(ctx: &AppContext) -> &SqlitePool {
    match &ctx.db {
        Database::Sqlite(pool) => pool,
        Database::Postgres(_) => panic!("test context is sqlite"),
    }
}

pub async fn count_audio_rows(ctx: &AppContext) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM audio")
        .fetch_one(sqlite_pool(ctx))
        .await
        .unwrap()
}

/// 16-bit PCM WAV holding a 0.5 amplitude sine
pub fn sine_wav(frequency: f32, seconds: f32, sample_rate: u32, channels: u16) -> Vec<u8> {
    let frames = (seconds * sample_rate as f32).round() as usize;
    sine_wav_frames(frequency, frames, sample_rate, channels)
}

/// Same as [`sine_wav`] with an exact frame count
pub fn sine_wav_frames(frequency: f32, frames: usize, sample_rate: u32, channels: u16) -> Vec<u8> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..frames {
            let t = i as f32 / sample_rate as f32;
            let value = (t * frequency * 2.0 * std::f32::consts::PI).sin() * 0.5;
            for _ in 0..channels {
                writer.write_sample((value * i16::MAX as f32) as i16).unwrap();
            }
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// What came out of decoding an MP3 buffer
pub struct DecodedMp3 {
    pub sample_rate: u32,
    pub channels: usize,
    pub frames: usize,
    /// First channel only
    pub samples: Vec<f32>,
}

impl DecodedMp3 {
    pub fn seconds(&self) -> f64 {
        self.frames as f64 / self.sample_rate as f64
    }

    /// Full cycles per second, counted with hysteresis so encoder padding
    /// noise around zero is ignored
    pub fn estimated_frequency(&self) -> f64 {
        let mut cycles = 0usize;
        let mut high = false;
        for &s in &self.samples {
            if !high && s > 0.1 {
                high = true;
                cycles += 1;
            } else if high && s < -0.1 {
                high = false;
            }
        }
        cycles as f64 / self.seconds()
    }

    /// Frames from the first to the last sample louder than `threshold`.
    /// Encoder delay shifts the audio but does not stretch it, so this
    /// matches the source length when nothing at the end was lost.
    pub fn audible_span(&self, threshold: f32) -> usize {
        let first = self.samples.iter().position(|s| s.abs() > threshold);
        let last = self.samples.iter().rposition(|s| s.abs() > threshold);
        match (first, last) {
            (Some(first), Some(last)) => last - first + 1,
            _ => 0,
        }
    }
}

/// Assert a decoded 0.5 amplitude sine still spans its whole source
pub fn assert_keeps_whole_clip(decoded: &DecodedMp3, source_frames: usize) {
    let span = decoded.audible_span(0.1);
    // A 440 Hz cycle is ~100 frames; the loud region ends within one of them
    assert!(
        span + 250 >= source_frames && span <= source_frames + 1200,
        "audible span {} frames for a {} frame source",
        span,
        source_frames
    );
}

/// Decode an MP3 buffer with symphonia
pub fn decode_mp3(mp3: Vec<u8>) -> DecodedMp3 {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(mp3)), Default::default());
    let mut hint = Hint::new();
    hint.with_extension("mp3");

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .expect("mp3 should be recognised");
    let mut format = probed.format;
    let track = format.default_track().expect("mp3 should have a track");
    let track_id = track.id;
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .expect("mp3 decoder should be available");

    let mut decoded = DecodedMp3 {
        sample_rate: 0,
        channels: 0,
        frames: 0,
        samples: Vec::new(),
    };

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(e) => panic!("failed to read packet: {}", e),
        };
        if packet.track_id() != track_id {
            continue;
        }
        let audio = match decoder.decode(&packet) {
            Ok(audio) => audio,
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => panic!("failed to decode packet: {}", e),
        };

        let spec = *audio.spec();
        decoded.sample_rate = spec.rate;
        decoded.channels = spec.channels.count();
        decoded.frames += audio.frames();

        let mut buf = SampleBuffer::<f32>::new(audio.capacity() as u64, spec);
        buf.copy_interleaved_ref(audio);
        decoded
            .samples
            .extend(buf.samples().iter().step_by(decoded.channels));
    }

    decoded
}

/// Pull `id` and `user` out of a retrieval URL
pub fn url_params(url: &str) -> (String, String) {
    let parsed = Url::parse(url).unwrap();
    let mut id = None;
    let mut user = None;
    for (key, value) in parsed.query_pairs() {
        match key.as_ref() {
            "id" => id = Some(value.into_owned()),
            "user" => user = Some(value.into_owned()),
            _ => {}
        }
    }
    (id.unwrap(), user.unwrap())
}
