use hound::{SampleFormat, WavReader};
use mp3lame_encoder::{Builder, FlushGap, InterleavedPcm, MonoPcm, Quality, VbrMode};
use std::io::Cursor;

use crate::error::{ServiceError, ServiceResult};

/// Converts a complete WAV buffer into a complete MP3 buffer.
///
/// Implementations are CPU-bound and are called from the blocking thread pool.
pub trait Transcoder: Send + Sync {
    fn transcode(&self, wav: &[u8]) -> ServiceResult<Vec<u8>>;
}

/// LAME-backed transcoder, VBR at the best quality setting (`-V 0`)
#[derive(Debug, Default, Clone, Copy)]
pub struct LameTranscoder;

impl Transcoder for LameTranscoder {
    fn transcode(&self, wav: &[u8]) -> ServiceResult<Vec<u8>> {
        let pcm = decode_wav(wav)?;
        encode_mp3(&pcm)
    }
}

/// Interleaved 16-bit PCM pulled out of a WAV container
#[derive(Debug)]
pub struct Pcm {
    pub channels: u16,
    pub sample_rate: u32,
    pub samples: Vec<i16>,
}

fn decode_error(e: impl std::fmt::Display) -> ServiceError {
    ServiceError::Decode(e.to_string())
}

/// Parse a WAV buffer and convert every supported sample format to i16
pub fn decode_wav(wav: &[u8]) -> ServiceResult<Pcm> {
    let mut reader = WavReader::new(Cursor::new(wav)).map_err(decode_error)?;
    let spec = reader.spec();

    if spec.channels != 1 && spec.channels != 2 {
        return Err(ServiceError::Decode(format!(
            "unsupported channel count: {} (mono or stereo only)",
            spec.channels
        )));
    }

    let samples: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, bits @ 1..=16) => {
            let shift = 16 - bits as u32;
            reader
                .samples::<i16>()
                .map(|s| s.map(|v| v << shift))
                .collect::<Result<_, _>>()
                .map_err(decode_error)?
        }
        (SampleFormat::Int, bits @ 17..=32) => {
            let shift = bits as u32 - 16;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| (v >> shift) as i16))
                .collect::<Result<_, _>>()
                .map_err(decode_error)?
        }
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * i16::MAX as f32) as i16))
            .collect::<Result<_, _>>()
            .map_err(decode_error)?,
        (format, bits) => {
            return Err(ServiceError::Decode(format!(
                "unsupported sample format: {:?} {}-bit",
                format, bits
            )))
        }
    };

    if samples.is_empty() {
        return Err(ServiceError::Decode("wav file contains no samples".to_string()));
    }

    Ok(Pcm {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        samples,
    })
}

/// Encode interleaved PCM to MP3 with LAME
pub fn encode_mp3(pcm: &Pcm) -> ServiceResult<Vec<u8>> {
    let mut builder = Builder::new()
        .ok_or_else(|| ServiceError::Decode("failed to create LAME encoder".to_string()))?;
    builder
        .set_num_channels(pcm.channels as u8)
        .map_err(|e| ServiceError::Decode(format!("channels: {:?}", e)))?;
    builder
        .set_sample_rate(pcm.sample_rate)
        .map_err(|e| ServiceError::Decode(format!("sample rate {}: {:?}", pcm.sample_rate, e)))?;
    builder
        .set_vbr_mode(VbrMode::Mtrh)
        .map_err(|e| ServiceError::Decode(format!("vbr mode: {:?}", e)))?;
    builder
        .set_vbr_quality(Quality::Best)
        .map_err(|e| ServiceError::Decode(format!("vbr quality: {:?}", e)))?;
    builder
        .set_quality(Quality::Best)
        .map_err(|e| ServiceError::Decode(format!("quality: {:?}", e)))?;
    let mut encoder = builder
        .build()
        .map_err(|e| ServiceError::Decode(format!("encoder init: {:?}", e)))?;

    let frames = pcm.samples.len() / pcm.channels as usize;
    let mut mp3 = Vec::with_capacity(mp3lame_encoder::max_required_buffer_size(frames));

    if pcm.channels == 1 {
        encoder.encode_to_vec(MonoPcm(&pcm.samples), &mut mp3)
    } else {
        encoder.encode_to_vec(InterleavedPcm(&pcm.samples), &mut mp3)
    }
    .map_err(|e| ServiceError::Decode(format!("encode: {:?}", e)))?;

    // The file ends here, so pad the queued PCM out to whole frames
    mp3.reserve(mp3lame_encoder::max_required_buffer_size(0));
    encoder
        .flush_to_vec::<FlushGap>(&mut mp3)
        .map_err(|e| ServiceError::Decode(format!("flush: {:?}", e)))?;

    Ok(mp3)
}
