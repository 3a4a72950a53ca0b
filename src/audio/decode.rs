//! WAV decoding into planar `AudioBuffer`s.
//!
//! Clips are decoded once, when they are added to a session. Every clip must
//! already be at the session sample rate; there is no resampling.

use super::buffer::AudioBuffer;
use hound::{SampleFormat, WavReader};
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while decoding a clip.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// File could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The bytes are not a readable WAV stream.
    #[error("WAV parse error: {0}")]
    Parse(String),

    /// The clip's sample rate differs from the session's.
    #[error("sample rate mismatch: clip is {found} Hz, session expects {expected} Hz")]
    SampleRateMismatch { expected: u32, found: u32 },

    /// Sample format or bit depth we cannot convert.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl From<hound::Error> for DecodeError {
    fn from(e: hound::Error) -> Self {
        match e {
            hound::Error::IoError(io) => DecodeError::Io(io),
            hound::Error::Unsupported => {
                DecodeError::UnsupportedFormat("unsupported WAV encoding".to_string())
            }
            other => DecodeError::Parse(other.to_string()),
        }
    }
}

/// Decodes WAV bytes held in memory.
///
/// # Arguments
///
/// * `bytes` - Complete contents of a WAV file
/// * `expected_rate` - The sample rate the caller mixes at
///
/// # Errors
///
/// Returns error if the bytes cannot be parsed, use an unsupported sample
/// format, or were recorded at a different sample rate.
pub fn decode_wav_bytes(bytes: &[u8], expected_rate: u32) -> Result<AudioBuffer, DecodeError> {
    decode_reader(Cursor::new(bytes), expected_rate)
}

/// Reads and decodes a WAV file from disk.
///
/// # Errors
///
/// Returns error if the file cannot be read or decoded.
pub fn decode_file<P: AsRef<Path>>(
    path: P,
    expected_rate: u32,
) -> Result<AudioBuffer, DecodeError> {
    let path = path.as_ref();
    let data = fs::read(path)?;
    let buffer = decode_wav_bytes(&data, expected_rate)?;
    tracing::debug!(
        path = %path.display(),
        channels = buffer.channel_count(),
        frames = buffer.frame_count(),
        "Decoded clip"
    );
    Ok(buffer)
}

fn decode_reader<R: Read>(reader: R, expected_rate: u32) -> Result<AudioBuffer, DecodeError> {
    let mut reader = WavReader::new(reader)?;
    let spec = reader.spec();

    if spec.sample_rate != expected_rate {
        return Err(DecodeError::SampleRateMismatch {
            expected: expected_rate,
            found: spec.sample_rate,
        });
    }

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => {
            if spec.bits_per_sample != 32 {
                return Err(DecodeError::UnsupportedFormat(format!(
                    "{}-bit float samples",
                    spec.bits_per_sample
                )));
            }
            reader.samples::<f32>().collect::<Result<_, _>>()?
        }
        SampleFormat::Int => {
            if !(8..=32).contains(&spec.bits_per_sample) {
                return Err(DecodeError::UnsupportedFormat(format!(
                    "{}-bit integer samples",
                    spec.bits_per_sample
                )));
            }
            // Full scale for an N-bit signed integer is 2^(N-1)
            let scale = 1.0 / (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()?
        }
    };

    Ok(AudioBuffer::from_interleaved(
        spec.sample_rate,
        spec.channels as usize,
        &samples,
    ))
}
