//! Audio decoding, mixing, encoding, and playback.
//!
//! This module holds the sample-level machinery of the crate:
//! - Decoding WAV clips into planar float buffers
//! - Mixing placed clips into one stereo timeline buffer
//! - Encoding a buffer as a 16-bit PCM WAV file
//! - Previewing a buffer through rodio

pub mod buffer;
pub mod decode;
pub mod encode;
pub mod mixer;
pub mod playback;

pub use buffer::AudioBuffer;
pub use decode::{decode_file, decode_wav_bytes, DecodeError};
pub use encode::{encode, EncodedAudio, WAV_MIME_TYPE};
pub use mixer::mix;
pub use playback::play_blocking;

/// Sample rate every clip is decoded and mixed at (44.1 kHz standard).
pub const SAMPLE_RATE: u32 = 44100;

/// Channel count of the mixed output (stereo).
pub const OUTPUT_CHANNELS: usize = 2;
