//! 16-bit PCM WAV encoding.
//!
//! Serializes an `AudioBuffer` into a canonical 44-byte-header RIFF/WAVE
//! container with interleaved little-endian `i16` samples. The output is a
//! pure function of the buffer, so encoding the same mix twice yields
//! identical bytes.

use super::buffer::AudioBuffer;
use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::fs;
use std::path::Path;

/// MIME type of the encoded output.
pub const WAV_MIME_TYPE: &str = "audio/wav";

/// Size of the RIFF + fmt + data chunk headers.
pub const WAV_HEADER_LEN: usize = 44;

/// Bit depth of every encoded sample.
pub const BITS_PER_SAMPLE: u16 = 16;

/// PCM format code in the fmt chunk.
const FORMAT_PCM: u16 = 1;

/// Length of the fmt chunk body for plain PCM.
const FMT_CHUNK_LEN: u32 = 16;

/// Offsets of the two size fields patched after the samples are written.
const RIFF_SIZE_OFFSET: usize = 4;
const DATA_SIZE_OFFSET: usize = 40;

const BYTES_PER_SAMPLE: usize = (BITS_PER_SAMPLE / 8) as usize;

/// Growable little-endian byte cursor.
///
/// Writes land at the current offset and advance it. Writing past the end
/// grows the backing buffer; writing after a `seek` back overwrites bytes in
/// place, which is how size fields are patched once the payload is known.
#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
    offset: usize,
}

impl ByteWriter {
    /// Creates a cursor with room for `capacity` bytes before reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            offset: 0,
        }
    }

    /// Returns the current write offset.
    pub fn position(&self) -> usize {
        self.offset
    }

    /// Moves the write offset to `offset`, which may be at most the current
    /// length of the written data.
    pub fn seek(&mut self, offset: usize) {
        self.offset = offset.min(self.buf.len());
    }

    /// Writes raw bytes and advances the cursor.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        let end = self.offset + bytes.len();
        if end > self.buf.len() {
            self.buf.resize(end, 0);
        }
        self.buf[self.offset..end].copy_from_slice(bytes);
        self.offset = end;
    }

    /// Writes a four-character chunk tag.
    pub fn write_tag(&mut self, tag: &[u8; 4]) {
        self.write_bytes(tag);
    }

    /// Writes a little-endian `u16`.
    pub fn write_u16(&mut self, value: u16) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Writes a little-endian `u32`.
    pub fn write_u32(&mut self, value: u32) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Writes a little-endian `i16` sample.
    pub fn write_i16(&mut self, value: i16) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Consumes the cursor and returns the written bytes.
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// An encoded WAV file held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedAudio {
    bytes: Vec<u8>,
}

impl EncodedAudio {
    /// Returns the encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes self and returns the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Returns the encoded length in bytes (header included).
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if there are no bytes. Output of `encode` always holds at
    /// least the 44-byte header.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns the MIME type of the encoded data.
    pub fn mime_type(&self) -> &'static str {
        WAV_MIME_TYPE
    }

    /// Returns the bytes as standard padded base64, for services that need
    /// text-safe binary attachments.
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.bytes)
    }

    /// Writes the encoded bytes to a file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, &self.bytes)
            .with_context(|| format!("Failed to write WAV file: {}", path.display()))?;
        tracing::info!(path = %path.display(), bytes = self.bytes.len(), "Wrote WAV file");
        Ok(())
    }
}

impl AsRef<[u8]> for EncodedAudio {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Converts a float sample to 16-bit PCM.
///
/// The input is clamped to [-1.0, 1.0]. Negative values scale by 32768 and
/// positive values by 32767, then truncate toward zero.
#[inline]
pub fn sample_to_i16(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s <= 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Encodes a buffer as a 16-bit PCM WAV file.
///
/// Works for any channel count, sample rate, and frame count; an empty
/// buffer produces a header with an empty data chunk.
pub fn encode(buffer: &AudioBuffer) -> EncodedAudio {
    let channels = buffer.channel_count();
    let frames = buffer.frame_count();
    let data_len = channels * frames * BYTES_PER_SAMPLE;

    let block_align = channels * BYTES_PER_SAMPLE;
    let byte_rate = buffer.sample_rate() as u64 * block_align as u64;

    let mut out = ByteWriter::with_capacity(WAV_HEADER_LEN + data_len);

    // RIFF header; the size is patched once the data is written
    out.write_tag(b"RIFF");
    out.write_u32(0);
    out.write_tag(b"WAVE");

    // fmt chunk
    out.write_tag(b"fmt ");
    out.write_u32(FMT_CHUNK_LEN);
    out.write_u16(FORMAT_PCM);
    out.write_u16(channels.min(u16::MAX as usize) as u16);
    out.write_u32(buffer.sample_rate());
    out.write_u32(byte_rate.min(u32::MAX as u64) as u32);
    out.write_u16(block_align.min(u16::MAX as usize) as u16);
    out.write_u16(BITS_PER_SAMPLE);

    // data chunk
    out.write_tag(b"data");
    out.write_u32(0);
    debug_assert_eq!(out.position(), WAV_HEADER_LEN);

    for frame in 0..frames {
        for channel in buffer.channels() {
            out.write_i16(sample_to_i16(channel[frame]));
        }
    }

    let end = out.position();
    debug_assert_eq!(end, WAV_HEADER_LEN + data_len);
    out.seek(RIFF_SIZE_OFFSET);
    out.write_u32(to_u32(end - 8));
    out.seek(DATA_SIZE_OFFSET);
    out.write_u32(to_u32(end - WAV_HEADER_LEN));

    EncodedAudio {
        bytes: out.into_inner(),
    }
}

/// Narrows a RIFF size field, saturating past 4 GiB.
fn to_u32(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}
