//! Timeline mixing.
//!
//! Sums every track into one stereo buffer covering the whole composition.
//! Overlapping clips are added sample by sample; nothing is normalized or
//! clipped here, that happens only when the mix is encoded.

use super::buffer::AudioBuffer;
use super::OUTPUT_CHANNELS;
use crate::timeline::Track;

/// Frame counts within this distance of a whole number are treated as exact,
/// so `n / rate * rate` does not round up to `n + 1`.
const FRAME_EPSILON: f64 = 1e-6;

/// Mixes tracks into a single stereo buffer.
///
/// An empty track list yields one second of silence. Otherwise the output
/// spans from time zero to the latest track end, and each track is added in
/// starting at `floor(start_time * sample_rate)`. Mono clips are copied into
/// both output channels at full level.
///
/// # Arguments
///
/// * `tracks` - Tracks to mix, in any order
/// * `sample_rate` - Output sample rate, shared by every clip
pub fn mix(tracks: &[Track], sample_rate: u32) -> AudioBuffer {
    if tracks.is_empty() {
        return AudioBuffer::silence(OUTPUT_CHANNELS, sample_rate, sample_rate as usize);
    }

    let rate = sample_rate as f64;
    let total_duration = tracks
        .iter()
        .map(Track::end_time)
        .fold(0.0_f64, f64::max);
    let total_frames = seconds_to_frames_ceil(total_duration, rate);

    let mut output = AudioBuffer::silence(OUTPUT_CHANNELS, sample_rate, total_frames);

    for track in tracks {
        let source = track.buffer();
        if source.channel_count() == 0 {
            continue;
        }
        let start_sample = (track.start_time() * rate).floor() as usize;
        if start_sample >= total_frames {
            continue;
        }

        for out_channel in 0..OUTPUT_CHANNELS {
            // Mono (or any narrower clip) falls back to its first channel
            let src_channel = if source.channel_count() > out_channel {
                out_channel
            } else {
                0
            };
            let (Some(src), Some(dst)) = (
                source.channel(src_channel),
                output.channel_mut(out_channel),
            ) else {
                continue;
            };

            for (out, &sample) in dst[start_sample..].iter_mut().zip(src) {
                *out += sample;
            }
        }
    }

    tracing::debug!(
        tracks = tracks.len(),
        frames = total_frames,
        duration = total_duration,
        "Mixed timeline"
    );

    output
}

/// Converts a duration to a frame count, rounding up partial frames.
fn seconds_to_frames_ceil(seconds: f64, rate: f64) -> usize {
    let frames = seconds * rate;
    let nearest = frames.round();
    if (frames - nearest).abs() < FRAME_EPSILON {
        nearest as usize
    } else {
        frames.ceil() as usize
    }
}
