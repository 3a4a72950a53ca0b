//! A clip placed on the timeline.
//!
//! A track owns one decoded clip and the offset it starts playing at. The
//! clip's samples never change once decoded; only the start time is editable.

use crate::audio::AudioBuffer;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for generating unique track IDs.
static TRACK_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a track within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(u64);

impl TrackId {
    /// Generates a new unique track ID.
    pub fn new() -> Self {
        Self(TRACK_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for TrackId {
    fn default() -> Self {
        Self::new()
    }
}

/// One decoded clip and its position on the timeline.
#[derive(Debug, Clone)]
pub struct Track {
    /// Unique identifier for this track.
    pub id: TrackId,

    /// Human-readable name, usually the clip's file stem.
    pub name: String,

    /// Where the clip was decoded from, if it came from a file.
    /// Stored as a string for cross-platform manifest compatibility.
    pub source_path: Option<String>,

    /// Offset in seconds from the start of the composition. Never negative.
    start_time: f64,

    /// Decoded samples.
    buffer: AudioBuffer,
}

impl Track {
    /// Creates a track from a decoded clip.
    ///
    /// # Arguments
    ///
    /// * `name` - Display name for the track
    /// * `buffer` - Decoded clip samples
    /// * `start_time` - Offset in seconds; negative or non-finite values become 0
    pub fn new(name: impl Into<String>, buffer: AudioBuffer, start_time: f64) -> Self {
        Self {
            id: TrackId::new(),
            name: name.into(),
            source_path: None,
            start_time: sanitize_start(start_time),
            buffer,
        }
    }

    /// Records the file the clip was decoded from.
    pub fn with_source_path(mut self, path: impl Into<String>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    /// Returns the decoded clip.
    pub fn buffer(&self) -> &AudioBuffer {
        &self.buffer
    }

    /// Returns the start offset in seconds.
    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    /// Moves the clip. Negative or non-finite offsets clamp to 0.
    ///
    /// Crate-private so every move goes through the session, which
    /// invalidates its cached mix.
    pub(crate) fn set_start_time(&mut self, seconds: f64) {
        self.start_time = sanitize_start(seconds);
    }

    /// Returns the clip length in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.buffer.duration_seconds()
    }

    /// Returns the time at which the clip stops playing.
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration_seconds()
    }
}

fn sanitize_start(seconds: f64) -> f64 {
    if seconds.is_finite() {
        seconds.max(0.0)
    } else {
        0.0
    }
}
