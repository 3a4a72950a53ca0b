//! trackmix - Lay audio clips out on a timeline and mix them to WAV.
//!
//! This library provides the core functionality for the trackmix tool:
//! decoding clips, placing them on a timeline, mixing, and encoding.

pub mod audio;
pub mod timeline;

// Re-export commonly used types
pub use audio::{encode, mix, AudioBuffer, DecodeError, EncodedAudio, SAMPLE_RATE};
pub use timeline::{Session, SessionManifest, Track, TrackId};
