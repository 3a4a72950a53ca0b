//! Timeline data structures.
//!
//! This module provides the types for laying clips out in time: tracks that
//! own a decoded clip and its start offset, the session that owns the tracks
//! and their cached mix, and the manifest used to save and reload sessions.

mod manifest;
mod session;
mod track;

pub use manifest::{ClipEntry, SessionManifest};
pub use session::Session;
pub use track::{Track, TrackId};

/// Parses a clip argument of the form `PATH` or `PATH@SECONDS`.
///
/// The split happens at the last `@`, and only when what follows parses as a
/// number, so paths that contain `@` still work.
///
/// # Examples
///
/// ```
/// use trackmix::timeline::parse_clip_arg;
///
/// assert_eq!(parse_clip_arg("drums.wav@2.5"), ("drums.wav", 2.5));
/// assert_eq!(parse_clip_arg("vocals.wav"), ("vocals.wav", 0.0));
/// ```
pub fn parse_clip_arg(arg: &str) -> (&str, f64) {
    if let Some((path, offset)) = arg.rsplit_once('@') {
        if let Ok(seconds) = offset.trim().parse::<f64>() {
            if !path.is_empty() {
                return (path, seconds);
            }
        }
    }
    (arg, 0.0)
}
