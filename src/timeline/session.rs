//! Composition session.
//!
//! A session owns the tracks of one composition and a memoized mix of them.
//! Every change to the track set bumps a version counter and drops the cached
//! mix in the same call, so `mixed()` never hands out a mix of an older track
//! set. Mutation takes `&mut self`; to share a session across threads wrap it
//! in `Arc<Mutex<Session>>`.

use super::manifest::{ClipEntry, SessionManifest};
use super::track::{Track, TrackId};
use crate::audio::{decode_file, encode, mix, AudioBuffer, DecodeError, EncodedAudio, SAMPLE_RATE};
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A mix together with the track-set version it was computed from.
#[derive(Debug)]
struct MixCache {
    version: u64,
    buffer: Arc<AudioBuffer>,
}

/// One composition: its tracks, sample rate, and cached mix.
#[derive(Debug)]
pub struct Session {
    /// Session name.
    pub name: String,

    /// Sample rate every clip must share.
    sample_rate: u32,

    /// Tracks in the order they were added.
    tracks: Vec<Track>,

    /// Incremented on every track-set change.
    version: u64,

    /// Last computed mix, if any.
    mix_cache: Option<MixCache>,
}

impl Session {
    /// Creates an empty session at the default sample rate.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_sample_rate(name, SAMPLE_RATE)
    }

    /// Creates an empty session at a specific sample rate.
    pub fn with_sample_rate(name: impl Into<String>, sample_rate: u32) -> Self {
        Self {
            name: name.into(),
            sample_rate,
            tracks: Vec::new(),
            version: 0,
            mix_cache: None,
        }
    }

    /// Returns the session sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns the track-set version. Changes whenever tracks are added,
    /// removed, or moved.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Marks the track set as changed and drops the cached mix.
    fn invalidate(&mut self) {
        self.version += 1;
        self.mix_cache = None;
    }

    /// Returns true if the next `mixed()` call will recompute.
    pub fn is_mix_stale(&self) -> bool {
        self.mix_cache
            .as_ref()
            .is_none_or(|cache| cache.version != self.version)
    }

    /// Adds a track to the session.
    ///
    /// # Returns
    ///
    /// The TrackId of the added track
    ///
    /// # Errors
    ///
    /// Returns `SampleRateMismatch` if the clip is not at the session's
    /// sample rate. The session is unchanged on error.
    pub fn add_track(&mut self, track: Track) -> Result<TrackId, DecodeError> {
        let found = track.buffer().sample_rate();
        if found != self.sample_rate {
            return Err(DecodeError::SampleRateMismatch {
                expected: self.sample_rate,
                found,
            });
        }
        let id = track.id;
        self.tracks.push(track);
        self.invalidate();
        Ok(id)
    }

    /// Creates a track from an already decoded clip and adds it.
    ///
    /// # Errors
    ///
    /// Returns `SampleRateMismatch` if the clip is not at the session's
    /// sample rate.
    pub fn add_clip(
        &mut self,
        name: impl Into<String>,
        buffer: AudioBuffer,
        start_time: f64,
    ) -> Result<TrackId, DecodeError> {
        self.add_track(Track::new(name, buffer, start_time))
    }

    /// Decodes a WAV file and adds it as a track.
    ///
    /// The track is named after the file stem and remembers the file's
    /// absolute path so it can be written to a manifest.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or decoded at the session's
    /// sample rate. The session is unchanged on error.
    pub fn add_clip_from_file<P: AsRef<Path>>(
        &mut self,
        path: P,
        start_time: f64,
    ) -> Result<TrackId, DecodeError> {
        let track = load_track(path.as_ref(), start_time, self.sample_rate)?;
        self.add_track(track)
    }

    /// Removes a track by its ID.
    ///
    /// # Returns
    ///
    /// The removed track, or None if not found
    pub fn remove_track(&mut self, id: TrackId) -> Option<Track> {
        let pos = self.tracks.iter().position(|t| t.id == id)?;
        let track = self.tracks.remove(pos);
        self.invalidate();
        Some(track)
    }

    /// Moves a track to a new start time.
    ///
    /// Negative or non-finite offsets clamp to 0.
    ///
    /// # Returns
    ///
    /// true if the track was found
    pub fn set_start_time(&mut self, id: TrackId, seconds: f64) -> bool {
        let Some(track) = self.tracks.iter_mut().find(|t| t.id == id) else {
            return false;
        };
        track.set_start_time(seconds);
        self.invalidate();
        true
    }

    /// Removes every track.
    pub fn clear(&mut self) {
        self.tracks.clear();
        self.invalidate();
    }

    /// Returns all tracks in insertion order.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Returns a reference to a track by its ID.
    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    /// Returns the number of tracks.
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Returns the latest track end time in seconds, or 0 with no tracks.
    pub fn total_duration(&self) -> f64 {
        self.tracks
            .iter()
            .map(Track::end_time)
            .fold(0.0_f64, f64::max)
    }

    /// Returns the stereo mix of the current tracks.
    ///
    /// Computed on first use after any change, then reused until the track
    /// set changes again.
    pub fn mixed(&mut self) -> Arc<AudioBuffer> {
        if let Some(cache) = &self.mix_cache {
            if cache.version == self.version {
                return Arc::clone(&cache.buffer);
            }
        }

        let buffer = Arc::new(mix(&self.tracks, self.sample_rate));
        tracing::debug!(version = self.version, "Recomputed session mix");
        self.mix_cache = Some(MixCache {
            version: self.version,
            buffer: Arc::clone(&buffer),
        });
        buffer
    }

    /// Encodes the current mix as WAV. The bytes are not cached.
    pub fn export_wav(&mut self) -> EncodedAudio {
        encode(&self.mixed())
    }

    /// Encodes the current mix and writes it to a WAV file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written.
    pub fn export_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.export_wav().write_to_file(path)
    }

    /// Describes the session's file-backed tracks as a manifest.
    ///
    /// Tracks without a source path (built from in-memory buffers) are
    /// skipped since they cannot be reloaded.
    pub fn to_manifest(&self) -> SessionManifest {
        SessionManifest {
            name: self.name.clone(),
            sample_rate: self.sample_rate,
            clips: self
                .tracks
                .iter()
                .filter_map(|t| {
                    t.source_path.as_ref().map(|path| ClipEntry {
                        path: path.clone(),
                        start_time: t.start_time(),
                    })
                })
                .collect(),
        }
    }

    /// Rebuilds a session from a manifest, decoding every clip.
    ///
    /// Clips are decoded in parallel; track order follows the manifest.
    /// Relative clip paths are resolved against `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns error if any clip fails to decode.
    pub fn from_manifest(manifest: &SessionManifest, base_dir: &Path) -> Result<Self> {
        let tracks = manifest
            .clips
            .par_iter()
            .map(|clip| {
                let path = resolve_clip_path(base_dir, &clip.path);
                load_track(&path, clip.start_time, manifest.sample_rate)
                    .with_context(|| format!("Failed to load clip: {}", path.display()))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut session = Self::with_sample_rate(&manifest.name, manifest.sample_rate);
        for track in tracks {
            session.add_track(track)?;
        }
        tracing::info!(
            name = %session.name,
            tracks = session.track_count(),
            "Loaded session"
        );
        Ok(session)
    }

    /// Loads a manifest file (JSON or binary, by extension) and decodes its clips.
    ///
    /// # Errors
    ///
    /// Returns error if the manifest cannot be read or any clip fails to decode.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let manifest = SessionManifest::load(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_manifest(&manifest, base_dir)
    }

    /// Writes the session manifest (JSON or binary, by extension).
    ///
    /// # Errors
    ///
    /// Returns error if serialization or file writing fails.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_manifest().save(path)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new("Untitled Session")
    }
}

/// Decodes a clip file into a named track.
fn load_track(path: &Path, start_time: f64, sample_rate: u32) -> Result<Track, DecodeError> {
    let buffer = decode_file(path, sample_rate)?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Clip")
        .to_string();
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    Ok(Track::new(name, buffer, start_time)
        .with_source_path(absolute.to_string_lossy().into_owned()))
}

fn resolve_clip_path(base_dir: &Path, clip_path: &str) -> PathBuf {
    let path = Path::new(clip_path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{SampleFormat, WavSpec, WavWriter};
    use std::sync::Mutex;

    const RATE: u32 = 100;

    fn mono(samples: &[f32]) -> AudioBuffer {
        AudioBuffer::from_channels(RATE, vec![samples.to_vec()])
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("trackmix-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_wav(path: &Path, sample_rate: u32, samples: &[i16]) {
        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_session_creation() {
        let session = Session::new("Test");
        assert_eq!(session.name, "Test");
        assert_eq!(session.sample_rate(), SAMPLE_RATE);
        assert_eq!(session.track_count(), 0);
        assert_eq!(session.total_duration(), 0.0);
    }

    #[test]
    fn test_empty_session_mixes_to_silence() {
        let mut session = Session::with_sample_rate("Empty", RATE);
        let mixed = session.mixed();
        assert_eq!(mixed.channel_count(), 2);
        assert_eq!(mixed.frame_count(), RATE as usize);
    }

    #[test]
    fn test_mix_is_cached_until_change() {
        let mut session = Session::with_sample_rate("Test", RATE);
        session.add_clip("a", mono(&[0.5]), 0.0).unwrap();
        assert!(session.is_mix_stale());

        let first = session.mixed();
        assert!(!session.is_mix_stale());
        let second = session.mixed();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_add_invalidates_mix() {
        let mut session = Session::with_sample_rate("Test", RATE);
        session.add_clip("a", mono(&[0.5]), 0.0).unwrap();
        let before = session.mixed();
        assert_eq!(before.sample(0, 0), Some(0.5));

        session.add_clip("b", mono(&[0.25]), 0.0).unwrap();
        assert!(session.is_mix_stale());
        let after = session.mixed();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.sample(0, 0), Some(0.75));
    }

    #[test]
    fn test_remove_invalidates_mix() {
        let mut session = Session::with_sample_rate("Test", RATE);
        session.add_clip("a", mono(&[0.5]), 0.0).unwrap();
        let b = session.add_clip("b", mono(&[0.25, 0.25]), 0.0).unwrap();
        assert_eq!(session.mixed().frame_count(), 2);

        let removed = session.remove_track(b).unwrap();
        assert_eq!(removed.name, "b");
        let mixed = session.mixed();
        assert_eq!(mixed.frame_count(), 1);
        assert_eq!(mixed.sample(1, 0), Some(0.5));

        assert!(session.remove_track(b).is_none());
    }

    #[test]
    fn test_move_invalidates_mix() {
        let mut session = Session::with_sample_rate("Test", RATE);
        let id = session.add_clip("a", mono(&[1.0]), 0.0).unwrap();
        assert_eq!(session.mixed().frame_count(), 1);

        let version = session.version();
        assert!(session.set_start_time(id, 1.0));
        assert!(session.version() > version);

        let mixed = session.mixed();
        assert_eq!(mixed.frame_count(), RATE as usize + 1);
        assert_eq!(mixed.sample(0, RATE as usize), Some(1.0));
        assert_eq!(mixed.sample(0, 0), Some(0.0));
    }

    #[test]
    fn test_set_start_time_clamps_and_reports_missing() {
        let mut session = Session::with_sample_rate("Test", RATE);
        let id = session.add_clip("a", mono(&[1.0]), 2.0).unwrap();
        assert!(session.set_start_time(id, -5.0));
        assert_eq!(session.track(id).unwrap().start_time(), 0.0);
        assert!(!session.set_start_time(TrackId::new(), 1.0));
    }

    #[test]
    fn test_clear() {
        let mut session = Session::with_sample_rate("Test", RATE);
        session.add_clip("a", mono(&[1.0; 300]), 0.0).unwrap();
        assert_eq!(session.mixed().frame_count(), 300);
        session.clear();
        assert_eq!(session.track_count(), 0);
        // Back to the one-second silent fallback
        assert_eq!(session.mixed().frame_count(), RATE as usize);
    }

    #[test]
    fn test_total_duration() {
        let mut session = Session::with_sample_rate("Test", RATE);
        session.add_clip("a", mono(&[0.0; 50]), 1.0).unwrap();
        session.add_clip("b", mono(&[0.0; 100]), 0.0).unwrap();
        assert!((session.total_duration() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_export_wav_is_deterministic() {
        let mut session = Session::with_sample_rate("Test", RATE);
        session.add_clip("a", mono(&[0.5, -0.5]), 0.0).unwrap();
        let first = session.export_wav();
        let second = session.export_wav();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2 * 2 * 2 + 44);
    }

    #[test]
    fn test_shared_across_threads() {
        let session = Arc::new(Mutex::new(Session::with_sample_rate("Shared", RATE)));
        let writer = {
            let session = Arc::clone(&session);
            std::thread::spawn(move || {
                session.lock().unwrap().add_clip("a", mono(&[0.5; 10]), 0.0).unwrap();
            })
        };
        writer.join().unwrap();
        let mixed = session.lock().unwrap().mixed();
        assert_eq!(mixed.frame_count(), 10);
    }

    #[test]
    fn test_add_clip_from_file() {
        let dir = scratch_dir("add-clip");
        let path = dir.join("snare.wav");
        write_wav(&path, RATE, &[16384, 16384]);

        let mut session = Session::with_sample_rate("Test", RATE);
        let id = session.add_clip_from_file(&path, 0.5).unwrap();
        let track = session.track(id).unwrap();
        assert_eq!(track.name, "snare");
        assert!(track.source_path.as_deref().unwrap().ends_with("snare.wav"));
        assert_eq!(session.mixed().sample(1, 50), Some(0.5));

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_add_clip_from_file_rejects_other_rate() {
        let dir = scratch_dir("rate");
        let path = dir.join("fast.wav");
        write_wav(&path, RATE * 2, &[0, 0]);

        let mut session = Session::with_sample_rate("Test", RATE);
        let version = session.version();
        let err = session.add_clip_from_file(&path, 0.0).unwrap_err();
        assert!(matches!(err, DecodeError::SampleRateMismatch { .. }));
        assert_eq!(session.track_count(), 0);
        assert_eq!(session.version(), version);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_add_clip_rejects_other_rate() {
        let mut session = Session::with_sample_rate("Test", RATE);
        session.add_clip("a", mono(&[0.5]), 0.0).unwrap();
        session.mixed();
        let version = session.version();

        let fast = AudioBuffer::from_channels(RATE * 2, vec![vec![1.0; 100]]);
        let err = session.add_clip("fast", fast, 0.0).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::SampleRateMismatch {
                expected: RATE,
                found
            } if found == RATE * 2
        ));
        assert_eq!(session.track_count(), 1);
        assert_eq!(session.version(), version);
        assert!(!session.is_mix_stale());
        assert_eq!(session.mixed().frame_count(), 1);
    }

    #[test]
    fn test_manifest_round_trip_through_files() {
        let dir = scratch_dir("manifest");
        write_wav(&dir.join("one.wav"), RATE, &[8192; 10]);
        write_wav(&dir.join("two.wav"), RATE, &[-8192; 20]);

        let mut session = Session::with_sample_rate("Demo", RATE);
        session.add_clip_from_file(dir.join("one.wav"), 0.25).unwrap();
        session.add_clip_from_file(dir.join("two.wav"), 1.0).unwrap();
        session.add_clip("in-memory", mono(&[1.0]), 0.0).unwrap();

        let manifest_path = dir.join("demo.json");
        session.save_to_file(&manifest_path).unwrap();

        let mut loaded = Session::load_from_file(&manifest_path).unwrap();
        assert_eq!(loaded.name, "Demo");
        assert_eq!(loaded.sample_rate(), RATE);
        // The in-memory clip has no source and is not persisted
        assert_eq!(loaded.track_count(), 2);
        assert_eq!(loaded.tracks()[0].name, "one");
        assert_eq!(loaded.tracks()[0].start_time(), 0.25);
        assert_eq!(loaded.tracks()[1].name, "two");
        assert_eq!(loaded.tracks()[1].start_time(), 1.0);
        assert_eq!(loaded.mixed().frame_count(), 120);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_from_manifest_resolves_relative_paths() {
        let dir = scratch_dir("relative");
        write_wav(&dir.join("clip.wav"), RATE, &[0; 5]);

        let manifest = SessionManifest {
            name: "Rel".to_string(),
            sample_rate: RATE,
            clips: vec![ClipEntry {
                path: "clip.wav".to_string(),
                start_time: 0.0,
            }],
        };
        let session = Session::from_manifest(&manifest, &dir).unwrap();
        assert_eq!(session.track_count(), 1);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_from_manifest_missing_clip_fails() {
        let manifest = SessionManifest {
            name: "Broken".to_string(),
            sample_rate: RATE,
            clips: vec![ClipEntry {
                path: "/nonexistent/trackmix/missing.wav".to_string(),
                start_time: 0.0,
            }],
        };
        let err = Session::from_manifest(&manifest, Path::new(".")).unwrap_err();
        assert!(err.to_string().contains("missing.wav"));
    }
}
