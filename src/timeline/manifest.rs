//! Session manifests.
//!
//! A manifest records which files make up a session and where each one sits
//! on the timeline. Decoded samples are never stored; clips are decoded
//! again when the manifest is loaded.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One clip entry in a manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipEntry {
    /// Path to the clip file, absolute or relative to the manifest.
    pub path: String,

    /// Offset in seconds from the start of the composition.
    #[serde(default)]
    pub start_time: f64,
}

/// Serializable description of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionManifest {
    /// Session name.
    pub name: String,

    /// Sample rate every clip must be recorded at.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Clips in track order.
    #[serde(default)]
    pub clips: Vec<ClipEntry>,
}

fn default_sample_rate() -> u32 {
    crate::audio::SAMPLE_RATE
}

impl SessionManifest {
    /// Serializes the manifest to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parses a manifest from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Writes the manifest, choosing JSON for `.json` paths and bincode otherwise.
    ///
    /// # Errors
    ///
    /// Returns error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let data = if is_json(path) {
            self.to_json()
                .context("Failed to serialize session manifest")?
                .into_bytes()
        } else {
            bincode::serialize(self).context("Failed to serialize session manifest")?
        };
        fs::write(path, data)
            .with_context(|| format!("Failed to write session manifest: {}", path.display()))?;
        tracing::info!(path = %path.display(), clips = self.clips.len(), "Saved session manifest");
        Ok(())
    }

    /// Reads a manifest written by [`SessionManifest::save`].
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path)
            .with_context(|| format!("Failed to read session manifest: {}", path.display()))?;
        let manifest = if is_json(path) {
            let text = String::from_utf8(data).context("Session manifest is not UTF-8")?;
            Self::from_json(&text).context("Failed to parse session manifest")?
        } else {
            bincode::deserialize(&data).context("Failed to parse session manifest")?
        };
        Ok(manifest)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}
