//! JSON manifest of a track library (`tracks-metadata.json`)

use crate::record::TrackRecord;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Conventional manifest filename next to the audio files
pub const MANIFEST_FILENAME: &str = "tracks-metadata.json";

/// Errors that can occur reading or writing a manifest
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Every track in a library, serialized as `{"tracks": [...]}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackManifest {
    pub tracks: Vec<TrackRecord>,
}

impl TrackManifest {
    pub fn new(tracks: Vec<TrackRecord>) -> Self {
        Self { tracks }
    }

    /// Write pretty-printed JSON, creating parent directories
    pub fn write_to(&self, path: &Path) -> Result<(), ManifestError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        info!(path = %path.display(), tracks = self.tracks.len(), "wrote track manifest");
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self, ManifestError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Find a track by id
    pub fn find(&self, id: &str) -> Option<&TrackRecord> {
        self.tracks.iter().find(|t| t.id == id)
    }
}
