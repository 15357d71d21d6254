//! Track library for Slammer - records, result cache, store and manifest

mod cache;
mod config;
mod manifest;
mod record;
mod store;

pub use cache::{AnalysisCache, DEFAULT_TTL};
pub use config::{Config, DEFAULT_ARTIST};
pub use manifest::{ManifestError, TrackManifest, MANIFEST_FILENAME};
pub use record::{
    cue_points, title_from_filename, track_id, waveform_color, TrackRecord, WAVEFORM_COLORS,
};
pub use store::{StoreError, TrackStore};
