//! Audio analysis for Slammer
//!
//! Infers tempo (BPM) and musical key from an in-memory block of mono
//! samples, each with a 0-100 confidence, for automatic track tagging.
//! Analysis is synchronous, deterministic and holds no state between calls.

mod camelot;
mod chroma;
mod config;
mod consensus;
mod detector;
mod ensemble;
mod error;
mod key;
mod onset;
mod result;
mod tempo;

pub use camelot::{CamelotKey, Mode, MusicalKey, PitchClass};
pub use chroma::{Chroma, ChromaExtractor};
pub use config::AnalysisOptions;
pub use consensus::{
    is_octave_equivalent, normalize_bpm, resolve, resolve_in, Consensus, TempoBand,
    TOLERANCE as BPM_TOLERANCE,
};
pub use detector::{analysis_window, analyze, BpmKeyDetector, MAX_KEY_CANDIDATES, MAX_WINDOW_SECS};
pub use ensemble::{inter_onset_tempo, pick_beats, run_ensemble, BpmCandidate, DetectionMethod};
pub use error::{AnalysisError, InputProblem};
pub use key::{rank_keys, KeyCandidate};
pub use onset::{onset_envelope, OnsetEnvelope, OnsetMethod};
pub use result::DetectionResult;
pub use tempo::{estimate_tempo, TempoEstimate, TempoPeak, FALLBACK_BPM};
