//! Detection result

use crate::camelot::MusicalKey;
use crate::ensemble::BpmCandidate;
use crate::key::KeyCandidate;
use serde::{Deserialize, Serialize};

/// Everything one analysis call learned about a track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    /// Consensus tempo
    pub bpm: f32,
    /// 0-100
    pub bpm_confidence: u8,
    /// One per ensemble detector, in detector order
    pub bpm_candidates: Vec<BpmCandidate>,
    /// The strongest single detector was overruled by the consensus
    pub bpm_adjusted: bool,
    /// That detector's raw tempo, when overruled
    pub original_bpm: Option<f32>,
    /// Best key, `None` when key detection was skipped
    pub key: Option<MusicalKey>,
    /// 0-100
    pub key_confidence: u8,
    /// Top-ranked keys, at most five
    pub key_candidates: Vec<KeyCandidate>,
    /// Surface to a human before trusting the labels
    pub needs_verification: bool,
    /// Which confidences fell below the threshold
    pub verification_reason: Option<String>,
    pub detection_time_ms: u64,
}

impl DetectionResult {
    /// Camelot code of the detected key, e.g. "8A"
    pub fn camelot_code(&self) -> Option<String> {
        self.key.map(|k| k.camelot_code())
    }

    /// BPM rounded for display and tagging
    pub fn rounded_bpm(&self) -> u32 {
        self.bpm.round().max(0.0) as u32
    }

    /// Same result with the timing field cleared, for comparing runs
    pub fn without_timing(&self) -> Self {
        Self {
            detection_time_ms: 0,
            ..self.clone()
        }
    }
}
