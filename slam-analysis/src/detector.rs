//! Detection pipeline: window, BPM ensemble and consensus, chroma and key
//!
//! The detector holds only its options. Every call validates its input,
//! slices at most 30 seconds from the middle of the buffer and runs the BPM
//! and key chains side by side on the rayon pool.

use crate::chroma::ChromaExtractor;
use crate::config::AnalysisOptions;
use crate::consensus::{self, Consensus, TempoBand};
use crate::ensemble::{run_ensemble, BpmCandidate};
use crate::error::{AnalysisError, InputProblem};
use crate::key::{rank_keys, KeyCandidate};
use crate::result::DetectionResult;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Longest stretch of audio analyzed per call
pub const MAX_WINDOW_SECS: usize = 30;

/// Key candidates kept in the result
pub const MAX_KEY_CANDIDATES: usize = 5;

/// Analyze a buffer with the given options
///
/// Shorthand for `BpmKeyDetector::new(options.clone()).analyze(..)`.
pub fn analyze(
    samples: &[f32],
    sample_rate: u32,
    options: &AnalysisOptions,
) -> Result<DetectionResult, AnalysisError> {
    BpmKeyDetector::new(options.clone()).analyze(samples, sample_rate)
}

/// Stateless BPM and key detector
#[derive(Debug, Clone, Default)]
pub struct BpmKeyDetector {
    options: AnalysisOptions,
}

impl BpmKeyDetector {
    pub fn new(options: AnalysisOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    /// Detect tempo and key of mono samples in [-1, 1]
    ///
    /// Fails only on unusable input. Inconclusive audio yields a result with
    /// zero confidence and `needs_verification` set.
    pub fn analyze(
        &self,
        samples: &[f32],
        sample_rate: u32,
    ) -> Result<DetectionResult, AnalysisError> {
        let start = Instant::now();

        if let Err(problem) = validate(samples, sample_rate, &self.options) {
            warn!(%problem, "rejecting analysis input");
            return Err(problem.into());
        }

        let window = analysis_window(samples, sample_rate);
        debug!(
            total = samples.len(),
            window = window.len(),
            sample_rate,
            "analysis window"
        );

        let min_bpm = self.options.min_bpm as f32;
        let max_bpm = self.options.max_bpm as f32;
        let skip_key = self.options.skip_key_detection;

        let ((bpm_candidates, tempo), key_candidates) = rayon::join(
            || {
                let candidates = run_ensemble(window, sample_rate, min_bpm, max_bpm);
                let band = TempoBand::for_range(min_bpm, max_bpm);
                let tempo = consensus::resolve_in(&candidates, &band);
                (candidates, tempo)
            },
            || {
                if skip_key {
                    Vec::new()
                } else {
                    let chroma = ChromaExtractor::new(sample_rate).extract(window);
                    rank_keys(&chroma)
                }
            },
        );

        let result = self.assemble(bpm_candidates, tempo, key_candidates, start);

        info!(
            bpm = result.bpm,
            bpm_confidence = result.bpm_confidence,
            key = ?result.key.map(|k| k.to_string()),
            key_confidence = result.key_confidence,
            elapsed_ms = result.detection_time_ms,
            "analysis complete"
        );
        if let Some(reason) = &result.verification_reason {
            warn!(%reason, "result needs verification");
        }

        Ok(result)
    }

    fn assemble(
        &self,
        bpm_candidates: Vec<BpmCandidate>,
        tempo: Consensus,
        mut key_candidates: Vec<KeyCandidate>,
        start: Instant,
    ) -> DetectionResult {
        let threshold = self.options.confidence_threshold;
        let key_enabled = !self.options.skip_key_detection;

        key_candidates.truncate(MAX_KEY_CANDIDATES);
        let top_key = key_candidates.first().copied();
        let key_confidence = top_key.map_or(0, |k| k.confidence);

        let mut reasons = Vec::new();
        if tempo.confidence < threshold {
            reasons.push(format!(
                "BPM confidence {}% below {}%",
                tempo.confidence, threshold
            ));
        }
        if key_enabled && key_confidence < threshold {
            reasons.push(format!(
                "key confidence {}% below {}%",
                key_confidence, threshold
            ));
        }

        DetectionResult {
            bpm: tempo.bpm,
            bpm_confidence: tempo.confidence,
            bpm_candidates,
            bpm_adjusted: tempo.adjusted,
            original_bpm: tempo.original_bpm,
            key: top_key.map(|k| k.key),
            key_confidence,
            key_candidates,
            needs_verification: !reasons.is_empty(),
            verification_reason: (!reasons.is_empty()).then(|| reasons.join("; ")),
            detection_time_ms: start.elapsed().as_millis() as u64,
        }
    }
}

/// At most `MAX_WINDOW_SECS` of audio, centered in the buffer
pub fn analysis_window(samples: &[f32], sample_rate: u32) -> &[f32] {
    let max_len = sample_rate as usize * MAX_WINDOW_SECS;
    if samples.len() <= max_len {
        return samples;
    }
    let start = (samples.len() - max_len) / 2;
    &samples[start..start + max_len]
}

fn validate(
    samples: &[f32],
    sample_rate: u32,
    options: &AnalysisOptions,
) -> Result<(), InputProblem> {
    options.validate()?;
    if sample_rate == 0 {
        return Err(InputProblem::ZeroSampleRate);
    }
    if samples.is_empty() {
        return Err(InputProblem::EmptyBuffer);
    }
    if let Some(index) = samples.iter().position(|s| !s.is_finite()) {
        return Err(InputProblem::NonFiniteSample { index });
    }
    Ok(())
}
