//! BPM ensemble: five complementary tempo detectors over the same window
//!
//! | run | onset function     | window | favours        |
//! |-----|--------------------|--------|----------------|
//! | 1   | RMS flux           | 1024   | fast tempos    |
//! | 2   | RMS flux           | 2048   | medium tempos  |
//! | 3   | RMS flux           | 4096   | slow tempos    |
//! | 4   | bass spectral flux | 2048   | kick patterns  |
//! | 5   | inter-onset IOI    | 1024   | discrete beats |
//!
//! Runs 1-4 are autocorrelation estimates and execute on the rayon pool.
//! Run 5 reuses the envelope from run 1. Candidates always come back in the
//! order above, whatever the scheduling.

use crate::onset::{onset_envelope, OnsetEnvelope, OnsetMethod};
use crate::tempo::{estimate_tempo, FALLBACK_BPM};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Confidence per unit of peak prominence for RMS-flux runs
pub const RMS_PROMINENCE_SCALE: f32 = 25.0;

/// Confidence per unit of peak prominence for the spectral-flux run
pub const SPECTRAL_PROMINENCE_SCALE: f32 = 30.0;

/// Envelope level a local maximum must exceed to count as a beat
pub const BEAT_THRESHOLD: f32 = 0.3;

/// Inter-onset histogram resolution (10 ms)
const IOI_BUCKETS_PER_SECOND: f32 = 100.0;

/// Which detector produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectionMethod {
    AutocorrSmall,
    AutocorrMedium,
    AutocorrLarge,
    SpectralFlux,
    InterOnset,
}

/// One detector's tempo opinion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BpmCandidate {
    pub bpm: f32,
    /// 0-100
    pub confidence: u8,
    pub method: DetectionMethod,
    pub window_size: usize,
}

struct AutocorrRun {
    method: DetectionMethod,
    onset: OnsetMethod,
    window_size: usize,
    prominence_scale: f32,
}

const AUTOCORR_RUNS: [AutocorrRun; 4] = [
    AutocorrRun {
        method: DetectionMethod::AutocorrSmall,
        onset: OnsetMethod::RmsFlux,
        window_size: 1024,
        prominence_scale: RMS_PROMINENCE_SCALE,
    },
    AutocorrRun {
        method: DetectionMethod::AutocorrMedium,
        onset: OnsetMethod::RmsFlux,
        window_size: 2048,
        prominence_scale: RMS_PROMINENCE_SCALE,
    },
    AutocorrRun {
        method: DetectionMethod::AutocorrLarge,
        onset: OnsetMethod::RmsFlux,
        window_size: 4096,
        prominence_scale: RMS_PROMINENCE_SCALE,
    },
    AutocorrRun {
        method: DetectionMethod::SpectralFlux,
        onset: OnsetMethod::SpectralFlux,
        window_size: 2048,
        prominence_scale: SPECTRAL_PROMINENCE_SCALE,
    },
];

/// Run all five detectors and return their candidates in fixed order
pub fn run_ensemble(
    samples: &[f32],
    sample_rate: u32,
    min_bpm: f32,
    max_bpm: f32,
) -> Vec<BpmCandidate> {
    let runs: Vec<(OnsetEnvelope, BpmCandidate)> = AUTOCORR_RUNS
        .par_iter()
        .map(|run| {
            let envelope = onset_envelope(samples, sample_rate, run.window_size, run.onset);
            let estimate = estimate_tempo(&envelope, min_bpm, max_bpm, run.prominence_scale);
            let candidate = BpmCandidate {
                bpm: estimate.bpm,
                confidence: estimate.confidence,
                method: run.method,
                window_size: run.window_size,
            };
            (envelope, candidate)
        })
        .collect();

    let mut candidates: Vec<BpmCandidate> = runs.iter().map(|(_, c)| *c).collect();

    let (ioi_bpm, ioi_confidence) = inter_onset_tempo(&runs[0].0, min_bpm, max_bpm);
    candidates.push(BpmCandidate {
        bpm: ioi_bpm,
        confidence: ioi_confidence,
        method: DetectionMethod::InterOnset,
        window_size: AUTOCORR_RUNS[0].window_size,
    });

    for c in &candidates {
        debug!(
            method = ?c.method,
            window = c.window_size,
            bpm = c.bpm,
            confidence = c.confidence,
            "ensemble candidate"
        );
    }

    candidates
}

/// Beat positions (envelope frame indices): local maxima above the threshold
pub fn pick_beats(envelope: &OnsetEnvelope) -> Vec<usize> {
    let o = &envelope.values;
    if o.len() < 3 {
        return Vec::new();
    }
    (1..o.len() - 1)
        .filter(|&i| o[i] > BEAT_THRESHOLD && o[i] > o[i - 1] && o[i] >= o[i + 1])
        .collect()
}

/// Tempo from the modal inter-beat interval
///
/// Returns `(bpm, confidence)`, with confidence the share of in-range
/// intervals that fell into the modal 10 ms bucket.
pub fn inter_onset_tempo(envelope: &OnsetEnvelope, min_bpm: f32, max_bpm: f32) -> (f32, u8) {
    if envelope.rate <= 0.0 {
        return (FALLBACK_BPM, 0);
    }

    let beats = pick_beats(envelope);
    let mut histogram: BTreeMap<u32, u32> = BTreeMap::new();
    let mut kept = 0u32;

    for pair in beats.windows(2) {
        let interval = (pair[1] - pair[0]) as f32 / envelope.rate;
        let bpm = 60.0 / interval;
        if bpm < min_bpm || bpm > max_bpm {
            continue;
        }
        let bucket = (interval * IOI_BUCKETS_PER_SECOND).round() as u32;
        *histogram.entry(bucket).or_insert(0) += 1;
        kept += 1;
    }

    // Lowest bucket wins ties
    let mut mode: Option<(u32, u32)> = None;
    for (&bucket, &count) in &histogram {
        if mode.map_or(true, |(_, best)| count > best) {
            mode = Some((bucket, count));
        }
    }

    match mode {
        Some((bucket, count)) if bucket > 0 => {
            let bpm = 60.0 * IOI_BUCKETS_PER_SECOND / bucket as f32;
            let confidence = (count as f32 / kept as f32 * 100.0).round() as u8;
            (bpm, confidence)
        }
        _ => (FALLBACK_BPM, 0),
    }
}
