//! Tempo estimation by autocorrelation of an onset envelope
//!
//! The lag range is bounded by the BPM range: the fastest tempo gives the
//! shortest lag and the slowest tempo the longest (capped at half the
//! envelope). Peaks must be strict local maxima above a fixed noise floor.

use crate::onset::OnsetEnvelope;
use tracing::trace;

/// Minimum normalized correlation for a lag to count as a peak
pub const NOISE_FLOOR: f32 = 0.1;

/// Number of peaks kept per estimate
pub const MAX_PEAKS: usize = 3;

/// BPM reported when no periodicity is found
pub const FALLBACK_BPM: f32 = 120.0;

/// A periodicity peak in the autocorrelation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoPeak {
    /// Lag in envelope frames
    pub lag: usize,
    pub bpm: f32,
    /// Overlap mean of lagged products over the full-length mean energy
    ///
    /// Close to 1 for a perfectly periodic envelope; can exceed 1 slightly
    /// because the two means run over different spans.
    pub correlation: f32,
}

/// Result of one tempo estimation run
#[derive(Debug, Clone, PartialEq)]
pub struct TempoEstimate {
    pub bpm: f32,
    /// 0-100
    pub confidence: u8,
    /// Strongest peaks first, at most `MAX_PEAKS`
    pub peaks: Vec<TempoPeak>,
}

impl TempoEstimate {
    /// The "nothing found" answer: 120 BPM at zero confidence
    pub fn fallback() -> Self {
        Self {
            bpm: FALLBACK_BPM,
            confidence: 0,
            peaks: Vec::new(),
        }
    }
}

/// Estimate the tempo of an onset envelope
///
/// `prominence_scale` converts peak prominence (how far the best peak rises
/// above the mean correlation of the lag range, relative to that mean) into
/// a 0-100 confidence.
pub fn estimate_tempo(
    envelope: &OnsetEnvelope,
    min_bpm: f32,
    max_bpm: f32,
    prominence_scale: f32,
) -> TempoEstimate {
    let onset = &envelope.values;
    let n = onset.len();
    if n < 3 || envelope.rate <= 0.0 || min_bpm <= 0.0 || max_bpm < min_bpm {
        return TempoEstimate::fallback();
    }

    let energy = onset.iter().map(|v| v * v).sum::<f32>() / n as f32;
    if energy <= 0.0 {
        return TempoEstimate::fallback();
    }

    let frames_per_minute = 60.0 * envelope.rate;
    // Round inwards so every lag in range maps to a tempo within the BPM range
    let min_lag = ((frames_per_minute / max_bpm).ceil() as usize).max(1);
    let max_lag = ((frames_per_minute / min_bpm).floor() as usize).min(n / 2);
    if min_lag > max_lag {
        return TempoEstimate::fallback();
    }

    // Correlations for min_lag-1 ..= max_lag+1 so every lag in range has neighbours
    let first = min_lag - 1;
    let last = (max_lag + 1).min(n - 1);
    let correlations: Vec<f32> = (first..=last)
        .map(|lag| correlation_at_lag(onset, lag) / energy)
        .collect();
    let r = |lag: usize| correlations[lag - first];

    let mut peaks: Vec<TempoPeak> = (min_lag..=max_lag.min(last - 1))
        .filter(|&lag| {
            let c = r(lag);
            c > NOISE_FLOOR && c > r(lag - 1) && c > r(lag + 1)
        })
        .map(|lag| TempoPeak {
            lag,
            bpm: frames_per_minute / lag as f32,
            correlation: r(lag),
        })
        .collect();

    peaks.sort_by(|a, b| b.correlation.total_cmp(&a.correlation));
    peaks.truncate(MAX_PEAKS);

    let Some(best) = peaks.first().copied() else {
        return TempoEstimate::fallback();
    };

    let range_len = (max_lag - min_lag + 1) as f32;
    let mean = (min_lag..=max_lag).map(r).sum::<f32>() / range_len;
    let prominence = if mean > 0.0 {
        (best.correlation - mean) / mean
    } else {
        0.0
    };
    let confidence = (prominence * prominence_scale).round().clamp(0.0, 100.0) as u8;

    trace!(
        peaks = ?peaks.iter().map(|p| p.bpm).collect::<Vec<_>>(),
        prominence,
        confidence,
        "autocorrelation peaks"
    );

    TempoEstimate {
        bpm: best.bpm,
        confidence,
        peaks,
    }
}

/// Mean of `onset[i] * onset[i + lag]` over the overlapping part
fn correlation_at_lag(onset: &[f32], lag: usize) -> f32 {
    if lag >= onset.len() {
        return 0.0;
    }
    let overlap = onset.len() - lag;
    let sum: f32 = onset[..overlap]
        .iter()
        .zip(&onset[lag..])
        .map(|(a, b)| a * b)
        .sum();
    sum / overlap as f32
}
