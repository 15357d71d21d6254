//! BPM consensus across ensemble candidates
//!
//! Candidates are folded into one octave band so half-time and double-time
//! detections vote together, clustered with a ±2 BPM tolerance, and the
//! bucket with the largest summed confidence wins. The band defaults to
//! 80-160 and follows the caller's BPM range when that range excludes it.

use crate::ensemble::BpmCandidate;
use crate::tempo::FALLBACK_BPM;
use tracing::debug;

/// Lower edge of the default tempo band
pub const BAND_LOW: f32 = 80.0;
/// Upper edge of the default tempo band
pub const BAND_HIGH: f32 = 160.0;
/// Default ceiling for doubling
const DOUBLE_LIMIT: f32 = 200.0;
/// Default floor for halving
const HALVE_LIMIT: f32 = 60.0;

/// Clustering tolerance in BPM
pub const TOLERANCE: f32 = 2.0;

/// Final tempo decision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Consensus {
    pub bpm: f32,
    /// 0-100
    pub confidence: u8,
    /// The strongest single detector was overruled
    pub adjusted: bool,
    /// That detector's raw BPM, when overruled
    pub original_bpm: Option<f32>,
    /// Summed confidence of the winning bucket
    pub winning_weight: u32,
}

/// Octave band that candidates are folded into
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoBand {
    /// Values below this are doubled
    pub low: f32,
    /// Values above this are halved
    pub high: f32,
    /// Halving never goes below this
    pub floor: f32,
    /// Doubling never goes above this
    pub ceiling: f32,
}

impl Default for TempoBand {
    fn default() -> Self {
        Self {
            low: BAND_LOW,
            high: BAND_HIGH,
            floor: HALVE_LIMIT,
            ceiling: DOUBLE_LIMIT,
        }
    }
}

impl TempoBand {
    /// Band for a caller's BPM range
    ///
    /// Keeps the default octave where the range allows it and otherwise
    /// shifts it inside the range. 60-200 gives the default band.
    pub fn for_range(min_bpm: f32, max_bpm: f32) -> Self {
        if !(min_bpm > 0.0 && max_bpm > min_bpm) {
            return Self::default();
        }
        let low = BAND_LOW.clamp(min_bpm, min_bpm.max(max_bpm / 2.0));
        Self {
            low,
            high: low * 2.0,
            floor: min_bpm,
            ceiling: max_bpm,
        }
    }

    /// Fold a BPM into the band by doubling or halving
    ///
    /// Doubling stops at the ceiling and halving at the floor, so values far
    /// outside the band can land near its edges.
    pub fn fold(&self, bpm: f32) -> f32 {
        if !bpm.is_finite() || bpm <= 0.0 {
            return bpm;
        }
        let mut b = bpm;
        while b < self.low && b * 2.0 <= self.ceiling {
            b *= 2.0;
        }
        while b > self.high && b / 2.0 >= self.floor {
            b /= 2.0;
        }
        b
    }
}

#[derive(Debug, Clone)]
struct Bucket {
    center: f32,
    weight: u32,
}

/// Fold a BPM into the default 80-160 band
pub fn normalize_bpm(bpm: f32) -> f32 {
    TempoBand::default().fold(bpm)
}

/// Whether two tempos are the same up to a half/double-time relation
pub fn is_octave_equivalent(a: f32, b: f32, tolerance: f32) -> bool {
    let na = normalize_bpm(a);
    let nb = normalize_bpm(b);
    // The band is half-open in spirit: 80 and 160 are one octave apart
    (na - nb).abs() <= tolerance
        || (na * 2.0 - nb).abs() <= tolerance
        || (nb * 2.0 - na).abs() <= tolerance
}

/// Resolve the ensemble candidates into one tempo in the default band
pub fn resolve(candidates: &[BpmCandidate]) -> Consensus {
    resolve_in(candidates, &TempoBand::default())
}

/// Resolve the ensemble candidates into one tempo within `band`
pub fn resolve_in(candidates: &[BpmCandidate], band: &TempoBand) -> Consensus {
    if candidates.is_empty() {
        return Consensus {
            bpm: FALLBACK_BPM,
            confidence: 0,
            adjusted: false,
            original_bpm: None,
            winning_weight: 0,
        };
    }

    let mut buckets: Vec<Bucket> = Vec::new();
    for candidate in candidates {
        let folded = band.fold(candidate.bpm).round();

        let nearest = buckets
            .iter()
            .enumerate()
            .map(|(i, b)| (i, (b.center - folded).abs()))
            .filter(|&(_, distance)| distance <= TOLERANCE)
            .fold(None, |best: Option<(usize, f32)>, (i, distance)| match best {
                Some((_, d)) if d <= distance => best,
                _ => Some((i, distance)),
            });

        match nearest {
            Some((i, _)) => buckets[i].weight += candidate.confidence as u32,
            None => buckets.push(Bucket {
                center: folded,
                weight: candidate.confidence as u32,
            }),
        }
    }

    let mut winner = &buckets[0];
    for bucket in &buckets[1..] {
        if bucket.weight > winner.weight {
            winner = bucket;
        }
    }

    // Strongest single detector, earliest on ties
    let mut strongest = &candidates[0];
    for candidate in &candidates[1..] {
        if candidate.confidence > strongest.confidence {
            strongest = candidate;
        }
    }
    let adjusted = (strongest.bpm - winner.center).abs() > TOLERANCE;

    let scale = (candidates.len() * 100) as f32;
    let confidence = (winner.weight as f32 / scale * 150.0).round().min(100.0) as u8;

    debug!(
        buckets = ?buckets.iter().map(|b| (b.center, b.weight)).collect::<Vec<_>>(),
        bpm = winner.center,
        confidence,
        adjusted,
        "BPM consensus"
    );

    Consensus {
        bpm: winner.center,
        confidence,
        adjusted,
        original_bpm: adjusted.then_some(strongest.bpm),
        winning_weight: winner.weight,
    }
}
