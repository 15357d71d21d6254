//! Key detection by chroma/profile correlation
//!
//! Implements key-finding via chroma correlation:
//! 1. Rotate the chroma vector so each of the 12 pitch classes becomes the tonic
//! 2. Pearson-correlate with the Krumhansl-Schmuckler major and minor profiles
//! 3. Rank all 24 keys and score how far each stands out from the field

use crate::camelot::MusicalKey;
use crate::chroma::Chroma;
use serde::{Deserialize, Serialize};

/// Krumhansl-Schmuckler major key profile
///
/// Index 0 = tonic.
const MAJOR_PROFILE: [f32; 12] = [
    6.35, // Tonic (I)
    2.23, // Minor 2nd
    3.48, // Major 2nd
    2.33, // Minor 3rd
    4.38, // Major 3rd
    4.09, // Perfect 4th
    2.52, // Tritone
    5.19, // Perfect 5th
    2.39, // Minor 6th
    3.66, // Major 6th
    2.29, // Minor 7th
    2.88, // Major 7th
];

/// Krumhansl-Schmuckler minor key profile
///
/// Index 0 = tonic.
const MINOR_PROFILE: [f32; 12] = [
    6.33, // Tonic (i)
    2.68, // Minor 2nd
    3.52, // Major 2nd
    5.38, // Minor 3rd
    2.60, // Major 3rd
    3.53, // Perfect 4th
    2.54, // Tritone
    4.75, // Perfect 5th
    3.98, // Minor 6th
    2.69, // Major 6th
    3.34, // Minor 7th
    3.17, // Major 7th
];

/// Largest bonus the top candidate gets for its lead over second place
const TOP_MARGIN_BOOST: f32 = 30.0;

/// Candidates at these ranks and above are excluded from the reference mean
const LEADING_RANKS: usize = 2;

/// One scored key hypothesis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyCandidate {
    pub key: MusicalKey,
    /// Pearson correlation with the key's profile, -1.0 to 1.0
    pub correlation: f32,
    /// 0-100
    pub confidence: u8,
}

/// Score all 24 keys against a chroma vector, best first
pub fn rank_keys(chroma: &Chroma) -> Vec<KeyCandidate> {
    let mut scored: Vec<(MusicalKey, f32)> = Vec::with_capacity(24);

    for root in 0..12 {
        let rotated = rotate_chroma(chroma, root);
        scored.push((MusicalKey::major(root), correlate(&rotated, &MAJOR_PROFILE)));
        scored.push((MusicalKey::minor(root), correlate(&rotated, &MINOR_PROFILE)));
    }

    // Stable: equal correlations keep enumeration order
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    let correlations: Vec<f32> = scored.iter().map(|&(_, c)| c).collect();
    let confidences = score_confidences(&correlations);

    scored
        .into_iter()
        .zip(confidences)
        .map(|((key, correlation), confidence)| KeyCandidate {
            key,
            correlation,
            confidence,
        })
        .collect()
}

/// Confidence from each candidate's separation above the trailing field
///
/// `correlations` must be sorted descending.
fn score_confidences(correlations: &[f32]) -> Vec<u8> {
    if correlations.len() <= LEADING_RANKS {
        return vec![0; correlations.len()];
    }

    let rest = &correlations[LEADING_RANKS..];
    let rest_mean = rest.iter().sum::<f32>() / rest.len() as f32;
    let span = 1.0 - rest_mean;
    if span <= 1e-6 {
        return vec![0; correlations.len()];
    }

    let margin = correlations[0] - correlations[1];
    let boost = (margin / span * 300.0).clamp(0.0, TOP_MARGIN_BOOST);

    correlations
        .iter()
        .enumerate()
        .map(|(rank, &c)| {
            let mut score = ((c - rest_mean) / span * 100.0).clamp(0.0, 100.0);
            if rank == 0 {
                score += boost;
            }
            score.round().min(100.0) as u8
        })
        .collect()
}

/// Rotate chroma so that the given pitch class becomes index 0
fn rotate_chroma(chroma: &Chroma, root: usize) -> [f32; 12] {
    let mut rotated = [0.0f32; 12];
    for (i, slot) in rotated.iter_mut().enumerate() {
        *slot = chroma[(i + root) % 12];
    }
    rotated
}

/// Pearson correlation coefficient between two 12-element vectors
///
/// Zero variance in either vector gives 0.0.
fn correlate(a: &[f32; 12], b: &[f32; 12]) -> f32 {
    let mean_a: f32 = a.iter().sum::<f32>() / 12.0;
    let mean_b: f32 = b.iter().sum::<f32>() / 12.0;

    let mut numerator = 0.0f32;
    let mut denom_a = 0.0f32;
    let mut denom_b = 0.0f32;

    for i in 0..12 {
        let da = a[i] - mean_a;
        let db = b[i] - mean_b;
        numerator += da * db;
        denom_a += da * da;
        denom_b += db * db;
    }

    let denom = (denom_a * denom_b).sqrt();
    if denom > 1e-10 {
        numerator / denom
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camelot::{Mode, PitchClass};

    #[test]
    fn test_rotate_chroma() {
        let chroma = [
            1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0,
        ];
        assert_eq!(rotate_chroma(&chroma, 0), chroma);

        let rotated = rotate_chroma(&chroma, 1);
        assert_eq!(rotated[0], 2.0);
        assert_eq!(rotated[11], 1.0);
    }

    #[test]
    fn test_correlate_perfect_and_inverse() {
        let a = [
            1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0,
        ];
        let mut b = a;
        b.reverse();
        assert!((correlate(&a, &a) - 1.0).abs() < 1e-5);
        assert!((correlate(&a, &b) + 1.0).abs() < 1e-5);
        assert_eq!(correlate(&a, &[3.0; 12]), 0.0);
    }

    #[test]
    fn test_ranks_all_24_keys() {
        let candidates = rank_keys(&[0.3, 0.1, 0.5, 0.2, 0.9, 0.4, 0.1, 1.0, 0.2, 0.6, 0.1, 0.3]);
        assert_eq!(candidates.len(), 24);
        assert!(candidates
            .windows(2)
            .all(|w| w[0].correlation >= w[1].correlation));
        assert!(candidates.iter().all(|c| c.confidence <= 100));
    }

    #[test]
    fn test_dominant_pitch_class_is_top_root() {
        for pc in 0..12 {
            let mut chroma = [0.0f32; 12];
            chroma[pc] = 1.0;
            let top = rank_keys(&chroma)[0];
            assert_eq!(top.key.root, PitchClass::from_index(pc));
        }
    }

    #[test]
    fn test_c_major_triad() {
        let mut chroma = [0.0f32; 12];
        for pc in [0, 4, 7] {
            chroma[pc] = 1.0;
        }
        let candidates = rank_keys(&chroma);
        assert_eq!(candidates[0].key, MusicalKey::new(PitchClass::C, Mode::Major));
        assert!(candidates[0].confidence > candidates[1].confidence);
        assert!(candidates[0].confidence >= 50);
    }

    #[test]
    fn test_flat_chroma_has_zero_confidence() {
        let candidates = rank_keys(&[0.0; 12]);
        assert!(candidates.iter().all(|c| c.confidence == 0));
        assert!(candidates.iter().all(|c| c.correlation == 0.0));
    }

    #[test]
    fn test_score_confidences_boosts_leader() {
        let mut correlations = vec![0.9, 0.5];
        correlations.extend(std::iter::repeat(0.0).take(22));
        let scores = score_confidences(&correlations);
        // 90 from separation plus the capped 30-point lead bonus
        assert_eq!(scores[0], 100);
        assert_eq!(scores[1], 50);
        assert_eq!(scores[2], 0);
    }
}
