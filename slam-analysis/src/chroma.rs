//! Pitch-class energy profile from per-note Goertzel resonators
//!
//! Every pitch class is probed once per octave (1-7, below Nyquist) with a
//! single-bin Goertzel filter on each Hann-windowed 4096-sample frame. This
//! is an approximation of a chromagram: low notes share DFT bins and nothing
//! is interpolated. Key profile scoring is tuned to exactly this output.

use crate::onset::hann_window;
use std::f64::consts::PI;

/// Frame length in samples
pub const FRAME_SIZE: usize = 4096;
/// Hop between frames (50% overlap)
pub const HOP_SIZE: usize = FRAME_SIZE / 2;

/// Reference frequency for A4 (440 Hz, MIDI note 69)
const A4_FREQ: f64 = 440.0;
const A4_MIDI: i32 = 69;
const FIRST_OCTAVE: i32 = 1;
const LAST_OCTAVE: i32 = 7;

/// 12-bin pitch-class energy, index 0 = C, normalized to a peak of 1.0
pub type Chroma = [f32; 12];

/// Chroma extractor with precomputed window and resonator coefficients
pub struct ChromaExtractor {
    sample_rate: u32,
    window: Vec<f32>,
    /// Goertzel coefficient per distinct DFT bin
    coefficients: Vec<f64>,
    /// (pitch class, index into `coefficients`) for every probed note
    taps: Vec<(usize, usize)>,
}

impl ChromaExtractor {
    pub fn new(sample_rate: u32) -> Self {
        let nyquist = sample_rate as f64 / 2.0;
        let mut bins: Vec<usize> = Vec::new();
        let mut taps = Vec::new();

        for pitch_class in 0..12 {
            for octave in FIRST_OCTAVE..=LAST_OCTAVE {
                let freq = note_frequency(octave, pitch_class as i32);
                if freq >= nyquist {
                    continue;
                }
                let k = (freq / sample_rate as f64 * FRAME_SIZE as f64).round() as usize;
                let bin_idx = match bins.iter().position(|&b| b == k) {
                    Some(idx) => idx,
                    None => {
                        bins.push(k);
                        bins.len() - 1
                    }
                };
                taps.push((pitch_class, bin_idx));
            }
        }

        let coefficients = bins
            .iter()
            .map(|&k| 2.0 * (2.0 * PI * k as f64 / FRAME_SIZE as f64).cos())
            .collect();

        Self {
            sample_rate,
            window: hann_window(FRAME_SIZE),
            coefficients,
            taps,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Accumulate Goertzel power per pitch class over all frames
    ///
    /// Buffers shorter than one frame, and silence, give an all-zero chroma.
    pub fn extract(&self, samples: &[f32]) -> Chroma {
        let mut accum = [0.0f64; 12];
        let mut frame = vec![0.0f64; FRAME_SIZE];
        let mut powers = vec![0.0f64; self.coefficients.len()];

        let mut pos = 0;
        while pos + FRAME_SIZE <= samples.len() {
            for ((slot, s), w) in frame
                .iter_mut()
                .zip(&samples[pos..pos + FRAME_SIZE])
                .zip(&self.window)
            {
                *slot = (s * w) as f64;
            }

            for (power, &coeff) in powers.iter_mut().zip(&self.coefficients) {
                *power = goertzel_power(&frame, coeff);
            }
            for &(pitch_class, bin_idx) in &self.taps {
                accum[pitch_class] += powers[bin_idx];
            }

            pos += HOP_SIZE;
        }

        let max = accum.iter().cloned().fold(0.0f64, f64::max);
        let mut chroma = [0.0f32; 12];
        if max > 0.0 {
            for (c, a) in chroma.iter_mut().zip(&accum) {
                *c = (a / max) as f32;
            }
        }
        chroma
    }
}

/// Equal-tempered frequency of `pitch_class` in `octave` (MIDI 12·octave + pc)
fn note_frequency(octave: i32, pitch_class: i32) -> f64 {
    let midi = 12 * octave + pitch_class;
    A4_FREQ * 2f64.powf((midi - A4_MIDI) as f64 / 12.0)
}

/// Squared magnitude of one DFT bin via the Goertzel recursion
fn goertzel_power(frame: &[f64], coeff: f64) -> f64 {
    let mut s1 = 0.0f64;
    let mut s2 = 0.0f64;
    for &x in frame {
        let s = x + coeff * s1 - s2;
        s2 = s1;
        s1 = s;
    }
    s1 * s1 + s2 * s2 - coeff * s1 * s2
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, sample_rate: u32, seconds: f32) -> Vec<f32> {
        let len = (sample_rate as f32 * seconds) as usize;
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin() * 0.5)
            .collect()
    }

    #[test]
    fn test_note_frequency() {
        assert!((note_frequency(5, 9) - 440.0).abs() < 1e-9);
        assert!((note_frequency(5, 0) - 261.6256).abs() < 1e-3);
    }

    #[test]
    fn test_goertzel_matches_dft_bin() {
        let n = 64;
        let k = 5;
        let frame: Vec<f64> = (0..n)
            .map(|i| (2.0 * PI * k as f64 * i as f64 / n as f64).cos())
            .collect();
        let coeff = 2.0 * (2.0 * PI * k as f64 / n as f64).cos();
        // |X[k]|² of a bin-centred cosine is (n/2)²
        let expected = (n as f64 / 2.0).powi(2);
        assert!((goertzel_power(&frame, coeff) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_taps_respect_nyquist() {
        // Nyquist 1500 Hz cuts the top of octave 7
        let low_rate = ChromaExtractor::new(3000);
        let full_rate = ChromaExtractor::new(44100);
        assert_eq!(full_rate.taps.len(), 84);
        assert!(low_rate.taps.len() < 84);
    }

    #[test]
    fn test_a440_dominates() {
        let extractor = ChromaExtractor::new(44100);
        let chroma = extractor.extract(&tone(440.0, 44100, 2.0));
        let argmax = chroma
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(argmax, 9);
        assert_eq!(chroma[9], 1.0);
    }

    #[test]
    fn test_silence_and_short_input() {
        let extractor = ChromaExtractor::new(44100);
        assert_eq!(extractor.extract(&vec![0.0; 44100]), [0.0; 12]);
        assert_eq!(extractor.extract(&vec![0.5; 100]), [0.0; 12]);
    }
}
