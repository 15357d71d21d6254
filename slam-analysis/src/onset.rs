//! Onset strength envelopes
//!
//! Two interchangeable detection functions, both framed with `hop = window / 4`
//! and normalized to a peak of 1.0:
//! - RMS flux: half-wave rectified change in frame RMS energy
//! - Bass spectral flux: half-wave rectified change in the magnitude of the
//!   DFT bins at or below 200 Hz

use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;

/// Upper edge of the bass band used by spectral flux
pub const BASS_CUTOFF_HZ: f32 = 200.0;

/// Onset detection function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnsetMethod {
    RmsFlux,
    SpectralFlux,
}

/// Normalized onset strength sampled at `rate` frames per second
#[derive(Debug, Clone, PartialEq)]
pub struct OnsetEnvelope {
    pub values: Vec<f32>,
    /// Envelope frames per second (sample_rate / hop)
    pub rate: f32,
}

impl OnsetEnvelope {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True when the envelope carries no onset energy at all
    pub fn is_silent(&self) -> bool {
        self.values.iter().all(|&v| v == 0.0)
    }
}

/// Compute the onset envelope of `samples` with the given method and window size
pub fn onset_envelope(
    samples: &[f32],
    sample_rate: u32,
    window_size: usize,
    method: OnsetMethod,
) -> OnsetEnvelope {
    let hop = (window_size / 4).max(1);
    let mut values = match method {
        OnsetMethod::RmsFlux => rms_flux(samples, window_size, hop),
        OnsetMethod::SpectralFlux => bass_spectral_flux(samples, sample_rate, window_size, hop),
    };
    normalize_peak(&mut values);

    OnsetEnvelope {
        values,
        rate: sample_rate as f32 / hop as f32,
    }
}

/// Half-wave rectified RMS energy difference between consecutive frames
fn rms_flux(samples: &[f32], window_size: usize, hop: usize) -> Vec<f32> {
    let energies: Vec<f32> = frames(samples, window_size, hop)
        .map(|frame| {
            let power = frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32;
            power.sqrt()
        })
        .collect();

    rectified_difference(&energies)
}

/// Spectral flux restricted to the bass band
///
/// The FFT computes every bin but only bins `1..=cutoff` are read, which is
/// the same partial DFT evaluated more cheaply.
fn bass_spectral_flux(
    samples: &[f32],
    sample_rate: u32,
    window_size: usize,
    hop: usize,
) -> Vec<f32> {
    if samples.len() < window_size || window_size < 2 {
        return Vec::new();
    }

    let cutoff_bin = ((BASS_CUTOFF_HZ * window_size as f32 / sample_rate as f32) as usize)
        .min(window_size / 2);
    if cutoff_bin == 0 {
        // Window too short to resolve anything below the cutoff
        return vec![0.0; frames(samples, window_size, hop).count()];
    }

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(window_size);
    let window = hann_window(window_size);
    let mut buffer = vec![Complex::new(0.0f32, 0.0); window_size];

    let mut flux = Vec::new();
    let mut prev: Option<Vec<f32>> = None;

    for frame in frames(samples, window_size, hop) {
        for ((slot, s), w) in buffer.iter_mut().zip(frame).zip(&window) {
            *slot = Complex::new(s * w, 0.0);
        }
        fft.process(&mut buffer);

        let magnitudes: Vec<f32> = buffer[1..=cutoff_bin].iter().map(|c| c.norm()).collect();

        let value: f32 = match prev {
            Some(ref p) => magnitudes
                .iter()
                .zip(p)
                .map(|(curr, prev)| (curr - prev).max(0.0))
                .sum(),
            None => 0.0,
        };
        flux.push(value);
        prev = Some(magnitudes);
    }

    flux
}

/// Iterate over full frames of `window_size` samples advancing by `hop`
fn frames(samples: &[f32], window_size: usize, hop: usize) -> impl Iterator<Item = &[f32]> {
    let count = if samples.len() >= window_size && window_size > 0 {
        (samples.len() - window_size) / hop + 1
    } else {
        0
    };
    (0..count).map(move |i| &samples[i * hop..i * hop + window_size])
}

/// `out[0] = 0`, `out[i] = max(0, x[i] - x[i-1])`
fn rectified_difference(values: &[f32]) -> Vec<f32> {
    let mut out = Vec::with_capacity(values.len());
    if values.is_empty() {
        return out;
    }
    out.push(0.0);
    out.extend(values.windows(2).map(|w| (w[1] - w[0]).max(0.0)));
    out
}

/// Divide by the maximum; an all-zero envelope stays all-zero
fn normalize_peak(values: &mut [f32]) {
    let max = values.iter().cloned().fold(0.0f32, f32::max);
    if max > 0.0 {
        for v in values.iter_mut() {
            *v /= max;
        }
    }
}

/// Periodic Hann window of length `n`
pub(crate) fn hann_window(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / n as f32).cos()))
        .collect()
}
