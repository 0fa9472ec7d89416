//! Mel power spectrogram and decibel conversion
//!
//! Matches the conventions the classifier was trained with: centred STFT
//! with zero padding, periodic Hann window, Slaney mel scale with area
//! normalised filters, and dB relative to the clip's own maximum.

use std::f64::consts::PI;
use std::sync::Arc;

use ndarray::Array2;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use tracing::debug;

use crate::error::{FeatureError, Result};

/// Power floor used before taking logarithms
pub const AMIN: f32 = 1e-10;

/// Slaney mel scale: linear below 1 kHz, logarithmic above
const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

/// Convert Hz to mel (Slaney)
pub fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

/// Convert mel (Slaney) to Hz
pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// `n` frequencies evenly spaced on the mel scale between `fmin` and `fmax`.
pub fn mel_frequencies(n: usize, fmin: f64, fmax: f64) -> Vec<f64> {
    let mel_min = hz_to_mel(fmin);
    let mel_max = hz_to_mel(fmax);
    match n {
        0 => Vec::new(),
        1 => vec![mel_to_hz(mel_min)],
        _ => (0..n)
            .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f64 / (n - 1) as f64))
            .collect(),
    }
}

/// Create the mel filterbank matrix, shape `(n_mels, n_fft / 2 + 1)`.
///
/// Triangular filters between consecutive mel centre frequencies, each
/// scaled by `2 / bandwidth` so every filter has unit area.
pub fn mel_filterbank(
    sample_rate: f64,
    n_fft: usize,
    n_mels: usize,
    fmin: f64,
    fmax: f64,
) -> Array2<f32> {
    let n_freqs = n_fft / 2 + 1;
    let fft_freqs: Vec<f64> = (0..n_freqs)
        .map(|k| k as f64 * sample_rate / n_fft as f64)
        .collect();
    let mel_f = mel_frequencies(n_mels + 2, fmin, fmax);

    let mut weights = Array2::<f32>::zeros((n_mels, n_freqs));
    for m in 0..n_mels {
        let (left, center, right) = (mel_f[m], mel_f[m + 1], mel_f[m + 2]);
        let lower_width = center - left;
        let upper_width = right - center;
        let enorm = 2.0 / (right - left);

        for (k, &freq) in fft_freqs.iter().enumerate() {
            let lower = (freq - left) / lower_width;
            let upper = (right - freq) / upper_width;
            let w = lower.min(upper).max(0.0);
            weights[[m, k]] = (w * enorm) as f32;
        }
    }
    weights
}

/// Periodic Hann window (the DFT-even variant used for spectral analysis).
pub fn hann_window(length: usize) -> Vec<f32> {
    (0..length)
        .map(|n| (0.5 - 0.5 * (2.0 * PI * n as f64 / length as f64).cos()) as f32)
        .collect()
}

/// Mel-scaled spectrogram, shape `(n_mels, n_frames)`
#[derive(Debug, Clone, PartialEq)]
pub struct MelSpectrogram {
    pub values: Array2<f32>,
    pub sample_rate: u32,
    pub hop_length: usize,
    /// Whether `values` are decibels rather than power
    pub decibels: bool,
}

impl MelSpectrogram {
    pub fn n_mels(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_frames(&self) -> usize {
        self.values.ncols()
    }

    pub fn max(&self) -> f32 {
        self.values.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    pub fn min(&self) -> f32 {
        self.values.iter().copied().fold(f32::INFINITY, f32::min)
    }

    /// Convert power to decibels referenced to this spectrogram's maximum.
    ///
    /// The loudest bin becomes 0 dB and nothing falls more than `top_db`
    /// below it. Already-converted spectrograms are returned unchanged.
    pub fn into_decibels(self, top_db: f32) -> Self {
        if self.decibels {
            return self;
        }
        let values = power_to_db(&self.values, top_db);
        Self {
            values,
            decibels: true,
            ..self
        }
    }
}

/// `10 * log10(S / max(S))` with an `AMIN` floor and a `top_db` range limit.
pub fn power_to_db(power: &Array2<f32>, top_db: f32) -> Array2<f32> {
    let reference = power.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let ref_db = 10.0 * reference.max(AMIN).log10();

    let mut db = power.mapv(|p| 10.0 * p.max(AMIN).log10() - ref_db);
    let peak = db.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let floor = peak - top_db;
    db.mapv_inplace(|v| v.max(floor));
    db
}

/// STFT + mel projection with a reusable FFT plan and filterbank
pub struct MelTransform {
    n_fft: usize,
    hop_length: usize,
    sample_rate: u32,
    window: Vec<f32>,
    filters: Array2<f32>,
    fft: Arc<dyn Fft<f32>>,
}

impl MelTransform {
    pub fn new(sample_rate: u32, n_fft: usize, hop_length: usize, n_mels: usize) -> Self {
        let filters = mel_filterbank(
            sample_rate as f64,
            n_fft,
            n_mels,
            0.0,
            sample_rate as f64 / 2.0,
        );
        let fft = FftPlanner::new().plan_fft_forward(n_fft);

        Self {
            n_fft,
            hop_length,
            sample_rate,
            window: hann_window(n_fft),
            filters,
            fft,
        }
    }

    /// Number of STFT frames produced for `len` samples.
    pub fn frame_count(&self, len: usize) -> usize {
        1 + len / self.hop_length
    }

    /// Power spectrogram `|STFT|^2`, shape `(n_fft / 2 + 1, n_frames)`.
    pub fn power_spectrogram(&self, samples: &[f32]) -> Result<Array2<f32>> {
        if samples.is_empty() {
            return Err(FeatureError::decode("Cannot analyse an empty signal"));
        }

        let pad = self.n_fft / 2;
        let mut padded = vec![0.0f32; samples.len() + 2 * pad];
        padded[pad..pad + samples.len()].copy_from_slice(samples);

        let n_frames = self.frame_count(samples.len());
        let n_freqs = self.n_fft / 2 + 1;
        let mut power = Array2::<f32>::zeros((n_freqs, n_frames));
        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.n_fft];

        for frame in 0..n_frames {
            let start = frame * self.hop_length;
            let segment = &padded[start..start + self.n_fft];
            for ((slot, &x), &w) in buffer.iter_mut().zip(segment).zip(&self.window) {
                *slot = Complex::new(x * w, 0.0);
            }

            self.fft.process(&mut buffer);

            for (k, bin) in buffer.iter().take(n_freqs).enumerate() {
                power[[k, frame]] = bin.norm_sqr();
            }
        }

        Ok(power)
    }

    /// Mel power spectrogram of `samples`.
    pub fn mel_spectrogram(&self, samples: &[f32]) -> Result<MelSpectrogram> {
        let power = self.power_spectrogram(samples)?;
        let values = self.filters.dot(&power);
        debug!("Mel spectrogram shape: {:?}", values.shape());

        Ok(MelSpectrogram {
            values,
            sample_rate: self.sample_rate,
            hop_length: self.hop_length,
            decibels: false,
        })
    }
}
