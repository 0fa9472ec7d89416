//! Feature pipeline configuration
//!
//! The defaults reproduce the preprocessing the bundled classifier was
//! trained on.

use serde::{Deserialize, Serialize};

use crate::error::{FeatureError, Result};

/// Target sample rate for decoding
pub const SAMPLE_RATE: u32 = 22050;

/// Mel-spectrogram parameters
pub const N_MELS: usize = 128;
pub const N_FFT: usize = 2048;
pub const HOP_LENGTH: usize = 512;
pub const TOP_DB: f32 = 80.0;

/// Side of the square model input, in pixels
pub const TENSOR_SIDE: usize = 128;
/// Colour channels of the model input
pub const TENSOR_CHANNELS: usize = 3;

/// Placement of the plotting area inside the figure, as fractions of the
/// figure size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlotBox {
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
    pub top: f32,
}

impl Default for PlotBox {
    fn default() -> Self {
        Self {
            left: 0.125,
            right: 0.9,
            bottom: 0.11,
            top: 0.88,
        }
    }
}

/// Feature extractor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Sample rate audio is resampled to, in Hz
    pub sample_rate: u32,
    /// Number of mel bands
    pub n_mels: usize,
    /// FFT size (also the analysis window length)
    pub n_fft: usize,
    /// Hop between STFT frames in samples
    pub hop_length: usize,
    /// Dynamic range kept below the loudest bin, in dB
    pub top_db: f32,
    /// Width and height of the square figure, in inches
    pub figure_inches: f32,
    /// Figure resolution
    pub dpi: f32,
    /// JPEG quality of the saved spectrogram (1-100)
    pub jpeg_quality: u8,
    /// Side of the square tensor handed to the classifier
    pub tensor_side: usize,
    /// Plot area inside the figure; the saved image is cropped to it
    pub plot_box: PlotBox,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            n_mels: N_MELS,
            n_fft: N_FFT,
            hop_length: HOP_LENGTH,
            top_db: TOP_DB,
            figure_inches: 2.0,
            dpi: 100.0,
            jpeg_quality: 75,
            tensor_side: TENSOR_SIDE,
            plot_box: PlotBox::default(),
        }
    }
}

impl FeatureConfig {
    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(FeatureError::invalid_config("sample_rate cannot be zero"));
        }
        if self.n_mels == 0 {
            return Err(FeatureError::invalid_config("n_mels cannot be zero"));
        }
        if self.n_fft < 2 || self.n_fft % 2 != 0 {
            return Err(FeatureError::invalid_config(format!(
                "n_fft must be an even number >= 2, got {}",
                self.n_fft
            )));
        }
        if self.hop_length == 0 {
            return Err(FeatureError::invalid_config("hop_length cannot be zero"));
        }
        if !(self.top_db > 0.0) {
            return Err(FeatureError::invalid_config("top_db must be positive"));
        }
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(FeatureError::invalid_config(format!(
                "jpeg_quality must be in 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        if self.tensor_side == 0 {
            return Err(FeatureError::invalid_config("tensor_side cannot be zero"));
        }
        let b = &self.plot_box;
        if !(0.0 <= b.left && b.left < b.right && b.right <= 1.0)
            || !(0.0 <= b.bottom && b.bottom < b.top && b.top <= 1.0)
        {
            return Err(FeatureError::invalid_config(format!(
                "plot_box must satisfy 0 <= left < right <= 1 and 0 <= bottom < top <= 1, got {:?}",
                b
            )));
        }
        let (w, h) = self.image_size();
        if w == 0 || h == 0 {
            return Err(FeatureError::invalid_config(
                "figure_inches and dpi leave no pixels for the plot",
            ));
        }
        Ok(())
    }

    /// Size in pixels of the saved spectrogram image (width, height).
    ///
    /// 155 x 154 with the defaults: a 200 px figure cropped to its plot area.
    pub fn image_size(&self) -> (u32, u32) {
        let figure_px = self.figure_inches * self.dpi;
        let b = &self.plot_box;
        let width = (figure_px * (b.right - b.left)).round().max(0.0) as u32;
        let height = (figure_px * (b.top - b.bottom)).round().max(0.0) as u32;
        (width, height)
    }
}
