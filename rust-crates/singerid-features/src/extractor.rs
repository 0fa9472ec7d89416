//! Audio file to classifier tensor

use std::path::Path;
use std::time::Instant;

use tracing::{debug, info};

use crate::audio::{load_audio, AudioSignal};
use crate::config::FeatureConfig;
use crate::error::Result;
use crate::mel::{MelSpectrogram, MelTransform};
use crate::render::save_spectrogram;
use crate::tensor::{load_tensor, FeatureTensor};

/// Feature extractor holding the FFT plan and mel filterbank
pub struct FeatureExtractor {
    config: FeatureConfig,
    transform: MelTransform,
}

impl FeatureExtractor {
    /// Create a feature extractor after validating `config`.
    pub fn new(config: FeatureConfig) -> Result<Self> {
        config.validate()?;
        let transform = MelTransform::new(
            config.sample_rate,
            config.n_fft,
            config.hop_length,
            config.n_mels,
        );
        Ok(Self { config, transform })
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Decode and resample an audio file.
    pub fn load_audio<P: AsRef<Path>>(&self, path: P) -> Result<AudioSignal> {
        load_audio(path, self.config.sample_rate)
    }

    /// Mel spectrogram in dB relative to the clip's loudest bin.
    pub fn db_spectrogram(&self, signal: &AudioSignal) -> Result<MelSpectrogram> {
        let mel = self.transform.mel_spectrogram(&signal.samples)?;
        let db = mel.into_decibels(self.config.top_db);
        debug!(
            "dB spectrogram: {} bands x {} frames, range {:.1}..{:.1}",
            db.n_mels(),
            db.n_frames(),
            db.min(),
            db.max()
        );
        Ok(db)
    }

    /// Render a dB spectrogram and save it as JPEG at `path`.
    pub fn render_spectrogram<P: AsRef<Path>>(&self, db: &MelSpectrogram, path: P) -> Result<()> {
        save_spectrogram(db, &self.config, path)
    }

    /// Reload a saved spectrogram as the classifier input tensor.
    pub fn load_tensor<P: AsRef<Path>>(&self, path: P) -> Result<FeatureTensor> {
        load_tensor(path, self.config.tensor_side)
    }

    /// Run the whole pipeline.
    ///
    /// Writes the rendered spectrogram JPEG to `image_path` and returns the
    /// tensor decoded back from it. The image is left on disk for the caller
    /// to display and delete.
    pub fn audio_to_spectrogram<A, I>(&self, audio_path: A, image_path: I) -> Result<FeatureTensor>
    where
        A: AsRef<Path>,
        I: AsRef<Path>,
    {
        let start = Instant::now();

        let signal = self.load_audio(&audio_path)?;
        let db = self.db_spectrogram(&signal)?;
        self.render_spectrogram(&db, &image_path)?;
        let tensor = self.load_tensor(&image_path)?;

        info!(
            "Extracted {:?} tensor from {} in {:.1} ms",
            tensor.shape(),
            audio_path.as_ref().display(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(tensor)
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        let config = FeatureConfig::default();
        let transform = MelTransform::new(
            config.sample_rate,
            config.n_fft,
            config.hop_length,
            config.n_mels,
        );
        Self { config, transform }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeatureError;

    #[test]
    fn test_extractor_rejects_invalid_config() {
        let config = FeatureConfig {
            hop_length: 0,
            ..Default::default()
        };
        assert!(matches!(
            FeatureExtractor::new(config),
            Err(FeatureError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_db_spectrogram_peaks_at_zero() {
        let extractor = FeatureExtractor::default();
        let samples: Vec<f32> = (0..22050)
            .map(|i| (i as f32 * 0.05).sin() * 0.5)
            .collect();
        let db = extractor
            .db_spectrogram(&AudioSignal::new(samples, 22050))
            .unwrap();
        assert_eq!(db.n_mels(), 128);
        assert_eq!(db.n_frames(), 1 + 22050 / 512);
        assert!(db.max().abs() < 1e-4);
        assert!(db.min() >= -80.0 - 1e-4);
    }
}
