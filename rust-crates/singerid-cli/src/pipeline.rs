//! Request pipeline
//!
//! One request: stage the uploaded clip in scratch space, extract features,
//! classify, hand the result to the display step while the spectrogram still
//! exists, then remove the scratch files.

use anyhow::{Context, Result};
use singerid_classifier::{AppContext, Prediction};
use singerid_features::{FeatureExtractor, FeatureTensor};
use singerid_paths::ScratchArtifacts;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use crate::config::SingerIdConfig;

/// Extension used for scratch copies of files that have none
const FALLBACK_EXTENSION: &str = "audio";

/// Feature extractor and loaded classifier, reused across requests
pub struct SingerId {
    extractor: FeatureExtractor,
    context: AppContext,
    scratch_dir: PathBuf,
}

impl SingerId {
    pub fn new(extractor: FeatureExtractor, context: AppContext, scratch_dir: PathBuf) -> Self {
        Self {
            extractor,
            context,
            scratch_dir,
        }
    }

    /// Build from configuration, loading the ONNX model once.
    ///
    /// `model_override` replaces the configured model path.
    pub fn from_config(config: &SingerIdConfig, model_override: Option<&Path>) -> Result<Self> {
        let model_path = model_override.unwrap_or(config.model_path.as_path());
        let labels = config.label_set()?;

        let extractor = FeatureExtractor::new(config.features.clone())
            .context("Failed to create feature extractor")?;
        let context = AppContext::load(model_path, labels, config.num_threads)
            .with_context(|| format!("Failed to load model {}", model_path.display()))?;

        Ok(Self::new(extractor, context, config.scratch_dir()))
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    /// Identify the singer in `audio`.
    ///
    /// `display` sees the prediction while its spectrogram is still on disk
    /// (`spectrogram_path` points at it). When `save_spectrogram` is given
    /// the image is copied there first and the returned prediction points
    /// at the copy; otherwise the returned `spectrogram_path` is `None`
    /// because the scratch image is gone by then.
    pub fn identify<F>(
        &mut self,
        audio: &Path,
        save_spectrogram: Option<&Path>,
        display: F,
    ) -> Result<Prediction>
    where
        F: FnOnce(&Prediction) -> Result<()>,
    {
        let start = Instant::now();

        let mut scratch = ScratchArtifacts::new(&self.scratch_dir, audio_extension(audio))?;
        let bytes = scratch.stage_audio(audio)?;
        debug!(
            "Staged {} ({} bytes) as request {}",
            audio.display(),
            bytes,
            scratch.request_id()
        );

        let tensor = self
            .extractor
            .audio_to_spectrogram(scratch.audio_path(), scratch.spectrogram_path())
            .with_context(|| format!("Failed to extract features from {}", audio.display()))?;

        let mut prediction = self
            .context
            .predict(&tensor)
            .context("Classification failed")?
            .with_spectrogram(scratch.spectrogram_path());

        let saved = match save_spectrogram {
            Some(target) => {
                std::fs::copy(scratch.spectrogram_path(), target).with_context(|| {
                    format!("Failed to save spectrogram to {}", target.display())
                })?;
                prediction.spectrogram_path = Some(target.to_path_buf());
                Some(target.to_path_buf())
            }
            None => None,
        };

        display(&prediction)?;

        scratch.cleanup()?;
        prediction.spectrogram_path = saved;
        prediction.processing_time_ms = start.elapsed().as_secs_f64() * 1000.0;

        info!(
            "Request {} finished: '{}' in {:.1} ms",
            scratch.request_id(),
            prediction.label,
            prediction.processing_time_ms
        );
        Ok(prediction)
    }
}

/// Render the spectrogram of `audio` to `output` without classifying it.
pub fn render_spectrogram(
    extractor: &FeatureExtractor,
    audio: &Path,
    output: &Path,
) -> Result<FeatureTensor> {
    extractor
        .audio_to_spectrogram(audio, output)
        .with_context(|| format!("Failed to render spectrogram for {}", audio.display()))
}

fn audio_extension(path: &Path) -> &str {
    path.extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or(FALLBACK_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_extension() {
        assert_eq!(audio_extension(Path::new("song.MP3")), "MP3");
        assert_eq!(audio_extension(Path::new("/a/b/clip.wav")), "wav");
        assert_eq!(audio_extension(Path::new("noext")), FALLBACK_EXTENSION);
        assert_eq!(audio_extension(Path::new("weird.m-p3")), FALLBACK_EXTENSION);
    }
}
