//! SingerID feature extraction
//!
//! Turns an audio clip into the image tensor the singer classifier expects.
//!
//! ## Pipeline
//!
//! 1. Decode (WAV, MP3, ...) and resample to 22050 Hz mono
//! 2. 128-band mel power spectrogram (`n_fft` 2048, hop 512)
//! 3. Decibels relative to the clip's loudest bin, 80 dB range
//! 4. Render with the magma colour map, no axes, save as JPEG
//! 5. Reload the JPEG as BGR, resize to 128x128, scale to `[0, 1]`
//!
//! ## Quick Start
//!
//! ```no_run
//! use singerid_features::{FeatureConfig, FeatureExtractor};
//!
//! let extractor = FeatureExtractor::new(FeatureConfig::default())?;
//! let tensor = extractor.audio_to_spectrogram("clip.mp3", "/tmp/clip-spectrogram.jpg")?;
//! assert_eq!(tensor.shape(), [1, 128, 128, 3]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod audio;
pub mod config;
pub mod error;
pub mod extractor;
pub mod mel;
pub mod render;
pub mod tensor;

pub use audio::{load_audio, resample, AudioSignal};
pub use config::{FeatureConfig, PlotBox, N_MELS, SAMPLE_RATE, TENSOR_SIDE};
pub use error::{FeatureError, Result};
pub use extractor::FeatureExtractor;
pub use mel::{power_to_db, MelSpectrogram, MelTransform};
pub use render::{render_image, save_spectrogram, Colormap};
pub use tensor::{load_tensor, FeatureTensor};
