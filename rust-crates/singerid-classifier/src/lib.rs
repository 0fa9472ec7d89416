//! SingerID classification
//!
//! Loads the singer classifier once and maps its scores onto artist names.
//!
//! ## Quick Start
//!
//! ```no_run
//! use singerid_classifier::{AppContext, LabelSet};
//! use singerid_features::FeatureExtractor;
//!
//! let mut context = AppContext::load("musician_recognition_model.onnx", LabelSet::default(), 4)?;
//! let tensor = FeatureExtractor::default().audio_to_spectrogram("clip.mp3", "/tmp/clip.jpg")?;
//! let prediction = context.predict(&tensor)?;
//! println!("Singer: {}", prediction.label);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod context;
pub mod error;
pub mod labels;
pub mod model;

pub use context::{argmax, predict, AppContext, Prediction};
pub use error::{ClassifierError, Result};
pub use labels::{LabelSet, DEFAULT_LABELS};
pub use model::{Classifier, OnnxClassifier};
