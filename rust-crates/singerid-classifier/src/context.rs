//! Prediction context
//!
//! The classifier is loaded once per process and held here together with
//! its labels, so every prediction goes through the same checked pairing.

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use singerid_features::FeatureTensor;
use tracing::{debug, info};

use crate::error::{ClassifierError, Result};
use crate::labels::LabelSet;
use crate::model::{Classifier, OnnxClassifier};

/// Outcome of one prediction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub label: String,
    pub index: usize,
    /// Raw classifier output, one score per label
    pub scores: Vec<f32>,
    /// Rendered spectrogram, when the caller kept one
    pub spectrogram_path: Option<PathBuf>,
    pub processing_time_ms: f64,
}

impl Prediction {
    pub fn with_spectrogram<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.spectrogram_path = Some(path.into());
        self
    }
}

/// Loaded classifier plus the labels for its outputs
pub struct AppContext {
    classifier: Box<dyn Classifier>,
    labels: LabelSet,
}

impl AppContext {
    /// Pair `classifier` with `labels`.
    ///
    /// Fails with `ShapeMismatch` when the classifier declares an output
    /// width different from the number of labels.
    pub fn new(classifier: Box<dyn Classifier>, labels: LabelSet) -> Result<Self> {
        if let Some(width) = classifier.output_width() {
            if width != labels.len() {
                return Err(ClassifierError::shape_mismatch(format!(
                    "model has {} outputs but {} labels are configured",
                    width,
                    labels.len()
                )));
            }
        }
        debug!(
            "Context built: input {:?}, {} labels",
            classifier.input_shape(),
            labels.len()
        );
        Ok(Self { classifier, labels })
    }

    /// Load the ONNX model at `model_path` and pair it with `labels`.
    pub fn load<P: AsRef<Path>>(model_path: P, labels: LabelSet, num_threads: usize) -> Result<Self> {
        let classifier = OnnxClassifier::load(model_path, num_threads)?;
        Self::new(Box::new(classifier), labels)
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Classify one feature tensor.
    pub fn predict(&mut self, tensor: &FeatureTensor) -> Result<Prediction> {
        let start = Instant::now();

        check_input_shape(&self.classifier.input_shape(), &tensor.shape())?;

        let scores = self.classifier.scores(tensor)?;
        if scores.len() != self.labels.len() {
            return Err(ClassifierError::shape_mismatch(format!(
                "model returned {} scores for {} labels",
                scores.len(),
                self.labels.len()
            )));
        }

        let index = argmax(&scores)
            .ok_or_else(|| ClassifierError::inference("model returned no comparable scores"))?;
        let label = self
            .labels
            .get(index)
            .ok_or_else(|| ClassifierError::inference(format!("no label for index {}", index)))?
            .to_string();

        let processing_time_ms = start.elapsed().as_secs_f64() * 1000.0;
        info!(
            "Predicted '{}' (class {}, score {:.4}) in {:.1} ms",
            label, index, scores[index], processing_time_ms
        );

        Ok(Prediction {
            label,
            index,
            scores,
            spectrogram_path: None,
            processing_time_ms,
        })
    }
}

/// Classify `tensor` with the context's model.
pub fn predict(context: &mut AppContext, tensor: &FeatureTensor) -> Result<Prediction> {
    context.predict(tensor)
}

/// Index of the largest score. Ties go to the lowest index; NaN never wins.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &s) in scores.iter().enumerate() {
        if s.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if s <= b => {}
            _ => best = Some((i, s)),
        }
    }
    best.map(|(i, _)| i)
}

fn check_input_shape(declared: &[Option<usize>], actual: &[usize]) -> Result<()> {
    let matches = declared.len() == actual.len()
        && declared
            .iter()
            .zip(actual)
            .all(|(d, a)| d.map_or(true, |d| d == *a));
    if matches {
        Ok(())
    } else {
        Err(ClassifierError::shape_mismatch(format!(
            "tensor shape {:?} does not fit model input {:?}",
            actual, declared
        )))
    }
}
