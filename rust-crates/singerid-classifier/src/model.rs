//! Classifier models
//!
//! [`Classifier`] is the seam between the prediction context and whatever
//! produces scores. [`OnnxClassifier`] runs an exported Keras/ONNX model
//! through ONNX Runtime; tests plug in fixed-score stubs.

use std::path::Path;

use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::{Tensor, ValueType},
};
use singerid_features::FeatureTensor;
use tracing::{debug, info};

use crate::error::{ClassifierError, Result};

/// Something that turns a feature tensor into one score per class.
pub trait Classifier {
    /// Declared input dimensions; `None` marks a dynamic axis.
    fn input_shape(&self) -> Vec<Option<usize>>;

    /// Number of scores per prediction, if the model declares it.
    fn output_width(&self) -> Option<usize>;

    fn scores(&mut self, tensor: &FeatureTensor) -> Result<Vec<f32>>;
}

/// Classifier backed by a single-input, single-output ONNX model
pub struct OnnxClassifier {
    session: Session,
    input_name: String,
    input_shape: Vec<Option<usize>>,
    output_width: Option<usize>,
}

impl OnnxClassifier {
    /// Load the model at `path` once.
    ///
    /// # Example
    /// ```no_run
    /// use singerid_classifier::OnnxClassifier;
    ///
    /// let model = OnnxClassifier::load("musician_recognition_model.onnx", 4)?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P, num_threads: usize) -> Result<Self> {
        let model_path = path.as_ref().to_path_buf();
        if !model_path.is_file() {
            return Err(ClassifierError::model_load(format!(
                "Model file not found: {}",
                model_path.display()
            )));
        }

        info!("Loading classifier from {}", model_path.display());

        let session = Session::builder()
            .map_err(|e| ClassifierError::model_load(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| ClassifierError::model_load(format!("Failed to set optimization level: {}", e)))?
            .with_intra_threads(num_threads.max(1))
            .map_err(|e| ClassifierError::model_load(format!("Failed to set intra threads: {}", e)))?
            .commit_from_file(&model_path)
            .map_err(|e| {
                ClassifierError::model_load(format!(
                    "Failed to load {}: {}",
                    model_path.display(),
                    e
                ))
            })?;

        if session.inputs.len() != 1 || session.outputs.len() != 1 {
            return Err(ClassifierError::model_load(format!(
                "Expected one input and one output, model has {} and {}",
                session.inputs.len(),
                session.outputs.len()
            )));
        }

        let input = &session.inputs[0];
        let input_name = input.name.clone();
        let input_shape = tensor_dims(&input.input_type).ok_or_else(|| {
            ClassifierError::model_load(format!("Input '{}' is not a tensor", input_name))
        })?;

        let output = &session.outputs[0];
        let output_dims = tensor_dims(&output.output_type).ok_or_else(|| {
            ClassifierError::model_load(format!("Output '{}' is not a tensor", output.name))
        })?;
        let output_width = output_dims.last().copied().flatten();

        info!(
            "Classifier ready: input '{}' {:?}, output width {:?}",
            input_name, input_shape, output_width
        );

        Ok(Self {
            session,
            input_name,
            input_shape,
            output_width,
        })
    }
}

impl Classifier for OnnxClassifier {
    fn input_shape(&self) -> Vec<Option<usize>> {
        self.input_shape.clone()
    }

    fn output_width(&self) -> Option<usize> {
        self.output_width
    }

    fn scores(&mut self, tensor: &FeatureTensor) -> Result<Vec<f32>> {
        let shape = tensor.shape().to_vec();
        let data: Vec<f32> = tensor.view().iter().copied().collect();

        let input = Tensor::from_array((shape, data.into_boxed_slice()))
            .map_err(|e| ClassifierError::inference(format!("Failed to create input tensor: {}", e)))?;

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.clone() => input])
            .map_err(|e| ClassifierError::inference(format!("Classifier inference failed: {}", e)))?;

        let (out_shape, scores) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::inference(format!("Failed to extract scores: {}", e)))?;
        debug!("Classifier output shape {:?}", out_shape);

        Ok(scores.to_vec())
    }
}

/// Dimensions of a tensor value type; non-positive sizes are dynamic.
fn tensor_dims(value_type: &ValueType) -> Option<Vec<Option<usize>>> {
    match value_type {
        ValueType::Tensor { shape, .. } => Some(
            shape
                .iter()
                .map(|&d| if d > 0 { Some(d as usize) } else { None })
                .collect(),
        ),
        _ => None,
    }
}
