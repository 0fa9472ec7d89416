//! Error types for classification

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClassifierError>;

#[derive(Error, Debug)]
pub enum ClassifierError {
    /// The model artifact is missing or could not be loaded.
    #[error("Model loading error: {0}")]
    ModelLoad(String),

    /// Tensor, model or label shapes disagree.
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Invalid labels: {0}")]
    InvalidLabels(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClassifierError {
    pub fn model_load<S: Into<String>>(msg: S) -> Self {
        Self::ModelLoad(msg.into())
    }

    pub fn shape_mismatch<S: Into<String>>(msg: S) -> Self {
        Self::ShapeMismatch(msg.into())
    }

    pub fn inference<S: Into<String>>(msg: S) -> Self {
        Self::Inference(msg.into())
    }

    pub fn invalid_labels<S: Into<String>>(msg: S) -> Self {
        Self::InvalidLabels(msg.into())
    }
}
