//! Error types for feature extraction

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FeatureError>;

#[derive(Error, Debug)]
pub enum FeatureError {
    /// The input is not a readable or decodable audio stream.
    #[error("Audio decode error: {0}")]
    Decode(String),

    #[error("Resampling error: {0}")]
    Resample(String),

    /// The spectrogram image could not be written or read back.
    #[error("Spectrogram image I/O error: {0}")]
    ImageIo(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Tensor shape error: {0}")]
    Shape(String),
}

impl FeatureError {
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    pub fn resample<S: Into<String>>(msg: S) -> Self {
        Self::Resample(msg.into())
    }

    pub fn image_io<S: Into<String>>(msg: S) -> Self {
        Self::ImageIo(msg.into())
    }

    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// True for the failures a caller should report as an I/O problem.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::ImageIo(_))
    }
}
