// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Error types for target generation.

use std::fmt;

/// Result type alias for target generation operations.
pub type Result<T> = std::result::Result<T, TargetError>;

/// Main error type for the augmentation and label synthesis pipeline.
#[derive(Debug)]
pub enum TargetError {
    /// Every keypoint of the sample is `Missing`, so no bounding box exists.
    DegenerateKeypoints(String),
    /// Category is unknown or absent from the landmark table.
    UnknownCategory(String),
    /// Invalid configuration provided.
    ConfigError(String),
    /// Malformed `x_y_v` keypoint annotation.
    KeypointParseError(String),
    /// Error decoding or processing images.
    ImageError(String),
    /// Wrapped `std::io::Error`
    Io(std::io::Error),
}

impl fmt::Display for TargetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DegenerateKeypoints(msg) => write!(f, "Degenerate keypoints: {msg}"),
            Self::UnknownCategory(msg) => write!(f, "Unknown category: {msg}"),
            Self::ConfigError(msg) => write!(f, "Config error: {msg}"),
            Self::KeypointParseError(msg) => write!(f, "Keypoint parse error: {msg}"),
            Self::ImageError(msg) => write!(f, "Image error: {msg}"),
            Self::Io(err) => write!(f, "IO error: {err}"),
        }
    }
}

impl std::error::Error for TargetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TargetError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<image::ImageError> for TargetError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageError(err.to_string())
    }
}

impl From<serde_json::Error> for TargetError {
    fn from(err: serde_json::Error) -> Self {
        Self::ConfigError(err.to_string())
    }
}
