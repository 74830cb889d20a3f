//! Engine error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur during face restoration or checkpoint provisioning.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Model weights not found: {0}")]
    WeightsNotFound(PathBuf),

    #[error("Checkpoint download failed: {0}")]
    CheckpointDownloadFailed(String),

    #[error("Network volume unavailable: {0}")]
    VolumeUnavailable(String),

    #[error("Failed to load model: {0}")]
    ModelLoadFailed(String),

    #[error("Inference failed: {0}")]
    InferenceFailed(String),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn model_load_failed(msg: impl Into<String>) -> Self {
        Self::ModelLoadFailed(msg.into())
    }

    pub fn inference_failed(msg: impl Into<String>) -> Self {
        Self::InferenceFailed(msg.into())
    }

    pub fn checkpoint_download_failed(msg: impl Into<String>) -> Self {
        Self::CheckpointDownloadFailed(msg.into())
    }
}
