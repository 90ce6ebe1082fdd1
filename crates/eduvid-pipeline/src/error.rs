//! Pipeline error types.

use eduvid_models::{StageName, TransitionError};
use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{stage} failed: {message}")]
    StageFailed { stage: StageName, message: String },

    #[error("{stage} needs '{key}' but no earlier stage produced it")]
    MissingArtifact { stage: StageName, key: &'static str },

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("AI error: {0}")]
    Ai(#[from] eduvid_ai_client::AiError),

    #[error("Media error: {0}")]
    Media(#[from] eduvid_media::MediaError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn stage_failed(stage: StageName, msg: impl Into<String>) -> Self {
        Self::StageFailed {
            stage,
            message: msg.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
