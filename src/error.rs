use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid path expression `{path}`: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("failed to load results from `{results_file}`: {message}")]
    Source {
        results_file: String,
        message: String,
    },

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}
