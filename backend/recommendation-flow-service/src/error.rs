use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Failure of one pipeline invocation.
///
/// Only `InvalidInput` and `Failure` ever reach the caller. `UpstreamTimeout`
/// is raised inside isolated calls (generators, collector signals) and is
/// absorbed there by degrading the source to an empty result.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{stage} timed out after {elapsed:?}")]
    UpstreamTimeout {
        stage: &'static str,
        elapsed: Duration,
    },

    #[error("{stage} stage failed: {message}")]
    Failure {
        stage: &'static str,
        message: String,
        /// Source chain of the underlying error, outermost first.
        trace: Vec<String>,
    },
}

impl PipelineError {
    pub fn failure(stage: &'static str, err: anyhow::Error) -> Self {
        PipelineError::Failure {
            stage,
            message: err.to_string(),
            trace: err.chain().map(|cause| cause.to_string()).collect(),
        }
    }

    /// Diagnostic trace for the adapter's error payload.
    pub fn trace(&self) -> Vec<String> {
        match self {
            PipelineError::Failure { trace, .. } => trace.clone(),
            other => vec![other.to_string()],
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Unknown controller: {0}")]
    UnknownController(String),
}
