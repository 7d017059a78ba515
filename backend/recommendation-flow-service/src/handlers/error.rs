use crate::error::PipelineError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Placeholder entry returned in place of content when a request fails.
#[derive(Debug, Serialize)]
pub struct ErrorEntry {
    pub id: i64,
    pub errors: String,
    pub traceback: String,
}

impl AppError {
    fn traceback(&self) -> String {
        match self {
            AppError::Pipeline(err) => err.trace().join("\n"),
            other => other.to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(vec![ErrorEntry {
            id: 0,
            errors: self.to_string(),
            traceback: self.traceback(),
        }])
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(format!("{:#}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_errors_are_server_errors() {
        let err = AppError::from(PipelineError::InvalidInput("limit must be positive".to_string()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.traceback(), "Invalid input: limit must be positive");
    }

    #[test]
    fn test_bad_request_status() {
        let err = AppError::BadRequest("content_id must be an integer".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
