use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::fmt;
use thiserror::Error;
use tracing::warn;

use crate::models::ErrorBody;

/// Classification every failure is reduced to before it reaches a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    RateLimited,
    Unauthorized,
    ServerError,
    Transport,
    Validation,
}

impl ErrorKind {
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::RateLimited => StatusCode::FORBIDDEN,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::ServerError | ErrorKind::Transport => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
        }
    }

    /// Lower is more actionable for the caller; used to classify aggregated failures.
    fn priority(self) -> u8 {
        match self {
            ErrorKind::RateLimited => 0,
            ErrorKind::Unauthorized => 1,
            ErrorKind::NotFound => 2,
            ErrorKind::ServerError => 3,
            ErrorKind::Transport => 4,
            ErrorKind::Validation => 5,
        }
    }
}

/// A single page that could not be fetched.
#[derive(Debug)]
pub struct PageFailure {
    pub page: u32,
    pub error: StarHistoryError,
}

impl fmt::Display for PageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {}: {}", self.page, self.error)
    }
}

#[derive(Error, Debug)]
pub enum StarHistoryError {
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("Invalid repository name: {0}")]
    InvalidRepoName(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Upstream server error: {0}")]
    ServerError(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Task failed: {0}")]
    TaskFailed(String),

    #[error("{} of {total} page requests failed: {}", .failures.len(), join_failures(.failures))]
    PagesFailed {
        total: usize,
        failures: Vec<PageFailure>,
    },
}

fn join_failures(failures: &[PageFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl StarHistoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StarHistoryError::NotFound(_) => ErrorKind::NotFound,
            StarHistoryError::RateLimitExceeded(_) => ErrorKind::RateLimited,
            StarHistoryError::AuthError(_) => ErrorKind::Unauthorized,
            StarHistoryError::ServerError(_) => ErrorKind::ServerError,
            StarHistoryError::NetworkError(_)
            | StarHistoryError::JsonError(_)
            | StarHistoryError::UrlError(_)
            | StarHistoryError::IoError(_)
            | StarHistoryError::TaskFailed(_) => ErrorKind::Transport,
            StarHistoryError::InvalidRepoName(_) | StarHistoryError::Validation(_) => {
                ErrorKind::Validation
            }
            StarHistoryError::PagesFailed { failures, .. } => failures
                .iter()
                .map(|failure| failure.error.kind())
                .min_by_key(|kind| kind.priority())
                .unwrap_or(ErrorKind::ServerError),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.kind().status_code()
    }
}

impl IntoResponse for StarHistoryError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            warn!(status = status.as_u16(), "Request failed: {}", self);
        }
        let body = ErrorBody {
            code: status.as_u16().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, StarHistoryError>;
