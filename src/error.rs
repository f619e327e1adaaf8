use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file {path} not found")]
    NotFound { path: String },
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("timed out waiting for config lock {0}")]
    LockTimeout(String),
    #[error("monitor #{0} does not exist")]
    NoSuchMonitor(usize),
}

/// Errors returned by the status/config HTTP surface.
///
/// Rendered as `{"success": false, "error": "..."}`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Upstream(String),
    #[error("{0}")]
    Internal(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Config(ConfigError::Invalid(_)) => StatusCode::BAD_REQUEST,
            ApiError::Config(ConfigError::NoSuchMonitor(_)) => StatusCode::NOT_FOUND,
            ApiError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "success": false,
            "error": self.to_string()
        }))
    }
}

impl From<actix_web::error::BlockingError> for ApiError {
    fn from(e: actix_web::error::BlockingError) -> Self {
        ApiError::Internal(e.to_string())
    }
}
