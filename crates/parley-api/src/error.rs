use parley_types::envelope::ApiResponse;
use thiserror::Error;
use tracing::error;

pub type ApiResult<T> = Result<T, ApiError>;

/// Everything a handler can answer with besides success. Each variant maps to
/// one status code and an `{"error": ...}` envelope.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing, malformed, expired or foreign-signed token.
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Data-store or other unexpected failure. Logged, never shown to the caller.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn required(field: &str) -> Self {
        Self::Validation(format!("{} is required", field))
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized | Self::InvalidCredentials => 401,
            Self::Validation(_) | Self::Conflict(_) => 400,
            Self::NotFound(_) => 404,
            Self::MethodNotAllowed => 405,
            Self::Internal(_) => 500,
        }
    }

    pub fn into_response(self) -> ApiResponse {
        match self {
            Self::Internal(err) => {
                error!("Internal error: {:#}", err);
                ApiResponse::error(500, "Internal server error")
            }
            other => ApiResponse::error(other.status_code(), &other.to_string()),
        }
    }
}
